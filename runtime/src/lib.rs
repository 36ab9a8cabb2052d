//! Provides the backtracking matcher for compiled patterns, executing a
//! linear bytecode program against a byte buffer.
//!
//! # Example
//!
//! ```rust
//! use regexpr_runtime::bytecode::OpcodeKind;
//! use regexpr_runtime::{match_at, search, CompiledPattern, Registers};
//!
//! // Programs are normally produced by the `regexpr-compiler` crate. Here
//! // the pattern `ab` is assembled by hand.
//! let program = vec![
//!     OpcodeKind::Exact as u8,
//!     b'a',
//!     OpcodeKind::Exact as u8,
//!     b'b',
//!     OpcodeKind::End as u8,
//! ];
//! let pattern = CompiledPattern::from_program(program, 1, false)
//!     .expect("well-formed program");
//!
//! // Anchored matching reports the length of the match.
//! assert_eq!(Ok(Some(2)), match_at(&pattern, b"abc", 0, None));
//! assert_eq!(Ok(None), match_at(&pattern, b"abc", 1, None));
//!
//! // Searching reports the offset of the first match, with register 0
//! // holding its span.
//! let mut regs = Registers::new();
//! assert_eq!(Ok(Some(3)), search(&pattern, b"xxxab", 0, 5, Some(&mut regs)));
//! assert_eq!(Some(3..5), regs.span(0));
//! ```

use std::ops::Range;
use std::sync::OnceLock;

pub mod bytecode;
pub mod fastmap;
mod search;
mod sparse_set;
pub mod stack;
pub mod syntax;
mod vm;

use bytecode::{BytecodeError, Disassembly};
use fastmap::{FastmapBuilder, FastmapInfo};
use syntax::TranslateTable;

pub use search::search;
pub use vm::match_at;

/// The number of capture registers, including register 0.
pub const MAX_REGISTERS: usize = 100;

/// Whether a pattern can succeed without consuming input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanMatchEmpty {
    #[default]
    No,
    Anywhere,
    /// Only where a `$` can hold, at a newline or the end of the subject.
    AtEndOnly,
}

/// Restricts the offsets a search has to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorHint {
    #[default]
    None,
    LineStart,
    BufferStart,
}

/// Represents all failures of a match or search. A pattern that simply
/// doesn't match is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The program is malformed.
    Bytecode(BytecodeError),
    /// The failure stack could not grow.
    OutOfMemory,
    /// The failure stack holds an entry of the wrong kind.
    CorruptStack,
    /// The pattern holds no program, either because it was never compiled or
    /// because its compilation failed.
    NotCompiled,
    /// The start position lies beyond the end of the subject.
    InvalidPosition { pos: usize, len: usize },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::Bytecode(e) => write!(f, "malformed program: {}", e),
            MatchError::OutOfMemory => write!(f, "out of memory"),
            MatchError::CorruptStack => write!(f, "corrupt failure stack"),
            MatchError::NotCompiled => write!(f, "pattern is not compiled"),
            MatchError::InvalidPosition { pos, len } => write!(
                f,
                "position {} is out of bounds for a subject of length {}",
                pos, len
            ),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::Bytecode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BytecodeError> for MatchError {
    fn from(e: BytecodeError) -> Self {
        MatchError::Bytecode(e)
    }
}

/// A compiled program along with the metadata the matcher consumes.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    bytecode: Vec<u8>,
    num_registers: usize,
    uses_registers: bool,
    translate: Option<Box<TranslateTable>>,
    fastmap: OnceLock<Result<FastmapInfo, BytecodeError>>,
    fastmap_enabled: bool,
}

impl Default for CompiledPattern {
    fn default() -> Self {
        Self::new()
    }
}

impl CompiledPattern {
    /// Returns a pattern with no program. Matching against it fails with
    /// [MatchError::NotCompiled] until a program is loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytecode: vec![],
            num_registers: 0,
            uses_registers: false,
            translate: None,
            fastmap: OnceLock::new(),
            fastmap_enabled: true,
        }
    }

    /// Builds a pattern from an already assembled program.
    pub fn from_program(
        bytecode: Vec<u8>,
        num_registers: usize,
        uses_registers: bool,
    ) -> Result<Self, BytecodeError> {
        let mut pattern = Self::new();
        pattern.set_program(bytecode, num_registers, uses_registers)?;
        Ok(pattern)
    }

    /// Sets the byte translation applied to the subject and, at compile
    /// time, to pattern literals.
    #[must_use]
    pub fn with_translate(mut self, table: TranslateTable) -> Self {
        self.set_translate(Some(table));
        self
    }

    pub fn set_translate(&mut self, table: Option<TranslateTable>) {
        self.translate = table.map(Box::new);
        self.fastmap = OnceLock::new();
    }

    pub fn translate(&self) -> Option<&TranslateTable> {
        self.translate.as_deref()
    }

    #[inline]
    pub fn translate_byte(&self, b: u8) -> u8 {
        match &self.translate {
            Some(table) => table[b as usize],
            None => b,
        }
    }

    /// Loads a program, invalidating the cached fastmap. The program is
    /// validated first and, if malformed, the pattern is left without a
    /// program.
    pub fn set_program(
        &mut self,
        bytecode: Vec<u8>,
        num_registers: usize,
        uses_registers: bool,
    ) -> Result<(), BytecodeError> {
        self.clear_program();
        bytecode::validate(&bytecode, num_registers)?;

        self.bytecode = bytecode;
        self.num_registers = num_registers;
        self.uses_registers = uses_registers;
        Ok(())
    }

    /// Discards the loaded program, leaving the pattern unusable.
    pub fn clear_program(&mut self) {
        self.bytecode.clear();
        self.num_registers = 0;
        self.uses_registers = false;
        self.fastmap = OnceLock::new();
    }

    pub fn is_compiled(&self) -> bool {
        !self.bytecode.is_empty()
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn used_len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn allocated_len(&self) -> usize {
        self.bytecode.capacity()
    }

    pub fn num_registers(&self) -> usize {
        self.num_registers
    }

    pub fn uses_registers(&self) -> bool {
        self.uses_registers
    }

    /// Returns the fastmap of the loaded program, computing it on first use.
    pub fn fastmap(&self) -> Result<&FastmapInfo, MatchError> {
        if !self.is_compiled() {
            return Err(MatchError::NotCompiled);
        }

        self.fastmap
            .get_or_init(|| FastmapBuilder::new().build(&self.bytecode))
            .as_ref()
            .map_err(|e| MatchError::Bytecode(*e))
    }

    /// Returns true if the cached fastmap reflects the loaded program.
    pub fn fastmap_accurate(&self) -> bool {
        self.fastmap.get().is_some()
    }

    /// Discards the cached fastmap and recomputes it.
    pub fn compile_fastmap(&mut self) -> Result<&FastmapInfo, MatchError> {
        self.fastmap = OnceLock::new();
        self.fastmap()
    }

    /// Toggles fastmap skipping during search. Enabled by default.
    pub fn set_fastmap_enabled(&mut self, enabled: bool) {
        self.fastmap_enabled = enabled;
    }

    pub fn fastmap_enabled(&self) -> bool {
        self.fastmap_enabled
    }

    /// Returns a printable listing of the loaded program.
    pub fn disassemble(&self) -> Disassembly<'_> {
        Disassembly(&self.bytecode)
    }
}

/// The capture registers of a successful match, as parallel start and end
/// arrays. Unset registers hold `-1` in both halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    starts: [isize; MAX_REGISTERS],
    ends: [isize; MAX_REGISTERS],
    len: usize,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    #[must_use]
    pub fn new() -> Self {
        Self {
            starts: [-1; MAX_REGISTERS],
            ends: [-1; MAX_REGISTERS],
            len: 0,
        }
    }

    pub fn starts(&self) -> &[isize; MAX_REGISTERS] {
        &self.starts
    }

    pub fn ends(&self) -> &[isize; MAX_REGISTERS] {
        &self.ends
    }

    pub fn start(&self, reg: usize) -> isize {
        self.starts.get(reg).copied().unwrap_or(-1)
    }

    pub fn end(&self, reg: usize) -> isize {
        self.ends.get(reg).copied().unwrap_or(-1)
    }

    /// Returns the span of a register if it is set.
    pub fn span(&self, reg: usize) -> Option<Range<usize>> {
        let (start, end) = (self.start(reg), self.end(reg));
        if start < 0 || end < 0 {
            None
        } else {
            Some(start as usize..end as usize)
        }
    }

    /// Returns the register count of the pattern that last filled these
    /// registers.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resets every register to unset.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn set(&mut self, reg: usize, span: Option<(usize, usize)>) {
        let (start, end) = span
            .map(|(start, end)| (start as isize, end as isize))
            .unwrap_or((-1, -1));
        self.starts[reg] = start;
        self.ends[reg] = end;
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len;
    }
}
