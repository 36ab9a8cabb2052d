//! Provides the single-pass compilation of a pattern into runtime bytecode.
//!
//! Patterns are compiled without an intermediate parse tree. Each operator
//! carries a precedence level and the compiler tracks, per nesting depth,
//! the offset at which the code of every level began. Postfix operators and
//! alternation wrap the code accumulated since the start of their level by
//! inserting jumps in front of it.
//!
//! # Example
//!
//! ```
//! use regexpr_compiler::compile_with_dialect;
//! use regexpr_compiler::syntax::{Dialect, SyntaxFlags};
//! use regexpr_runtime::{match_at, CompiledPattern};
//!
//! let dialect = Dialect::new(SyntaxFlags::EGREP);
//! let mut pattern = CompiledPattern::new();
//!
//! compile_with_dialect(b"(a|b)+c", &dialect, &mut pattern).expect("valid pattern");
//! assert_eq!(Ok(Some(4)), match_at(&pattern, b"abac", 0, None));
//! ```

use log::debug;
use regexpr_runtime::bytecode::{BytecodeError, ByteSet, Opcode};
use regexpr_runtime::syntax::{hex_value, SyntaxClass, TranslateTable};
use regexpr_runtime::{CompiledPattern, MAX_REGISTERS};

use crate::bytecode::{jump_displacement, ToBytecode};
use crate::optimizer::optimize;
use crate::syntax::{default_dialect, Dialect, Role, SyntaxFlags, NUM_LEVELS};

/// The maximum group nesting depth, counting the top level, and the maximum
/// number of pending alternation jumps.
pub const MAX_NESTING: usize = 100;

/// Represents all failures of a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// An operator appeared where it has no operand.
    BadlyPlacedSpecial,
    BadMatchRegister,
    BadHexNumber,
    BadlyPlacedParenthesis,
    /// Nesting or alternation exceeded [MAX_NESTING], or a jump exceeded
    /// the reach of its operand.
    TooComplex,
    OutOfMemory,
    EndsPrematurely,
    /// The optimizer or the final validation rejected the program.
    OptimizationError,
}

impl CompileErrorKind {
    /// Returns the fixed message describing this kind of error.
    pub const fn message(&self) -> &'static str {
        match self {
            CompileErrorKind::BadlyPlacedSpecial => "Badly placed special character",
            CompileErrorKind::BadMatchRegister => "Bad match register number",
            CompileErrorKind::BadHexNumber => "Bad hexadecimal number",
            CompileErrorKind::BadlyPlacedParenthesis => "Badly placed parenthesis",
            CompileErrorKind::TooComplex => "Regular expression too complex",
            CompileErrorKind::OutOfMemory => "Out of memory",
            CompileErrorKind::EndsPrematurely => "Regular expression ends prematurely",
            CompileErrorKind::OptimizationError => "Optimization error",
        }
    }
}

/// A compilation error, including the pattern offset at which it was
/// detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileError {
    kind: CompileErrorKind,
    offset: usize,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn kind(&self) -> CompileErrorKind {
        self.kind
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.kind.message(), self.offset)
    }
}

impl std::error::Error for CompileError {}

/// The output of a successful scan, before optimization.
struct Program {
    code: Vec<u8>,
    num_registers: usize,
    uses_registers: bool,
}

struct Compiler<'a> {
    dialect: &'a Dialect,
    translate: Option<&'a TranslateTable>,
    pattern: &'a [u8],
    pos: usize,
    code: Vec<u8>,
    /// Level start offsets, one entry per open nesting depth.
    starts: Vec<[usize; NUM_LEVELS]>,
    current_level: usize,
    /// Offsets of alternation jumps awaiting their target.
    future_jumps: Vec<usize>,
    /// The register tracked by each open group, if any.
    groups: Vec<Option<u8>>,
    next_register: usize,
    num_registers: usize,
    uses_registers: bool,
    beginning_context: bool,
}

impl<'a> Compiler<'a> {
    fn new(dialect: &'a Dialect, translate: Option<&'a TranslateTable>, pattern: &'a [u8]) -> Self {
        Self {
            dialect,
            translate,
            pattern,
            pos: 0,
            code: Vec::new(),
            starts: vec![[0; NUM_LEVELS]],
            current_level: 0,
            future_jumps: vec![],
            groups: vec![],
            next_register: 1,
            num_registers: 1,
            uses_registers: false,
            beginning_context: true,
        }
    }

    fn error(&self, kind: CompileErrorKind) -> CompileError {
        CompileError::new(kind, self.pos)
    }

    fn translate(&self, b: u8) -> u8 {
        match self.translate {
            Some(table) => table[b as usize],
            None => b,
        }
    }

    fn next_char(&mut self) -> Result<u8, CompileError> {
        let b = *self
            .pattern
            .get(self.pos)
            .ok_or_else(|| self.error(CompileErrorKind::EndsPrematurely))?;
        self.pos += 1;
        Ok(b)
    }

    fn level_start(&self) -> usize {
        self.starts
            .last()
            .map(|starts| starts[self.current_level])
            .unwrap_or(0)
    }

    fn set_level_start(&mut self) {
        let offset = self.code.len();
        if let Some(starts) = self.starts.last_mut() {
            starts[self.current_level] = offset;
        }
    }

    fn reserve(&mut self, additional: usize) -> Result<(), CompileError> {
        self.code
            .try_reserve(additional)
            .map_err(|_| self.error(CompileErrorKind::OutOfMemory))
    }

    /// Appends an instruction to the program.
    fn store(&mut self, opcode: Opcode) -> Result<(), CompileError> {
        let repr = opcode.to_bytecode();
        self.reserve(repr.as_ref().len())?;
        self.code.extend_from_slice(repr.as_ref());
        Ok(())
    }

    /// Starts a new operand at the current level and appends its
    /// instruction.
    fn store_operand(&mut self, opcode: Opcode) -> Result<(), CompileError> {
        self.set_level_start();
        self.store(opcode)
    }

    fn encode_jump(
        &self,
        at: usize,
        jump: fn(i16) -> Opcode,
        target: usize,
    ) -> Result<Opcode, CompileError> {
        jump_displacement(at, target)
            .map(jump)
            .ok_or_else(|| self.error(CompileErrorKind::TooComplex))
    }

    /// Inserts a jump at `at`, shifting the following code. `target` is
    /// given in post-insertion offsets.
    fn insert_jump(
        &mut self,
        at: usize,
        jump: fn(i16) -> Opcode,
        target: usize,
    ) -> Result<(), CompileError> {
        let repr = self.encode_jump(at, jump, target)?.to_bytecode();
        self.reserve(repr.as_ref().len())?;
        self.code.splice(at..at, repr.as_ref().iter().copied());
        Ok(())
    }

    /// Rewrites the displacement of the jump at `at`.
    fn patch_jump(&mut self, at: usize, target: usize) -> Result<(), CompileError> {
        let repr = self.encode_jump(at, Opcode::Jump, target)?.to_bytecode();
        self.code[at + 1..at + 3].copy_from_slice(&repr.as_ref()[1..3]);
        Ok(())
    }

    /// Reads the next operator or literal. Literals are returned translated.
    fn next_token(&mut self) -> Result<(Role, u8), CompileError> {
        if self.pos >= self.pattern.len() {
            return Ok((Role::End, 0));
        }

        let ch = self.next_char()?;
        let ch = self.translate(ch);
        let role = self.dialect.plain_role(ch);
        if role != Role::Quote {
            return Ok((role, ch));
        }

        let ch = self.next_char()?;
        let role = self.dialect.quoted_role(ch);
        if role != Role::Normal {
            Ok((role, ch))
        } else if self.dialect.has(SyntaxFlags::ANSI_HEX) {
            Ok((role, self.ansi_escape(ch)?))
        } else {
            Ok((role, self.translate(ch)))
        }
    }

    /// Resolves the byte following a backslash to the control byte it
    /// names, reading the digits of a `\xHH` escape.
    fn ansi_escape(&mut self, ch: u8) -> Result<u8, CompileError> {
        let escaped = match ch {
            b'a' | b'A' => 7,
            b'b' | b'B' => 8,
            b'f' | b'F' => 12,
            b'n' | b'N' => 10,
            b'r' | b'R' => 13,
            b't' | b'T' => 9,
            b'v' | b'V' => 11,
            b'x' | b'X' => {
                let high = self.next_hex_digit()?;
                let low = self.next_hex_digit()?;
                (high << 4) | low
            }
            other => self.translate(other),
        };

        Ok(escaped)
    }

    fn next_hex_digit(&mut self) -> Result<u8, CompileError> {
        let ch = self.next_char()?;
        hex_value(ch).ok_or_else(|| self.error(CompileErrorKind::BadHexNumber))
    }

    /// Returns true if the upcoming input ends the current alternative,
    /// which is where a `$` is an anchor.
    fn at_alternative_end(&self) -> bool {
        let rest = &self.pattern[self.pos..];
        let vbar: &[u8] = if self.dialect.has(SyntaxFlags::NO_BK_VBAR) {
            b"|"
        } else {
            b"\\|"
        };
        let close: &[u8] = if self.dialect.has(SyntaxFlags::NO_BK_PARENS) {
            b")"
        } else {
            b"\\)"
        };

        rest.is_empty() || rest.starts_with(vbar) || rest.starts_with(close)
    }

    /// Handles an operator appearing without an operand: an error when
    /// operators are context independent, otherwise a literal.
    fn misplaced(&mut self, ch: u8) -> Result<(), CompileError> {
        if self.dialect.has(SyntaxFlags::CONTEXT_INDEP_OPS) {
            Err(self.error(CompileErrorKind::BadlyPlacedSpecial))
        } else {
            self.store_operand(Opcode::Exact(ch))
        }
    }

    fn compile_set(&mut self) -> Result<(), CompileError> {
        let ansi = self.dialect.has(SyntaxFlags::ANSI_HEX);
        let mut set = ByteSet::new();

        let mut ch = self.next_char()?;
        ch = self.translate(ch);
        let complement = ch == b'^';
        if complement {
            ch = self.next_char()?;
            ch = self.translate(ch);
        }

        let mut prev: Option<u8> = None;
        let mut range = false;
        let mut first = true;
        while ch != b']' || first {
            first = false;

            if ansi && ch == b'\\' {
                ch = self.next_char()?;
                ch = self.ansi_escape(ch)?;
            }

            if range {
                if let Some(lower) = prev {
                    set.insert_range(lower, ch);
                }
                prev = None;
                range = false;
            } else if prev.is_some() && ch == b'-' {
                range = true;
            } else {
                set.insert(ch);
                prev = Some(ch);
            }

            ch = self.next_char()?;
            ch = self.translate(ch);
        }

        // a dash before the closing bracket is literal.
        if range {
            set.insert(b'-');
        }
        if complement {
            set.complement();
        }

        self.store_operand(Opcode::Set(set))
    }

    fn compile_memory(&mut self, ch: u8) -> Result<(), CompileError> {
        if ch == b'0' {
            return Err(self.error(CompileErrorKind::BadMatchRegister));
        }

        self.uses_registers = true;
        self.store_operand(Opcode::MatchMemory(ch - b'0'))
    }

    fn compile_extended_memory(&mut self) -> Result<(), CompileError> {
        let tens = self.next_char()?;
        let ones = self.next_char()?;
        if !tens.is_ascii_digit() || !ones.is_ascii_digit() {
            return Err(self.error(CompileErrorKind::BadMatchRegister));
        }

        let reg = 10 * (tens - b'0') + (ones - b'0');
        if reg == 0 || reg as usize >= MAX_REGISTERS {
            return Err(self.error(CompileErrorKind::BadMatchRegister));
        }

        self.uses_registers = true;
        self.store_operand(Opcode::MatchMemory(reg))
    }

    fn compile_repeat(&mut self, role: Role, ch: u8) -> Result<(), CompileError> {
        if self.beginning_context {
            return self.misplaced(ch);
        }

        let start = self.level_start();
        let end = self.code.len();
        // an empty operand repeats nothing.
        if start == end {
            return Ok(());
        }

        match role {
            Role::Optional => self.insert_jump(start, Opcode::FailureJump, end + 3),
            _ => {
                self.insert_jump(start, Opcode::FailureJump, end + 6)?;
                self.insert_jump(end + 3, Opcode::StarJump, start)?;
                if role == Role::Plus {
                    self.insert_jump(start, Opcode::DummyFailureJump, start + 6)?;
                }
                Ok(())
            }
        }
    }

    fn compile_alternation(&mut self) -> Result<(), CompileError> {
        let start = self.level_start();
        let end = self.code.len();
        self.insert_jump(start, Opcode::FailureJump, end + 6)?;

        if self.future_jumps.len() >= MAX_NESTING {
            return Err(self.error(CompileErrorKind::TooComplex));
        }
        self.future_jumps.push(self.code.len());
        self.store(Opcode::Jump(0))?;
        self.set_level_start();
        Ok(())
    }

    fn open_group(&mut self) -> Result<(), CompileError> {
        self.set_level_start();
        if self.starts.len() >= MAX_NESTING {
            return Err(self.error(CompileErrorKind::TooComplex));
        }

        let register = if self.next_register < MAX_REGISTERS {
            let reg = self.next_register as u8;
            self.store(Opcode::StartMemory(reg))?;
            self.uses_registers = true;
            self.num_registers += 1;
            self.next_register += 1;
            Some(reg)
        } else {
            None
        };

        self.groups.push(register);
        self.starts.push([0; NUM_LEVELS]);
        self.current_level = 0;
        self.set_level_start();
        Ok(())
    }

    fn close_group(&mut self) -> Result<(), CompileError> {
        let register = self
            .groups
            .pop()
            .ok_or_else(|| self.error(CompileErrorKind::BadlyPlacedParenthesis))?;

        self.starts.pop();
        self.current_level = self.dialect.precedence(Role::OpenPar);
        match register {
            Some(reg) => self.store(Opcode::EndMemory(reg)),
            None => Ok(()),
        }
    }

    fn run(mut self) -> Result<Program, CompileError> {
        self.set_level_start();

        loop {
            let (role, ch) = self.next_token()?;

            let level = self.dialect.precedence(role);
            if level > self.current_level {
                self.current_level += 1;
                while self.current_level < level {
                    self.set_level_start();
                    self.current_level += 1;
                }
                self.set_level_start();
            } else if level < self.current_level {
                self.current_level = level;
                let start = self.level_start();
                while let Some(&jump) = self.future_jumps.last() {
                    if jump < start {
                        break;
                    }
                    self.future_jumps.pop();
                    self.patch_jump(jump, self.code.len())?;
                }
            }

            match role {
                Role::End => break,
                Role::Normal | Role::Quote => self.store_operand(Opcode::Exact(ch))?,
                Role::AnyChar => self.store_operand(Opcode::AnyChar)?,
                Role::Bol if !self.beginning_context => self.misplaced(ch)?,
                Role::Bol => self.store_operand(Opcode::Bol)?,
                Role::Eol if !self.at_alternative_end() => self.misplaced(ch)?,
                Role::Eol => self.store_operand(Opcode::Eol)?,
                Role::Optional | Role::Star | Role::Plus => self.compile_repeat(role, ch)?,
                Role::Or => self.compile_alternation()?,
                Role::OpenPar => self.open_group()?,
                Role::ClosePar => self.close_group()?,
                Role::Memory => self.compile_memory(ch)?,
                Role::ExtendedMemory => self.compile_extended_memory()?,
                Role::OpenSet => self.compile_set()?,
                Role::BegBuf => self.store_operand(Opcode::BegBuf)?,
                Role::EndBuf => self.store_operand(Opcode::EndBuf)?,
                Role::WordChar => self.store_operand(Opcode::SyntaxSpec(SyntaxClass::WORD))?,
                Role::NotWordChar => {
                    self.store_operand(Opcode::NotSyntaxSpec(SyntaxClass::WORD))?
                }
                Role::WordBeg => self.store_operand(Opcode::WordBeg)?,
                Role::WordEnd => self.store_operand(Opcode::WordEnd)?,
                Role::WordBound => self.store_operand(Opcode::WordBound)?,
                Role::NotWordBound => self.store_operand(Opcode::NotWordBound)?,
            }

            self.beginning_context = matches!(role, Role::OpenPar | Role::Or);
        }

        if !self.groups.is_empty() {
            return Err(self.error(CompileErrorKind::BadlyPlacedParenthesis));
        }

        self.store(Opcode::End)?;
        Ok(Program {
            code: self.code,
            num_registers: self.num_registers,
            uses_registers: self.uses_registers,
        })
    }
}

/// Compiles a pattern under an explicit dialect into `target`, replacing
/// its program. The target's translate table, if any, is applied to the
/// pattern's literals. On error the target is left without a program.
pub fn compile_with_dialect(
    pattern: &[u8],
    dialect: &Dialect,
    target: &mut CompiledPattern,
) -> Result<(), CompileError> {
    target.clear_program();

    let translate = target.translate().copied();
    let Program {
        mut code,
        num_registers,
        uses_registers,
    } = Compiler::new(dialect, translate.as_ref(), pattern).run()?;

    let optimization_error = |e: BytecodeError| {
        debug!("rejected program for {:?}: {}", pattern.escape_ascii().to_string(), e);
        CompileError::new(CompileErrorKind::OptimizationError, pattern.len())
    };

    optimize(&mut code).map_err(optimization_error)?;
    target
        .set_program(code, num_registers, uses_registers)
        .map_err(optimization_error)?;

    debug!(
        "compiled {:?} into {} bytes using {} registers",
        pattern.escape_ascii().to_string(),
        target.used_len(),
        target.num_registers()
    );
    Ok(())
}

/// Compiles a pattern under the process-wide default dialect into `target`.
pub fn compile_pattern(pattern: &[u8], target: &mut CompiledPattern) -> Result<(), CompileError> {
    let dialect = default_dialect();
    compile_with_dialect(pattern, &dialect, target)
}

/// Compiles a pattern under the process-wide default dialect into a new
/// [CompiledPattern].
///
/// # Example
///
/// ```
/// use regexpr_compiler::compile;
/// use regexpr_runtime::search;
///
/// let pattern = compile(b"b*c").expect("valid pattern");
/// assert_eq!(Ok(Some(2)), search(&pattern, b"aabbc", 0, 5, None));
/// ```
pub fn compile(pattern: &[u8]) -> Result<CompiledPattern, CompileError> {
    let mut target = CompiledPattern::new();
    compile_pattern(pattern, &mut target)?;
    Ok(target)
}
