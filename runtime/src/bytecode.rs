//! Provides the opcode definitions of the compiled program along with
//! utilities for decoding, walking and validating its byte representation.
//!
//! A program is a flat byte buffer. Every instruction starts with a single
//! opcode byte followed by its operands:
//!
//! | opcode                                  | operands                                  |
//! |-----------------------------------------|-------------------------------------------|
//! | `Set`                                   | 32-byte bitmap, bit `b` set if `b` matches |
//! | `Exact`                                 | literal byte                              |
//! | `StartMemory`, `EndMemory`, `MatchMemory` | register number                         |
//! | `SyntaxSpec`, `NotSyntaxSpec`           | syntax class bits                         |
//! | jumps and `Repeat1`                     | little-endian `i16` displacement          |
//!
//! Jump displacements are relative to the first byte following the
//! instruction.

use crate::syntax::SyntaxClass;
use crate::MAX_REGISTERS;

/// Width of a set bitmap in bytes.
pub const SET_BYTES: usize = 256 / 8;

/// Width of any jump instruction, opcode included.
pub const JUMP_WIDTH: usize = 3;

/// Represents every opcode understood by the matcher, by its byte value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeKind {
    End = 0,
    Bol = 1,
    Eol = 2,
    Set = 3,
    Exact = 4,
    AnyChar = 5,
    StartMemory = 6,
    EndMemory = 7,
    MatchMemory = 8,
    Jump = 9,
    StarJump = 10,
    FailureJump = 11,
    UpdateFailureJump = 12,
    DummyFailureJump = 13,
    BegBuf = 14,
    EndBuf = 15,
    WordBeg = 16,
    WordEnd = 17,
    WordBound = 18,
    NotWordBound = 19,
    SyntaxSpec = 20,
    NotSyntaxSpec = 21,
    Repeat1 = 22,
}

impl OpcodeKind {
    /// The encoded width of an instruction of this kind, opcode included.
    pub const fn width(self) -> usize {
        match self {
            Self::Set => 1 + SET_BYTES,
            Self::Exact
            | Self::StartMemory
            | Self::EndMemory
            | Self::MatchMemory
            | Self::SyntaxSpec
            | Self::NotSyntaxSpec => 2,
            Self::Jump
            | Self::StarJump
            | Self::FailureJump
            | Self::UpdateFailureJump
            | Self::DummyFailureJump
            | Self::Repeat1 => JUMP_WIDTH,
            _ => 1,
        }
    }

    /// Returns true for instructions carrying a relative displacement.
    pub const fn is_jump(self) -> bool {
        self.width() == JUMP_WIDTH
    }

    /// Returns true for positional assertions, which never consume input.
    pub const fn is_assertion(self) -> bool {
        matches!(
            self,
            Self::Bol
                | Self::Eol
                | Self::BegBuf
                | Self::EndBuf
                | Self::WordBeg
                | Self::WordEnd
                | Self::WordBound
                | Self::NotWordBound
        )
    }
}

impl TryFrom<u8> for OpcodeKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0 => Self::End,
            1 => Self::Bol,
            2 => Self::Eol,
            3 => Self::Set,
            4 => Self::Exact,
            5 => Self::AnyChar,
            6 => Self::StartMemory,
            7 => Self::EndMemory,
            8 => Self::MatchMemory,
            9 => Self::Jump,
            10 => Self::StarJump,
            11 => Self::FailureJump,
            12 => Self::UpdateFailureJump,
            13 => Self::DummyFailureJump,
            14 => Self::BegBuf,
            15 => Self::EndBuf,
            16 => Self::WordBeg,
            17 => Self::WordEnd,
            18 => Self::WordBound,
            19 => Self::NotWordBound,
            20 => Self::SyntaxSpec,
            21 => Self::NotSyntaxSpec,
            22 => Self::Repeat1,
            other => return Err(other),
        };

        Ok(kind)
    }
}

/// A 256-bit membership map over byte values.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ByteSet([u8; SET_BYTES]);

impl ByteSet {
    pub const fn new() -> Self {
        Self([0; SET_BYTES])
    }

    pub const fn from_bits(bits: [u8; SET_BYTES]) -> Self {
        Self(bits)
    }

    pub const fn as_bits(&self) -> &[u8; SET_BYTES] {
        &self.0
    }

    #[inline]
    pub const fn contains(&self, b: u8) -> bool {
        self.0[(b >> 3) as usize] & (1 << (b & 7)) != 0
    }

    pub fn insert(&mut self, b: u8) {
        self.0[(b >> 3) as usize] |= 1 << (b & 7);
    }

    /// Inserts every byte of the inclusive range. An inverted range inserts
    /// nothing.
    pub fn insert_range(&mut self, lower: u8, upper: u8) {
        for b in lower..=upper {
            self.insert(b)
        }
    }

    /// Flips membership of every byte.
    pub fn complement(&mut self) {
        for chunk in self.0.iter_mut() {
            *chunk ^= 0xff;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&chunk| chunk == 0)
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |&b| self.contains(b))
    }
}

impl std::fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ByteSet({})", self)
    }
}

impl std::fmt::Display for ByteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;

        let mut members = self.iter().peekable();
        let mut first = true;
        while let Some(lower) = members.next() {
            let mut upper = lower;
            while let Some(&next) = members.peek() {
                if upper.checked_add(1) == Some(next) {
                    upper = next;
                    members.next();
                } else {
                    break;
                }
            }

            if !first {
                write!(f, ", ")?;
            }
            first = false;

            if lower == upper {
                write!(f, "{}", lower.escape_ascii())?;
            } else {
                write!(f, "{}-{}", lower.escape_ascii(), upper.escape_ascii())?;
            }
        }

        write!(f, "}}")
    }
}

/// A single decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    End,
    Bol,
    Eol,
    Set(ByteSet),
    Exact(u8),
    AnyChar,
    StartMemory(u8),
    EndMemory(u8),
    MatchMemory(u8),
    Jump(i16),
    StarJump(i16),
    FailureJump(i16),
    UpdateFailureJump(i16),
    DummyFailureJump(i16),
    BegBuf,
    EndBuf,
    WordBeg,
    WordEnd,
    WordBound,
    NotWordBound,
    SyntaxSpec(SyntaxClass),
    NotSyntaxSpec(SyntaxClass),
    Repeat1(i16),
}

impl Opcode {
    pub fn kind(&self) -> OpcodeKind {
        match self {
            Opcode::End => OpcodeKind::End,
            Opcode::Bol => OpcodeKind::Bol,
            Opcode::Eol => OpcodeKind::Eol,
            Opcode::Set(_) => OpcodeKind::Set,
            Opcode::Exact(_) => OpcodeKind::Exact,
            Opcode::AnyChar => OpcodeKind::AnyChar,
            Opcode::StartMemory(_) => OpcodeKind::StartMemory,
            Opcode::EndMemory(_) => OpcodeKind::EndMemory,
            Opcode::MatchMemory(_) => OpcodeKind::MatchMemory,
            Opcode::Jump(_) => OpcodeKind::Jump,
            Opcode::StarJump(_) => OpcodeKind::StarJump,
            Opcode::FailureJump(_) => OpcodeKind::FailureJump,
            Opcode::UpdateFailureJump(_) => OpcodeKind::UpdateFailureJump,
            Opcode::DummyFailureJump(_) => OpcodeKind::DummyFailureJump,
            Opcode::BegBuf => OpcodeKind::BegBuf,
            Opcode::EndBuf => OpcodeKind::EndBuf,
            Opcode::WordBeg => OpcodeKind::WordBeg,
            Opcode::WordEnd => OpcodeKind::WordEnd,
            Opcode::WordBound => OpcodeKind::WordBound,
            Opcode::NotWordBound => OpcodeKind::NotWordBound,
            Opcode::SyntaxSpec(_) => OpcodeKind::SyntaxSpec,
            Opcode::NotSyntaxSpec(_) => OpcodeKind::NotSyntaxSpec,
            Opcode::Repeat1(_) => OpcodeKind::Repeat1,
        }
    }

    pub fn width(&self) -> usize {
        self.kind().width()
    }

    /// Returns the relative displacement of jump-like instructions.
    pub fn displacement(&self) -> Option<i16> {
        match *self {
            Opcode::Jump(disp)
            | Opcode::StarJump(disp)
            | Opcode::FailureJump(disp)
            | Opcode::UpdateFailureJump(disp)
            | Opcode::DummyFailureJump(disp)
            | Opcode::Repeat1(disp) => Some(disp),
            _ => None,
        }
    }

    /// Returns true if the instruction consumes exactly one subject byte.
    pub fn is_single_byte_matcher(&self) -> bool {
        matches!(
            self,
            Opcode::Set(_)
                | Opcode::Exact(_)
                | Opcode::AnyChar
                | Opcode::SyntaxSpec(_)
                | Opcode::NotSyntaxSpec(_)
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::End => write!(f, "End"),
            Opcode::Bol => write!(f, "Bol"),
            Opcode::Eol => write!(f, "Eol"),
            Opcode::Set(set) => write!(f, "Set: {}", set),
            Opcode::Exact(b) => write!(f, "Exact: '{}'", b.escape_ascii()),
            Opcode::AnyChar => write!(f, "AnyChar"),
            Opcode::StartMemory(reg) => write!(f, "StartMemory[{:02}]", reg),
            Opcode::EndMemory(reg) => write!(f, "EndMemory[{:02}]", reg),
            Opcode::MatchMemory(reg) => write!(f, "MatchMemory[{:02}]", reg),
            Opcode::Jump(disp) => write!(f, "Jump: ({:+})", disp),
            Opcode::StarJump(disp) => write!(f, "StarJump: ({:+})", disp),
            Opcode::FailureJump(disp) => write!(f, "FailureJump: ({:+})", disp),
            Opcode::UpdateFailureJump(disp) => write!(f, "UpdateFailureJump: ({:+})", disp),
            Opcode::DummyFailureJump(disp) => write!(f, "DummyFailureJump: ({:+})", disp),
            Opcode::BegBuf => write!(f, "BegBuf"),
            Opcode::EndBuf => write!(f, "EndBuf"),
            Opcode::WordBeg => write!(f, "WordBeg"),
            Opcode::WordEnd => write!(f, "WordEnd"),
            Opcode::WordBound => write!(f, "WordBound"),
            Opcode::NotWordBound => write!(f, "NotWordBound"),
            Opcode::SyntaxSpec(class) => write!(f, "SyntaxSpec: {}", class),
            Opcode::NotSyntaxSpec(class) => write!(f, "NotSyntaxSpec: {}", class),
            Opcode::Repeat1(disp) => write!(f, "Repeat1: ({:+})", disp),
        }
    }
}

/// Represents all malformed-program conditions. Any of these indicates a
/// defect in the compiler or a corrupted buffer, never bad user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BytecodeErrorKind {
    /// The opcode byte is not a known instruction.
    UnknownOpcode(u8),
    /// The buffer ends in the middle of an instruction.
    Truncated,
    /// A jump resolves outside of the program.
    JumpOutOfBounds(isize),
    /// A register operand exceeds the register count of the program.
    InvalidRegister(u8),
    /// A loop instruction does not refer to the shape it expects, such as a
    /// `DummyFailureJump` not followed by a failure jump or a `Repeat1`
    /// over a multi-byte body.
    MalformedLoop,
    /// The program does not terminate with `End`, or a loop body contains
    /// one.
    UnexpectedEnd,
}

/// A malformed program error, including the offset of the offending
/// instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytecodeError {
    kind: BytecodeErrorKind,
    offset: usize,
}

impl BytecodeError {
    pub fn new(kind: BytecodeErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn kind(&self) -> BytecodeErrorKind {
        self.kind
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl std::fmt::Display for BytecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            BytecodeErrorKind::UnknownOpcode(op) => {
                write!(f, "unknown opcode {} at offset {}", op, self.offset)
            }
            BytecodeErrorKind::Truncated => {
                write!(f, "truncated instruction at offset {}", self.offset)
            }
            BytecodeErrorKind::JumpOutOfBounds(target) => write!(
                f,
                "jump at offset {} lands out of bounds at {}",
                self.offset, target
            ),
            BytecodeErrorKind::InvalidRegister(reg) => {
                write!(f, "invalid register {} at offset {}", reg, self.offset)
            }
            BytecodeErrorKind::MalformedLoop => {
                write!(f, "malformed loop at offset {}", self.offset)
            }
            BytecodeErrorKind::UnexpectedEnd => {
                write!(f, "unexpected end instruction at offset {}", self.offset)
            }
        }
    }
}

impl std::error::Error for BytecodeError {}

/// Represents a conversion trait from a given opcode's little-endian binary
/// representation into its decoded form.
pub trait FromBytecode<B: AsRef<[u8]>> {
    // The output type of a successful decode.
    type Output;
    // An alternate error type.
    type Error;

    fn from_bytecode(bin: B) -> Result<Self::Output, Self::Error>;
}

impl<B: AsRef<[u8]>> FromBytecode<B> for Opcode {
    type Output = Self;
    type Error = BytecodeErrorKind;

    /// Decodes the instruction at the head of the buffer. Trailing bytes are
    /// ignored.
    fn from_bytecode(bin: B) -> Result<Self::Output, Self::Error> {
        let data = bin.as_ref();
        let kind = data
            .first()
            .ok_or(BytecodeErrorKind::Truncated)
            .and_then(|&op| OpcodeKind::try_from(op).map_err(BytecodeErrorKind::UnknownOpcode))?;
        let operands = data
            .get(1..kind.width())
            .ok_or(BytecodeErrorKind::Truncated)?;

        let byte_operand = || operands[0];
        let displacement = || i16::from_le_bytes([operands[0], operands[1]]);

        let opcode = match kind {
            OpcodeKind::End => Opcode::End,
            OpcodeKind::Bol => Opcode::Bol,
            OpcodeKind::Eol => Opcode::Eol,
            OpcodeKind::Set => {
                let bits: [u8; SET_BYTES] = operands
                    .try_into()
                    .map_err(|_| BytecodeErrorKind::Truncated)?;
                Opcode::Set(ByteSet::from_bits(bits))
            }
            OpcodeKind::Exact => Opcode::Exact(byte_operand()),
            OpcodeKind::AnyChar => Opcode::AnyChar,
            OpcodeKind::StartMemory => Opcode::StartMemory(byte_operand()),
            OpcodeKind::EndMemory => Opcode::EndMemory(byte_operand()),
            OpcodeKind::MatchMemory => Opcode::MatchMemory(byte_operand()),
            OpcodeKind::Jump => Opcode::Jump(displacement()),
            OpcodeKind::StarJump => Opcode::StarJump(displacement()),
            OpcodeKind::FailureJump => Opcode::FailureJump(displacement()),
            OpcodeKind::UpdateFailureJump => Opcode::UpdateFailureJump(displacement()),
            OpcodeKind::DummyFailureJump => Opcode::DummyFailureJump(displacement()),
            OpcodeKind::BegBuf => Opcode::BegBuf,
            OpcodeKind::EndBuf => Opcode::EndBuf,
            OpcodeKind::WordBeg => Opcode::WordBeg,
            OpcodeKind::WordEnd => Opcode::WordEnd,
            OpcodeKind::WordBound => Opcode::WordBound,
            OpcodeKind::NotWordBound => Opcode::NotWordBound,
            OpcodeKind::SyntaxSpec => Opcode::SyntaxSpec(SyntaxClass::from_bits(byte_operand())),
            OpcodeKind::NotSyntaxSpec => {
                Opcode::NotSyntaxSpec(SyntaxClass::from_bits(byte_operand()))
            }
            OpcodeKind::Repeat1 => Opcode::Repeat1(displacement()),
        };

        Ok(opcode)
    }
}

/// Decodes the instruction starting at `offset`.
#[inline]
pub fn decode_at(code: &[u8], offset: usize) -> Result<Opcode, BytecodeError> {
    let tail = code
        .get(offset..)
        .ok_or_else(|| BytecodeError::new(BytecodeErrorKind::Truncated, offset))?;

    Opcode::from_bytecode(tail).map_err(|kind| BytecodeError::new(kind, offset))
}

/// Resolves the absolute target of the jump instruction at `offset`,
/// failing if it falls outside of `[0, code_len)`.
#[inline]
pub fn jump_target(code_len: usize, offset: usize, disp: i16) -> Result<usize, BytecodeError> {
    let target = (offset + JUMP_WIDTH) as isize + disp as isize;

    if target < 0 || target as usize >= code_len {
        Err(BytecodeError::new(
            BytecodeErrorKind::JumpOutOfBounds(target),
            offset,
        ))
    } else {
        Ok(target as usize)
    }
}

/// An iterator over the instructions of a program in layout order, yielding
/// each instruction with its offset. Iteration stops after the first decode
/// error.
pub struct Instructions<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<(usize, Opcode), BytecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }

        let offset = self.offset;
        match decode_at(self.code, offset) {
            Ok(opcode) => {
                self.offset += opcode.width();
                Some(Ok((offset, opcode)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Walks a program from its first instruction.
pub fn instructions(code: &[u8]) -> Instructions<'_> {
    Instructions {
        code,
        offset: 0,
        failed: false,
    }
}

/// Checks the structural invariants of a program: every instruction
/// decodes, every jump lands inside the program, every register operand is
/// in range, dummy failure jumps precede a failure jump and the program
/// terminates with a single trailing `End`.
pub fn validate(code: &[u8], num_registers: usize) -> Result<(), BytecodeError> {
    let code_len = code.len();
    let mut last = None;

    for inst in instructions(code) {
        let (offset, opcode) = inst?;
        if let Some((end_offset, Opcode::End)) = last {
            return Err(BytecodeError::new(
                BytecodeErrorKind::UnexpectedEnd,
                end_offset,
            ));
        }

        match opcode {
            Opcode::StartMemory(reg) | Opcode::EndMemory(reg)
                if reg as usize >= num_registers =>
            {
                return Err(BytecodeError::new(
                    BytecodeErrorKind::InvalidRegister(reg),
                    offset,
                ))
            }
            Opcode::MatchMemory(reg) if reg == 0 || reg as usize >= MAX_REGISTERS => {
                return Err(BytecodeError::new(
                    BytecodeErrorKind::InvalidRegister(reg),
                    offset,
                ))
            }
            Opcode::DummyFailureJump(disp) => {
                jump_target(code_len, offset, disp)?;
                let next = decode_at(code, offset + JUMP_WIDTH)?;
                if next.kind() != OpcodeKind::FailureJump {
                    return Err(BytecodeError::new(
                        BytecodeErrorKind::MalformedLoop,
                        offset,
                    ));
                }
            }
            other => {
                if let Some(disp) = other.displacement() {
                    jump_target(code_len, offset, disp)?;
                }
            }
        }

        last = Some((offset, opcode));
    }

    match last {
        Some((_, Opcode::End)) => Ok(()),
        _ => Err(BytecodeError::new(BytecodeErrorKind::UnexpectedEnd, code_len)),
    }
}

/// A displayable listing of a program, one instruction per line with jump
/// targets resolved to absolute offsets.
pub struct Disassembly<'a>(pub &'a [u8]);

impl std::fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for inst in instructions(self.0) {
            match inst {
                Ok((offset, opcode)) => match opcode.displacement() {
                    Some(disp) => writeln!(
                        f,
                        "{:04}: {} -> {:04}",
                        offset,
                        opcode,
                        (offset + JUMP_WIDTH) as isize + disp as isize
                    )?,
                    None => writeln!(f, "{:04}: {}", offset, opcode)?,
                },
                Err(e) => writeln!(f, "{:04}: <{}>", e.offset(), e)?,
            }
        }

        Ok(())
    }
}
