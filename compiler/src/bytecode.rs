//! Provides the traits and functions for converting runtime opcodes to their
//! corresponding binary representation.

use regexpr_runtime::bytecode::{Opcode, JUMP_WIDTH, SET_BYTES};

/// Represents a conversion trait to a given opcode's binary little-endian
/// representation.
pub trait ToBytecode {
    // the bytecode representable type.
    type Output;

    fn to_bytecode(&self) -> Self::Output;
}

/// The encoded form of a single opcode, sized for the widest instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeBytecodeRepr {
    bytes: [u8; 1 + SET_BYTES],
    len: usize,
}

impl OpcodeBytecodeRepr {
    fn new(opcode: u8, operands: &[u8]) -> Self {
        let mut bytes = [0u8; 1 + SET_BYTES];
        bytes[0] = opcode;
        bytes[1..=operands.len()].copy_from_slice(operands);

        Self {
            bytes,
            len: 1 + operands.len(),
        }
    }
}

impl AsRef<[u8]> for OpcodeBytecodeRepr {
    fn as_ref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl ToBytecode for Opcode {
    type Output = OpcodeBytecodeRepr;

    fn to_bytecode(&self) -> Self::Output {
        let opcode = self.kind() as u8;

        match self {
            Opcode::Set(set) => OpcodeBytecodeRepr::new(opcode, set.as_bits()),
            Opcode::Exact(b)
            | Opcode::StartMemory(b)
            | Opcode::EndMemory(b)
            | Opcode::MatchMemory(b) => OpcodeBytecodeRepr::new(opcode, &[*b]),
            Opcode::SyntaxSpec(class) | Opcode::NotSyntaxSpec(class) => {
                OpcodeBytecodeRepr::new(opcode, &[class.bits()])
            }
            Opcode::Jump(disp)
            | Opcode::StarJump(disp)
            | Opcode::FailureJump(disp)
            | Opcode::UpdateFailureJump(disp)
            | Opcode::DummyFailureJump(disp)
            | Opcode::Repeat1(disp) => OpcodeBytecodeRepr::new(opcode, &disp.to_le_bytes()),
            _ => OpcodeBytecodeRepr::new(opcode, &[]),
        }
    }
}

impl ToBytecode for [Opcode] {
    type Output = Vec<u8>;

    fn to_bytecode(&self) -> Self::Output {
        self.iter()
            .flat_map(|opcode| {
                let repr = opcode.to_bytecode();
                repr.bytes.into_iter().take(repr.len)
            })
            .collect()
    }
}

/// Returns the displacement encoding a jump at `jump_offset` to `target`,
/// or `None` if it doesn't fit the operand.
pub fn jump_displacement(jump_offset: usize, target: usize) -> Option<i16> {
    let disp = target as isize - (jump_offset + JUMP_WIDTH) as isize;
    i16::try_from(disp).ok()
}
