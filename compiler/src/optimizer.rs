//! Rewrites the `StarJump` closing each loop into a cheaper form when the
//! loop body can never need to be re-entered by backtracking.
//!
//! A loop whose body begins with a byte that can't also begin whatever
//! follows the loop commits to each iteration. Such a loop keeps a single
//! failure point that is updated in place (`UpdateFailureJump`), or, when
//! the body is a lone single-byte matcher, is run as a tight scan
//! (`Repeat1`). Every other loop becomes a plain `Jump` back to its
//! `FailureJump`.

use log::debug;
use regexpr_runtime::bytecode::{
    decode_at, jump_target, BytecodeError, BytecodeErrorKind, ByteSet, Opcode, JUMP_WIDTH,
};
use regexpr_runtime::fastmap::FastmapBuilder;
use regexpr_runtime::syntax::{syntax_of, SyntaxClass};

use crate::bytecode::{jump_displacement, ToBytecode};

/// Rewrites every `StarJump` of a program in place. Instruction widths are
/// unchanged, so no offsets move.
pub fn optimize(code: &mut [u8]) -> Result<(), BytecodeError> {
    let mut builder = FastmapBuilder::new();
    let mut pc = 0;

    loop {
        let opcode = decode_at(code, pc)?;
        match opcode {
            Opcode::End => return Ok(()),
            Opcode::StarJump(disp) => {
                let rewritten = rewrite_star_jump(code, pc, disp, &mut builder)?;
                debug!("{:04}: {} rewritten to {}", pc, opcode, rewritten);
                code[pc..pc + JUMP_WIDTH].copy_from_slice(rewritten.to_bytecode().as_ref());
            }
            _ => (),
        }

        pc += opcode.width();
    }
}

/// Selects the replacement for the `StarJump` at `pc`.
fn rewrite_star_jump(
    code: &[u8],
    pc: usize,
    disp: i16,
    builder: &mut FastmapBuilder,
) -> Result<Opcode, BytecodeError> {
    let malformed = || BytecodeError::new(BytecodeErrorKind::MalformedLoop, pc);

    let failure_jump = jump_target(code.len(), pc, disp)?;
    if !matches!(decode_at(code, failure_jump)?, Opcode::FailureJump(_)) {
        return Err(malformed());
    }
    let body = failure_jump + JUMP_WIDTH;
    let normal_jump = Opcode::Jump(disp);

    let (follow, _) = builder.build_from(code, pc + JUMP_WIDTH)?;

    // skip zero-width instructions up to the first consuming one.
    let mut num_instructions = 0;
    let mut cursor = body;
    let first = loop {
        let opcode = decode_at(code, cursor)?;
        num_instructions += 1;
        cursor += opcode.width();

        if opcode.kind().is_assertion()
            || matches!(opcode, Opcode::StartMemory(_) | Opcode::EndMemory(_))
        {
            continue;
        }
        break opcode;
    };

    let overlaps = match first {
        Opcode::Exact(b) => follow.contains(b),
        Opcode::AnyChar => follow.iter().any(|b| b != b'\n'),
        Opcode::Set(set) => intersects(&set, &follow),
        Opcode::SyntaxSpec(class) => overlaps_class(&follow, class, true),
        Opcode::NotSyntaxSpec(class) => overlaps_class(&follow, class, false),
        _ => true,
    };
    if overlaps {
        return Ok(normal_jump);
    }

    // the remainder of the body must not branch.
    while cursor != pc {
        if cursor > pc {
            return Err(malformed());
        }

        let opcode = decode_at(code, cursor)?;
        match opcode {
            Opcode::End => {
                return Err(BytecodeError::new(
                    BytecodeErrorKind::UnexpectedEnd,
                    cursor,
                ))
            }
            _ if opcode.displacement().is_some() => return Ok(normal_jump),
            _ => (),
        }

        num_instructions += 1;
        cursor += opcode.width();
    }

    let body_disp = jump_displacement(pc, body).ok_or_else(malformed)?;
    if num_instructions == 1 && decode_at(code, body)?.is_single_byte_matcher() {
        Ok(Opcode::Repeat1(body_disp))
    } else {
        Ok(Opcode::UpdateFailureJump(body_disp))
    }
}

fn intersects(lhs: &ByteSet, rhs: &ByteSet) -> bool {
    lhs.as_bits()
        .iter()
        .zip(rhs.as_bits().iter())
        .any(|(l, r)| l & r != 0)
}

fn overlaps_class(follow: &ByteSet, class: SyntaxClass, member: bool) -> bool {
    follow
        .iter()
        .any(|b| syntax_of(b).intersects(class) == member)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimized(program: &[Opcode]) -> Result<Vec<Opcode>, BytecodeErrorKind> {
        let mut code = program.to_bytecode();
        optimize(&mut code).map_err(|e| e.kind())?;

        let mut opcodes = vec![];
        let mut pc = 0;
        while pc < code.len() {
            let opcode = decode_at(&code, pc).map_err(|e| e.kind())?;
            pc += opcode.width();
            opcodes.push(opcode);
        }
        Ok(opcodes)
    }

    #[test]
    fn should_rewrite_star_jumps_by_loop_shape() {
        let mut lower = ByteSet::new();
        lower.insert_range(b'a', b'z');

        let input_output = [
            // a*b
            (
                vec![
                    Opcode::FailureJump(5),
                    Opcode::Exact(b'a'),
                    Opcode::StarJump(-8),
                    Opcode::Exact(b'b'),
                    Opcode::End,
                ],
                Opcode::Repeat1(-5),
            ),
            // a*a
            (
                vec![
                    Opcode::FailureJump(5),
                    Opcode::Exact(b'a'),
                    Opcode::StarJump(-8),
                    Opcode::Exact(b'a'),
                    Opcode::End,
                ],
                Opcode::Jump(-8),
            ),
            // a*
            (
                vec![
                    Opcode::FailureJump(5),
                    Opcode::Exact(b'a'),
                    Opcode::StarJump(-8),
                    Opcode::End,
                ],
                Opcode::Repeat1(-5),
            ),
            // [a-z]*a
            (
                vec![
                    Opcode::FailureJump(36),
                    Opcode::Set(lower),
                    Opcode::StarJump(-39),
                    Opcode::Exact(b'a'),
                    Opcode::End,
                ],
                Opcode::Jump(-39),
            ),
            // .*\n
            (
                vec![
                    Opcode::FailureJump(4),
                    Opcode::AnyChar,
                    Opcode::StarJump(-7),
                    Opcode::Exact(b'\n'),
                    Opcode::End,
                ],
                Opcode::Repeat1(-4),
            ),
            // \w*!
            (
                vec![
                    Opcode::FailureJump(5),
                    Opcode::SyntaxSpec(SyntaxClass::WORD),
                    Opcode::StarJump(-8),
                    Opcode::Exact(b'!'),
                    Opcode::End,
                ],
                Opcode::Repeat1(-5),
            ),
        ];

        for (test_id, (program, expected)) in input_output.into_iter().enumerate() {
            let res = optimized(&program).map(|opcodes| opcodes[2]);
            assert_eq!((test_id, Ok(expected)), (test_id, res));
        }
    }

    #[test]
    fn should_keep_single_failure_point_for_multi_instruction_body() {
        // (ab)*c
        let program = [
            Opcode::FailureJump(11),
            Opcode::StartMemory(1),
            Opcode::Exact(b'a'),
            Opcode::Exact(b'b'),
            Opcode::EndMemory(1),
            Opcode::StarJump(-14),
            Opcode::Exact(b'c'),
            Opcode::End,
        ];

        let res = optimized(&program).map(|opcodes| opcodes[5]);
        assert_eq!(Ok(Opcode::UpdateFailureJump(-11)), res);
    }

    #[test]
    fn should_fall_back_to_plain_jump_for_branching_body() {
        // (a|b)*c
        let program = [
            Opcode::FailureJump(17),
            Opcode::StartMemory(1),
            Opcode::FailureJump(5),
            Opcode::Exact(b'a'),
            Opcode::Jump(2),
            Opcode::Exact(b'b'),
            Opcode::EndMemory(1),
            Opcode::StarJump(-20),
            Opcode::Exact(b'c'),
            Opcode::End,
        ];

        let res = optimized(&program).map(|opcodes| opcodes[7]);
        assert_eq!(Ok(Opcode::Jump(-20)), res);
    }

    #[test]
    fn should_reject_star_jump_without_failure_jump() {
        let program = [
            Opcode::Exact(b'a'),
            Opcode::StarJump(-5),
            Opcode::End,
        ];

        assert_eq!(Err(BytecodeErrorKind::MalformedLoop), optimized(&program));
    }
}
