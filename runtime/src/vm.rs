//! Interprets a compiled program at a single subject offset, backtracking
//! through the failure stack when a path dead-ends.

use log::trace;

use crate::bytecode::{decode_at, jump_target, BytecodeError, BytecodeErrorKind, Opcode};
use crate::stack::MatchState;
use crate::syntax::{is_word, syntax_of};
use crate::{CompiledPattern, MatchError, Registers, MAX_REGISTERS};

/// The next step of the interpreter loop.
enum Flow {
    /// Continue with the following instruction.
    Next,
    Goto(usize),
    Fail,
    Matched,
}

/// Attempts to match `pattern` against `subject` anchored at `pos`,
/// returning the length of the match.
///
/// On success the registers, if provided, receive the span of the whole
/// match in register 0 and every closed group in the registers following
/// it. A position beyond the end of the subject is an error.
pub fn match_at(
    pattern: &CompiledPattern,
    subject: &[u8],
    pos: usize,
    regs: Option<&mut Registers>,
) -> Result<Option<usize>, MatchError> {
    if !pattern.is_compiled() {
        return Err(MatchError::NotCompiled);
    }
    if pos > subject.len() {
        return Err(MatchError::InvalidPosition {
            pos,
            len: subject.len(),
        });
    }

    let mut state = MatchState::new();
    execute(pattern, subject, pos, &mut state, regs)
}

/// Runs a single anchored attempt using caller provided state, which must
/// be fresh or reset.
pub(crate) fn execute(
    pattern: &CompiledPattern,
    subject: &[u8],
    pos: usize,
    state: &mut MatchState,
    regs: Option<&mut Registers>,
) -> Result<Option<usize>, MatchError> {
    let code = pattern.bytecode();
    let code_len = code.len();
    let tr = |b: u8| pattern.translate_byte(b);

    let mut pc = 0;
    let mut text = pos;

    loop {
        let opcode = decode_at(code, pc)?;

        let flow = match opcode {
            Opcode::End => Flow::Matched,
            Opcode::Bol => assert_flow(text == 0 || subject[text - 1] == b'\n'),
            Opcode::Eol => assert_flow(text == subject.len() || subject[text] == b'\n'),
            Opcode::BegBuf => assert_flow(text == 0),
            Opcode::EndBuf => assert_flow(text == subject.len()),
            Opcode::WordBeg => assert_flow(
                text < subject.len()
                    && is_word(subject[text])
                    && (text == 0 || !is_word(subject[text - 1])),
            ),
            Opcode::WordEnd => assert_flow(
                text > 0
                    && is_word(subject[text - 1])
                    && (text == subject.len() || !is_word(subject[text])),
            ),
            // both buffer edges count as boundaries.
            Opcode::WordBound => assert_flow(
                text == 0
                    || text == subject.len()
                    || is_word(subject[text - 1]) != is_word(subject[text]),
            ),
            Opcode::NotWordBound => assert_flow(
                text != 0
                    && text != subject.len()
                    && is_word(subject[text - 1]) == is_word(subject[text]),
            ),
            Opcode::Set(_)
            | Opcode::Exact(_)
            | Opcode::AnyChar
            | Opcode::SyntaxSpec(_)
            | Opcode::NotSyntaxSpec(_) => match subject.get(text) {
                Some(&b) if matches_byte(&opcode, tr(b)) => {
                    text += 1;
                    Flow::Next
                }
                _ => Flow::Fail,
            },
            Opcode::StartMemory(reg) => {
                state.set_start(reg as usize, text)?;
                Flow::Next
            }
            Opcode::EndMemory(reg) => {
                state.set_end(reg as usize, text)?;
                Flow::Next
            }
            Opcode::MatchMemory(reg) => match state.span(reg as usize) {
                Some((start, end)) => {
                    let captured = subject.get(start..end).unwrap_or(&[]);
                    let matched = subject
                        .get(text..text + captured.len())
                        .map(|upcoming| {
                            captured
                                .iter()
                                .zip(upcoming)
                                .all(|(&a, &b)| tr(a) == tr(b))
                        })
                        .unwrap_or(false);

                    if matched {
                        text += captured.len();
                        Flow::Next
                    } else {
                        Flow::Fail
                    }
                }
                None => Flow::Fail,
            },
            Opcode::Jump(disp) | Opcode::StarJump(disp) => {
                let target = jump_target(code_len, pc, disp)?;
                match decode_at(code, target)? {
                    // a loop iteration that consumed nothing is abandoned,
                    // leaving the frame pushed on entry to take the exit.
                    Opcode::FailureJump(failure_disp) if target < pc => {
                        let exit = jump_target(code_len, target, failure_disp)?;
                        if state.resume_text(exit) == Some(text) {
                            Flow::Fail
                        } else {
                            Flow::Goto(target)
                        }
                    }
                    _ => Flow::Goto(target),
                }
            }
            Opcode::FailureJump(disp) => {
                let target = jump_target(code_len, pc, disp)?;
                state.push_failure(target, Some(text))?;
                Flow::Next
            }
            Opcode::UpdateFailureJump(disp) => {
                let target = jump_target(code_len, pc, disp)?;
                state.update_failure(text)?;
                Flow::Goto(target)
            }
            Opcode::DummyFailureJump(disp) => {
                let target = jump_target(code_len, pc, disp)?;
                let next = pc + opcode.width();
                match decode_at(code, next)? {
                    Opcode::FailureJump(failure_disp) => {
                        let resume = jump_target(code_len, next, failure_disp)?;
                        state.push_failure(resume, None)?;
                        Flow::Goto(target)
                    }
                    _ => {
                        return Err(MatchError::Bytecode(BytecodeError::new(
                            BytecodeErrorKind::MalformedLoop,
                            pc,
                        )))
                    }
                }
            }
            Opcode::Repeat1(disp) => {
                let body_offset = jump_target(code_len, pc, disp)?;
                let body = decode_at(code, body_offset)?;
                if !body.is_single_byte_matcher() {
                    return Err(MatchError::Bytecode(BytecodeError::new(
                        BytecodeErrorKind::MalformedLoop,
                        pc,
                    )));
                }

                text += subject[text..]
                    .iter()
                    .take_while(|&&b| matches_byte(&body, tr(b)))
                    .count();
                state.update_failure(text)?;
                Flow::Fail
            }
        };

        match flow {
            Flow::Next => pc += opcode.width(),
            Flow::Goto(target) => pc = target,
            Flow::Fail => match state.pop_failure()? {
                Some((resume_pc, resume_text)) => {
                    pc = resume_pc;
                    text = resume_text;
                }
                None => {
                    trace!("no match at offset {}", pos);
                    return Ok(None);
                }
            },
            Flow::Matched => {
                if let Some(regs) = regs {
                    fill_registers(pattern, state, pos, text, regs);
                }

                trace!("matched {} bytes at offset {}", text - pos, pos);
                return Ok(Some(text - pos));
            }
        }
    }
}

#[inline]
fn assert_flow(holds: bool) -> Flow {
    if holds {
        Flow::Next
    } else {
        Flow::Fail
    }
}

/// Tests a single, already translated, byte against a one-byte matching
/// instruction.
#[inline]
fn matches_byte(opcode: &Opcode, b: u8) -> bool {
    match opcode {
        Opcode::Set(set) => set.contains(b),
        Opcode::Exact(c) => *c == b,
        Opcode::AnyChar => b != b'\n',
        Opcode::SyntaxSpec(class) => syntax_of(b).intersects(*class),
        Opcode::NotSyntaxSpec(class) => !syntax_of(b).intersects(*class),
        _ => false,
    }
}

fn fill_registers(
    pattern: &CompiledPattern,
    state: &MatchState,
    pos: usize,
    text: usize,
    regs: &mut Registers,
) {
    regs.set(0, Some((pos, text)));

    let tracked = if pattern.uses_registers() {
        pattern.num_registers().min(MAX_REGISTERS)
    } else {
        1
    };

    for reg in 1..MAX_REGISTERS {
        let span = if reg < tracked { state.span(reg) } else { None };
        regs.set(reg, span);
    }
    regs.set_len(tracked);
}
