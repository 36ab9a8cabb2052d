//! Computes the set of bytes that can begin a match, along with whether the
//! program can succeed without consuming input.

use crate::bytecode::{decode_at, jump_target, BytecodeError, ByteSet, Opcode, SET_BYTES};
use crate::sparse_set::SparseSet;
use crate::syntax::{syntax_of, SyntaxClass};
use crate::{AnchorHint, CanMatchEmpty};

/// The result of a fastmap walk over a whole program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastmapInfo {
    pub map: ByteSet,
    pub can_match_empty: CanMatchEmpty,
    pub anchor: AnchorHint,
}

impl FastmapInfo {
    /// Returns true if a match may begin with the given, already
    /// translated, byte.
    #[inline]
    pub fn may_start_with(&self, b: u8) -> bool {
        self.map.contains(b)
    }
}

/// Walks every control path of a program, accumulating first bytes. The
/// visited set and worklist are retained between walks.
#[derive(Debug)]
pub struct FastmapBuilder {
    visited: SparseSet,
    worklist: Vec<usize>,
}

impl Default for FastmapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FastmapBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            visited: SparseSet::new(0),
            worklist: vec![],
        }
    }

    /// Computes the fastmap, null-match class and anchor hint of a program.
    pub fn build(&mut self, code: &[u8]) -> Result<FastmapInfo, BytecodeError> {
        let (map, can_match_empty) = self.build_from(code, 0)?;
        let anchor = match decode_at(code, 0)? {
            Opcode::Bol => AnchorHint::LineStart,
            Opcode::BegBuf => AnchorHint::BufferStart,
            _ => AnchorHint::None,
        };

        Ok(FastmapInfo {
            map,
            can_match_empty,
            anchor,
        })
    }

    /// Computes the set of first bytes of every path starting at `offset`.
    pub fn build_from(
        &mut self,
        code: &[u8],
        offset: usize,
    ) -> Result<(ByteSet, CanMatchEmpty), BytecodeError> {
        let mut map = ByteSet::new();
        let mut can_match_empty = CanMatchEmpty::No;

        self.visited.reset(code.len());
        self.worklist.clear();
        self.worklist.push(offset);

        while let Some(start) = self.worklist.pop() {
            if !self.visited.insert(start) {
                continue;
            }

            let mut pc = start;
            loop {
                let opcode = decode_at(code, pc)?;
                let next = pc + opcode.width();

                match opcode {
                    Opcode::End => {
                        can_match_empty = CanMatchEmpty::Anywhere;
                        break;
                    }
                    Opcode::Bol
                    | Opcode::BegBuf
                    | Opcode::EndBuf
                    | Opcode::WordBeg
                    | Opcode::WordEnd
                    | Opcode::WordBound
                    | Opcode::NotWordBound => {
                        mark_all(&mut map);
                        pc = next;
                    }
                    Opcode::Eol => {
                        map.insert(b'\n');
                        if can_match_empty == CanMatchEmpty::No {
                            can_match_empty = CanMatchEmpty::AtEndOnly;
                        }
                        break;
                    }
                    Opcode::Set(set) => {
                        set.iter().for_each(|b| map.insert(b));
                        break;
                    }
                    Opcode::Exact(b) => {
                        map.insert(b);
                        break;
                    }
                    Opcode::AnyChar => {
                        (0..=255u8).filter(|&b| b != b'\n').for_each(|b| map.insert(b));
                        break;
                    }
                    Opcode::SyntaxSpec(class) => {
                        mark_class(&mut map, class, true);
                        break;
                    }
                    Opcode::NotSyntaxSpec(class) => {
                        mark_class(&mut map, class, false);
                        break;
                    }
                    Opcode::StartMemory(_) | Opcode::EndMemory(_) => pc = next,
                    Opcode::MatchMemory(_) => {
                        mark_all(&mut map);
                        can_match_empty = CanMatchEmpty::Anywhere;
                        break;
                    }
                    Opcode::Jump(disp)
                    | Opcode::StarJump(disp)
                    | Opcode::UpdateFailureJump(disp)
                    | Opcode::DummyFailureJump(disp) => {
                        let target = jump_target(code.len(), pc, disp)?;
                        if !self.visited.insert(target) {
                            break;
                        }
                        pc = target;
                    }
                    Opcode::FailureJump(disp) => {
                        let target = jump_target(code.len(), pc, disp)?;
                        self.worklist.push(target);
                        pc = next;
                    }
                    Opcode::Repeat1(_) => pc = next,
                }
            }
        }

        Ok((map, can_match_empty))
    }
}

fn mark_all(map: &mut ByteSet) {
    *map = ByteSet::from_bits([0xff; SET_BYTES]);
}

fn mark_class(map: &mut ByteSet, class: SyntaxClass, member: bool) {
    for b in 0..=255u8 {
        if syntax_of(b).intersects(class) == member {
            map.insert(b);
        }
    }
}
