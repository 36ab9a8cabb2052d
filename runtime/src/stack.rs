//! The backtracking state of a single match attempt: capture registers and
//! the failure stack interleaving failure points with the register values
//! they must restore.

use crate::{MatchError, MAX_REGISTERS};

/// A single failure stack record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Entry {
    /// The value of a register before its first write under the current
    /// failure point.
    RegisterSave {
        reg: usize,
        start: Option<usize>,
        end: Option<usize>,
        level: usize,
    },
    /// A resume point. A `text` of `None` marks a filler frame that is
    /// skipped on backtrack.
    FailurePoint {
        code: usize,
        text: Option<usize>,
        count: usize,
        level: usize,
        phantom: bool,
    },
}

/// Per-call matcher state.
#[derive(Debug)]
pub struct MatchState {
    starts: Vec<Option<usize>>,
    ends: Vec<Option<usize>>,
    changed: Vec<usize>,
    stack: Vec<Entry>,
    /// Register saves pushed since the topmost failure point.
    count: usize,
    level: usize,
    /// Live failure points.
    point: usize,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            starts: vec![None; MAX_REGISTERS],
            ends: vec![None; MAX_REGISTERS],
            changed: vec![0; MAX_REGISTERS],
            stack: vec![],
            count: 0,
            level: 1,
            point: 0,
        }
    }

    /// Returns the state to its initial condition, retaining the stack's
    /// storage for the next attempt.
    pub fn reset(&mut self) {
        self.starts.fill(None);
        self.ends.fill(None);
        self.changed.fill(0);
        self.stack.clear();
        self.count = 0;
        self.level = 1;
        self.point = 0;
    }

    pub fn start(&self, reg: usize) -> Option<usize> {
        self.starts.get(reg).copied().flatten()
    }

    pub fn end(&self, reg: usize) -> Option<usize> {
        self.ends.get(reg).copied().flatten()
    }

    /// Returns the closed span of a register, if both halves are set.
    pub fn span(&self, reg: usize) -> Option<(usize, usize)> {
        self.start(reg).zip(self.end(reg))
    }

    /// Returns the number of live failure points.
    pub fn failure_points(&self) -> usize {
        self.point
    }

    /// Returns the total depth of the failure stack, register saves
    /// included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn set_start(&mut self, reg: usize, text: usize) -> Result<(), MatchError> {
        self.save_register(reg)?;
        self.starts[reg] = Some(text);
        Ok(())
    }

    pub fn set_end(&mut self, reg: usize, text: usize) -> Result<(), MatchError> {
        self.save_register(reg)?;
        self.ends[reg] = Some(text);
        Ok(())
    }

    /// Records the prior value of a register the first time it is written
    /// under the current failure point.
    fn save_register(&mut self, reg: usize) -> Result<(), MatchError> {
        if reg >= MAX_REGISTERS {
            return Err(MatchError::CorruptStack);
        }

        if self.changed[reg] < self.level {
            self.push(Entry::RegisterSave {
                reg,
                start: self.starts[reg],
                end: self.ends[reg],
                level: self.changed[reg],
            })?;
            self.changed[reg] = self.level;
            self.count += 1;
        }

        Ok(())
    }

    /// Pushes a resume point at `code`, resuming the subject at `text`.
    pub fn push_failure(&mut self, code: usize, text: Option<usize>) -> Result<(), MatchError> {
        self.push_frame(code, text, false)
    }

    fn push_frame(
        &mut self,
        code: usize,
        text: Option<usize>,
        phantom: bool,
    ) -> Result<(), MatchError> {
        self.push(Entry::FailurePoint {
            code,
            text,
            count: self.count,
            level: self.level,
            phantom,
        })?;
        self.count = 0;
        self.level += 1;
        self.point += 1;
        Ok(())
    }

    /// Advances the resume position of the innermost loop's failure point
    /// to `text`, without growing the stack on every iteration.
    pub fn update_failure(&mut self, text: usize) -> Result<(), MatchError> {
        let idx = self
            .stack
            .len()
            .checked_sub(self.count + 1)
            .ok_or(MatchError::CorruptStack)?;

        match &mut self.stack[idx] {
            Entry::FailurePoint {
                phantom: true,
                text: resume,
                ..
            } => {
                *resume = Some(text);
                self.stack.truncate(idx + 1);
                self.count = 0;
                self.level += 1;
                Ok(())
            }
            Entry::FailurePoint {
                phantom: false,
                code,
                ..
            } => {
                let code = *code;
                self.push_frame(code, Some(text), true)
            }
            Entry::RegisterSave { .. } => Err(MatchError::CorruptStack),
        }
    }

    /// Unwinds to the most recent resumable failure point, restoring every
    /// register saved above it. Returns `None` once the stack is exhausted.
    pub fn pop_failure(&mut self) -> Result<Option<(usize, usize)>, MatchError> {
        loop {
            while self.count > 0 {
                match self.stack.pop() {
                    Some(Entry::RegisterSave {
                        reg,
                        start,
                        end,
                        level,
                    }) => {
                        self.starts[reg] = start;
                        self.ends[reg] = end;
                        self.changed[reg] = level;
                        self.count -= 1;
                    }
                    _ => return Err(MatchError::CorruptStack),
                }
            }

            match self.stack.pop() {
                None => return Ok(None),
                Some(Entry::FailurePoint {
                    code,
                    text,
                    count,
                    level,
                    ..
                }) => {
                    self.count = count;
                    self.level = level;
                    self.point -= 1;

                    if let Some(text) = text {
                        return Ok(Some((code, text)));
                    }
                }
                Some(Entry::RegisterSave { .. }) => return Err(MatchError::CorruptStack),
            }
        }
    }

    /// Returns the text position of the newest live failure point resuming
    /// at `code`, or `None` if there is none or it is a filler frame.
    pub fn resume_text(&self, code: usize) -> Option<usize> {
        self.stack.iter().rev().find_map(|entry| match *entry {
            Entry::FailurePoint {
                code: resume, text, ..
            } if resume == code => Some(text),
            _ => None,
        })?
    }

    fn push(&mut self, entry: Entry) -> Result<(), MatchError> {
        self.stack
            .try_reserve(1)
            .map_err(|_| MatchError::OutOfMemory)?;
        self.stack.push(entry);
        Ok(())
    }
}
