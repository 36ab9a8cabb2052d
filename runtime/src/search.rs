use log::debug;

use crate::stack::MatchState;
use crate::vm::execute;
use crate::{AnchorHint, CanMatchEmpty, CompiledPattern, MatchError, Registers};

/// Searches for the first offset, in search direction, at which `pattern`
/// matches.
///
/// Offsets from `start` to `start + range` inclusive are tried, moving
/// backward when `range` is negative. The far end is clamped to the subject,
/// so a range reaching past it still tries the end of the subject where an
/// empty match may hold. Offsets whose first byte can't begin a match, per
/// the pattern's fastmap and anchor hint, are skipped.
///
/// # Example
///
/// ```
/// use regexpr_runtime::bytecode::OpcodeKind;
/// use regexpr_runtime::{search, CompiledPattern};
///
/// // `b`
/// let pattern = CompiledPattern::from_program(
///     vec![OpcodeKind::Exact as u8, b'b', OpcodeKind::End as u8],
///     1,
///     false,
/// )
/// .unwrap();
///
/// assert_eq!(Ok(Some(1)), search(&pattern, b"abab", 0, 4, None));
/// // a backward search finds the last occurrence first.
/// assert_eq!(Ok(Some(3)), search(&pattern, b"abab", 4, -4, None));
/// assert_eq!(Ok(None), search(&pattern, b"aaaa", 0, 4, None));
/// ```
pub fn search(
    pattern: &CompiledPattern,
    subject: &[u8],
    start: usize,
    range: isize,
    mut regs: Option<&mut Registers>,
) -> Result<Option<usize>, MatchError> {
    if !pattern.is_compiled() {
        return Err(MatchError::NotCompiled);
    }

    let len = subject.len();
    if start > len {
        return Err(MatchError::InvalidPosition { pos: start, len });
    }

    let end = (start as isize)
        .saturating_add(range)
        .clamp(0, len as isize) as usize;
    let (lower, upper) = (start.min(end), start.max(end));

    let info = pattern.fastmap()?;
    let fastmap = (pattern.fastmap_enabled() && info.can_match_empty != CanMatchEmpty::Anywhere)
        .then_some(info);

    let may_start_at = |pos: usize| -> bool {
        let anchored = match info.anchor {
            AnchorHint::None => true,
            AnchorHint::LineStart => pos == 0 || subject[pos - 1] == b'\n',
            AnchorHint::BufferStart => pos == 0,
        };

        anchored
            && match (fastmap, subject.get(pos)) {
                (None, _) => true,
                (Some(info), Some(&b)) => info.may_start_with(pattern.translate_byte(b)),
                (Some(info), None) => info.can_match_empty != CanMatchEmpty::No,
            }
    };

    let mut state = MatchState::new();
    let mut attempt = |pos: usize| -> Result<Option<usize>, MatchError> {
        if !may_start_at(pos) {
            return Ok(None);
        }

        state.reset();
        execute(pattern, subject, pos, &mut state, regs.as_deref_mut())
    };

    let found = if info.anchor == AnchorHint::BufferStart {
        // only a search starting at offset 0 can match.
        match start {
            0 => attempt(0)?.map(|len| (0, len)),
            _ => None,
        }
    } else if end >= start {
        try_offsets(start..=end, &mut attempt)?
    } else {
        try_offsets((end..=start).rev(), &mut attempt)?
    };

    match found {
        Some((pos, len)) => {
            debug!("search matched {} bytes at offset {}", len, pos);
            Ok(Some(pos))
        }
        None => {
            debug!("search found no match in {}..={}", lower, upper);
            Ok(None)
        }
    }
}

fn try_offsets<I, F>(offsets: I, attempt: &mut F) -> Result<Option<(usize, usize)>, MatchError>
where
    I: Iterator<Item = usize>,
    F: FnMut(usize) -> Result<Option<usize>, MatchError>,
{
    for pos in offsets {
        if let Some(len) = attempt(pos)? {
            return Ok(Some((pos, len)));
        }
    }

    Ok(None)
}
