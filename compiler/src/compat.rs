//! Integer-sentinel entry points for callers that expect the classic
//! `re_*` calling convention.
//!
//! Match and search results are encoded as a non-negative length or offset
//! on success, `-1` when nothing matched and `-2` on an internal error.
//!
//! # Example
//!
//! ```
//! use regexpr_compiler::compat::{re_compile_pattern, re_search};
//! use regexpr_runtime::{CompiledPattern, Registers};
//!
//! let mut pattern = CompiledPattern::new();
//! assert_eq!(None, re_compile_pattern(b"\\(b+\\)c", &mut pattern));
//!
//! let mut regs = Registers::new();
//! assert_eq!(2, re_search(&pattern, b"aabbc", 0, 5, Some(&mut regs)));
//! assert_eq!((2, 4), (regs.start(1), regs.end(1)));
//! assert_eq!(-1, re_search(&pattern, b"aaaa", 0, 4, None));
//! ```

use log::debug;
use regexpr_runtime::{match_at, search, CompiledPattern, MatchError, Registers};

use crate::compiler::compile_pattern;
use crate::syntax::{set_syntax, SyntaxFlags};

/// The result of a call that found no match.
pub const NO_MATCH: isize = -1;
/// The result of a call that failed internally.
pub const INTERNAL_ERROR: isize = -2;

/// Replaces the default syntax flags, returning the previous bits.
pub fn re_set_syntax(syntax: u32) -> u32 {
    set_syntax(SyntaxFlags::from_bits(syntax)).bits()
}

/// Compiles a pattern under the default syntax, returning the error
/// message on failure.
pub fn re_compile_pattern(pattern: &[u8], target: &mut CompiledPattern) -> Option<String> {
    compile_pattern(pattern, target)
        .err()
        .map(|e| e.kind().message().to_string())
}

/// Matches anchored at `pos`, returning the match length.
pub fn re_match(
    pattern: &CompiledPattern,
    subject: &[u8],
    pos: usize,
    regs: Option<&mut Registers>,
) -> isize {
    to_sentinel(match_at(pattern, subject, pos, regs))
}

/// Searches from `start` across `range` positions, returning the match
/// offset.
pub fn re_search(
    pattern: &CompiledPattern,
    subject: &[u8],
    start: usize,
    range: isize,
    regs: Option<&mut Registers>,
) -> isize {
    to_sentinel(search(pattern, subject, start, range, regs))
}

fn to_sentinel(res: Result<Option<usize>, MatchError>) -> isize {
    match res {
        Ok(Some(value)) => isize::try_from(value).unwrap_or(INTERNAL_ERROR),
        Ok(None) => NO_MATCH,
        Err(e) => {
            debug!("match failed: {}", e);
            INTERNAL_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_with_dialect;
    use crate::syntax::Dialect;

    fn compiled(pattern: &[u8]) -> CompiledPattern {
        let mut target = CompiledPattern::new();
        compile_with_dialect(pattern, &Dialect::new(SyntaxFlags::EMACS), &mut target).unwrap();
        target
    }

    #[test]
    fn should_encode_results_as_sentinels() {
        let pattern = compiled(b"ab*");

        let input_output = [
            ((b"abbb".as_slice(), 0), 4),
            ((b"xabb".as_slice(), 0), NO_MATCH),
            ((b"xabb".as_slice(), 1), 3),
            ((b"ab".as_slice(), 3), INTERNAL_ERROR),
        ];

        for (test_id, ((subject, pos), expected)) in input_output.into_iter().enumerate() {
            let res = re_match(&pattern, subject, pos, None);
            assert_eq!((test_id, expected), (test_id, res));
        }
    }

    #[test]
    fn should_report_internal_error_for_uncompiled_pattern() {
        let pattern = CompiledPattern::new();

        assert_eq!(INTERNAL_ERROR, re_match(&pattern, b"a", 0, None));
        assert_eq!(INTERNAL_ERROR, re_search(&pattern, b"a", 0, 1, None));
    }

    #[test]
    fn should_search_backward_with_negative_range() {
        let pattern = compiled(b"ab");

        assert_eq!(3, re_search(&pattern, b"abxab", 5, -5, None));
        assert_eq!(NO_MATCH, re_search(&pattern, b"abxab", 1, 1, None));
    }

    #[test]
    fn should_swap_default_syntax_bits() {
        let previous = re_set_syntax(SyntaxFlags::AWK.bits());
        let awk = re_set_syntax(previous);

        assert_eq!(SyntaxFlags::AWK.bits(), awk);
    }
}
