use proptest::prelude::*;
use regexpr_compiler::syntax::SyntaxFlags;
use regexpr_runtime::{match_at, search, CanMatchEmpty, CompiledPattern, Registers, MAX_REGISTERS};

use crate::support::compile_under;

/// Group and alternation operators without backslashes, misplaced
/// operators taken literally.
const FLAGS: SyntaxFlags = SyntaxFlags::NO_BK_PARENS.union(SyntaxFlags::NO_BK_VBAR);

const ATOMS: &[&str] = &[
    "a", "b", "c", ".", "[ab]", "[^a]", "a*", "b+", "c?", "(a|b)", "(ab)*", "(a*)b", "\\w", "x|y",
    "(a*)*", "(b?)+", "()*",
];

fn pattern_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(proptest::sample::select(ATOMS), 1..6).prop_map(|atoms| atoms.concat())
}

const SUBJECT_BYTES: &[u8] = b"abcx\n";

fn subject_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(proptest::sample::select(SUBJECT_BYTES), 0..12)
}

fn compiled(pattern: &str) -> CompiledPattern {
    compile_under(FLAGS, pattern.as_bytes()).expect("generated patterns are valid")
}

fn has_groups(pattern: &str) -> bool {
    pattern.contains('(')
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn search_offset_is_leftmost_anchored_match(pattern in pattern_strategy(), subject in subject_strategy()) {
        let compiled = compiled(&pattern);
        let mut regs = Registers::new();

        let found = search(&compiled, &subject, 0, subject.len() as isize, Some(&mut regs)).unwrap();
        let first_match = (0..=subject.len())
            .find(|&pos| match_at(&compiled, &subject, pos, None).unwrap().is_some());
        prop_assert_eq!(first_match, found);

        if let Some(offset) = found {
            let len = match_at(&compiled, &subject, offset, None).unwrap().unwrap();
            prop_assert_eq!(Some(offset..offset + len), regs.span(0));

            for reg in 1..MAX_REGISTERS {
                if let Some(span) = regs.span(reg) {
                    prop_assert!(offset <= span.start && span.start <= span.end && span.end <= offset + len);
                }
            }
        }
    }

    #[test]
    fn search_agrees_with_fastmap_disabled(pattern in pattern_strategy(), subject in subject_strategy()) {
        let mut compiled = compiled(&pattern);
        let range = subject.len() as isize;

        let with_fastmap = search(&compiled, &subject, 0, range, None);
        compiled.set_fastmap_enabled(false);
        let without_fastmap = search(&compiled, &subject, 0, range, None);

        prop_assert_eq!(with_fastmap, without_fastmap);
    }

    #[test]
    fn backward_search_finds_rightmost_match(pattern in pattern_strategy(), subject in subject_strategy()) {
        let compiled = compiled(&pattern);
        let len = subject.len();

        let found = search(&compiled, &subject, len, -(len as isize), None).unwrap();
        let last_match = (0..=len)
            .rev()
            .find(|&pos| match_at(&compiled, &subject, pos, None).unwrap().is_some());
        prop_assert_eq!(last_match, found);
    }

    #[test]
    fn matching_is_deterministic(pattern in pattern_strategy(), subject in subject_strategy()) {
        let compiled = compiled(&pattern);
        let (mut first, mut second) = (Registers::new(), Registers::new());

        let first_res = match_at(&compiled, &subject, 0, Some(&mut first));
        let second_res = match_at(&compiled, &subject, 0, Some(&mut second));

        prop_assert_eq!(first_res, second_res);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn registers_beyond_whole_match_stay_unset_without_groups(pattern in pattern_strategy(), subject in subject_strategy()) {
        if has_groups(&pattern) {
            return Ok(());
        }
        let compiled = compiled(&pattern);
        let mut regs = Registers::new();

        if search(&compiled, &subject, 0, subject.len() as isize, Some(&mut regs)).unwrap().is_some() {
            prop_assert!((1..MAX_REGISTERS).all(|reg| regs.start(reg) == -1 && regs.end(reg) == -1));
        }
    }

    #[test]
    fn fastmap_is_stable_and_admits_every_first_byte(pattern in pattern_strategy(), subject in subject_strategy()) {
        let mut compiled = compiled(&pattern);
        let first = *compiled.compile_fastmap().unwrap();
        let second = *compiled.compile_fastmap().unwrap();
        prop_assert_eq!(first, second);

        for pos in 0..subject.len() {
            if let Some(len) = match_at(&compiled, &subject, pos, None).unwrap() {
                if len > 0 {
                    prop_assert!(first.may_start_with(subject[pos]));
                } else {
                    prop_assert!(first.can_match_empty != CanMatchEmpty::No);
                }
            }
        }
    }
}
