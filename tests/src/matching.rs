use regexpr_compiler::syntax::SyntaxFlags;
use regexpr_compiler::CompileErrorKind;
use regexpr_runtime::syntax::casefold_table;
use regexpr_runtime::{match_at, search, CanMatchEmpty, CompiledPattern, Registers};

use crate::support::compile_under;

#[test]
fn should_match_anchored_at_position() {
    let input_output: [((&[u8], &[u8], usize), Option<usize>); 16] = [
        ((b"a*", b"aaab", 0), Some(3)),
        ((b"a*", b"baaa", 0), Some(0)),
        ((b"(a|ab)", b"ab", 0), Some(1)),
        ((b"(a|ab)c", b"abc", 0), Some(3)),
        ((b"(a+)\\1", b"aaaa", 0), Some(4)),
        ((b"(a+)\\1", b"aaa", 0), Some(2)),
        ((b"[a-]", b"-", 0), Some(1)),
        ((b"[a-]", b"b", 0), None),
        ((b"[^a]", b"\n", 0), Some(1)),
        ((b"a+b", b"aaab", 0), Some(4)),
        ((b"a+b", b"b", 0), None),
        ((b"a?b", b"b", 0), Some(1)),
        ((b"x(ab)*y", b"xababy", 0), Some(6)),
        ((b"a.c", b"a\nc", 0), None),
        ((b"\\<cd", b"ab cd", 3), Some(2)),
        ((b"ab|cd", b"cd", 0), Some(2)),
    ];

    for (test_id, ((pattern, subject, pos), expected)) in input_output.into_iter().enumerate() {
        let compiled = compile_under(SyntaxFlags::EGREP, pattern).unwrap();
        let res = match_at(&compiled, subject, pos, None);

        assert_eq!((test_id, Ok(expected)), (test_id, res));
    }
}

#[test]
fn should_terminate_loops_whose_body_matches_empty() {
    let input_output: [((&[u8], &[u8]), Option<usize>); 12] = [
        ((b"()*", b""), Some(0)),
        ((b"()*", b"b"), Some(0)),
        ((b"()*", b"abc"), Some(0)),
        ((b"(a*)*", b""), Some(0)),
        ((b"(a*)*", b"b"), Some(0)),
        ((b"(a*)*", b"abc"), Some(1)),
        ((b"(a|b*)*c", b""), None),
        ((b"(a|b*)*c", b"b"), None),
        ((b"(a|b*)*c", b"abc"), Some(3)),
        ((b"(^)*a", b"a"), Some(1)),
        ((b"(b?)+c", b"bbc"), Some(3)),
        ((b"(b?)+c", b"c"), Some(1)),
    ];

    for (test_id, ((pattern, subject), expected)) in input_output.into_iter().enumerate() {
        let compiled = compile_under(SyntaxFlags::EGREP, pattern).unwrap();
        let res = match_at(&compiled, subject, 0, None);

        assert_eq!((test_id, Ok(expected)), (test_id, res));
    }
}

#[test]
fn should_search_past_loops_whose_body_matches_empty() {
    let compiled = compile_under(SyntaxFlags::EGREP, b"(a*)*b").unwrap();
    let mut regs = Registers::new();

    assert_eq!(Ok(Some(2)), search(&compiled, b"xxaab", 0, 5, None));
    assert_eq!(Ok(Some(2)), search(&compiled, b"xxaab", 2, 3, Some(&mut regs)));
    assert_eq!(Some(2..5), regs.span(0));
    assert_eq!(Ok(None), search(&compiled, b"xxaa", 0, 4, None));
}

#[test]
fn should_search_for_leftmost_match() {
    let input_output: [((&[u8], &[u8]), Option<usize>); 7] = [
        ((b"^abc", b"xx\nabc"), Some(3)),
        ((b"^abc", b"xxabc"), None),
        ((b"b+c", b"abbbc"), Some(1)),
        ((b"c$", b"abc\nc"), Some(2)),
        ((b"\\`a", b"ba\na"), None),
        ((b"a\\'", b"aba"), Some(2)),
        ((b"x*", b"abc"), Some(0)),
    ];

    for (test_id, ((pattern, subject), expected)) in input_output.into_iter().enumerate() {
        let compiled = compile_under(SyntaxFlags::EGREP, pattern).unwrap();
        let res = search(&compiled, subject, 0, subject.len() as isize, None);

        assert_eq!((test_id, Ok(expected)), (test_id, res));
    }
}

#[test]
fn should_fill_group_registers() {
    let compiled = compile_under(SyntaxFlags::EGREP, b"(a+)(b*)c").unwrap();
    let mut regs = Registers::new();

    let offset = search(&compiled, b"xaabbc", 0, 6, Some(&mut regs));

    assert_eq!(Ok(Some(1)), offset);
    assert_eq!(Some(1..6), regs.span(0));
    assert_eq!(Some(1..3), regs.span(1));
    assert_eq!(Some(3..5), regs.span(2));
    assert_eq!((-1, -1), (regs.start(3), regs.end(3)));
}

#[test]
fn should_leave_registers_of_untaken_groups_unset() {
    let compiled = compile_under(SyntaxFlags::EGREP, b"(a)|b").unwrap();
    let mut regs = Registers::new();

    assert_eq!(Ok(Some(1)), match_at(&compiled, b"b", 0, Some(&mut regs)));
    assert_eq!(Some(0..1), regs.span(0));
    assert_eq!(None, regs.span(1));
    assert_eq!((-1, -1), (regs.start(1), regs.end(1)));
}

#[test]
fn should_leave_all_but_whole_match_unset_without_groups() {
    let compiled = compile_under(SyntaxFlags::EGREP, b"ab*").unwrap();
    let mut regs = Registers::new();

    assert_eq!(Ok(Some(1)), search(&compiled, b"xabb", 0, 4, Some(&mut regs)));
    assert_eq!(Some(1..4), regs.span(0));
    assert!((1..regexpr_runtime::MAX_REGISTERS).all(|reg| regs.start(reg) == -1 && regs.end(reg) == -1));
}

#[test]
fn should_match_under_case_folding_translation() {
    let mut compiled = CompiledPattern::new().with_translate(casefold_table());
    regexpr_compiler::compile_with_dialect(
        b"hel+o|(w)\\1",
        &regexpr_compiler::Dialect::new(SyntaxFlags::EGREP),
        &mut compiled,
    )
    .unwrap();

    assert_eq!(Ok(Some(5)), match_at(&compiled, b"HeLLo", 0, None));
    assert_eq!(Ok(Some(2)), match_at(&compiled, b"wW", 0, None));
    assert_eq!(Ok(Some(2)), search(&compiled, b"xxHELLO", 0, 7, None));
}

#[test]
fn should_report_compile_errors_with_fixed_messages() {
    let input_output: [(&[u8], (CompileErrorKind, &str)); 5] = [
        (
            b"(a",
            (CompileErrorKind::BadlyPlacedParenthesis, "Badly placed parenthesis"),
        ),
        (
            b"a)",
            (CompileErrorKind::BadlyPlacedParenthesis, "Badly placed parenthesis"),
        ),
        (
            b"*a",
            (CompileErrorKind::BadlyPlacedSpecial, "Badly placed special character"),
        ),
        (
            b"ab\\",
            (CompileErrorKind::EndsPrematurely, "Regular expression ends prematurely"),
        ),
        (
            b"(a)\\0",
            (CompileErrorKind::BadMatchRegister, "Bad match register number"),
        ),
    ];

    for (test_id, (pattern, expected)) in input_output.into_iter().enumerate() {
        let res = compile_under(SyntaxFlags::EGREP, pattern)
            .map(|_| ())
            .map_err(|e| (e.kind(), e.kind().message()));

        assert_eq!((test_id, Err(expected)), (test_id, res));
    }
}

#[test]
fn should_compute_identical_fastmap_on_recompute() {
    let mut compiled = compile_under(SyntaxFlags::EGREP, b"(ab|cd)*e").unwrap();

    let first = *compiled.compile_fastmap().unwrap();
    let second = *compiled.compile_fastmap().unwrap();

    assert_eq!(first, second);
    assert_eq!(CanMatchEmpty::No, first.can_match_empty);
    for b in [b'a', b'c', b'e'] {
        assert!(first.may_start_with(b));
    }
    for b in [b'b', b'd', b'x'] {
        assert!(!first.may_start_with(b));
    }
}

#[test]
fn should_agree_with_fastmap_disabled() {
    let subject = b"xxyy\nzzcdcdeab";
    let mut compiled = compile_under(SyntaxFlags::EGREP, b"(ab|cd)*e").unwrap();

    let with_fastmap = search(&compiled, subject, 0, subject.len() as isize, None);
    compiled.set_fastmap_enabled(false);
    let without_fastmap = search(&compiled, subject, 0, subject.len() as isize, None);

    assert_eq!(Ok(Some(7)), with_fastmap);
    assert_eq!(with_fastmap, without_fastmap);
}
