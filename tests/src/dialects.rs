use regexpr_compiler::compat::{re_compile_pattern, re_match, re_set_syntax};
use regexpr_compiler::syntax::SyntaxFlags;
use regexpr_compiler::{compile, compile_pattern, set_syntax};
use regexpr_runtime::{match_at, CompiledPattern};

use crate::support::{compile_under, lock_default_syntax};

#[test]
fn should_interpret_pattern_per_dialect() {
    let input_output: [((SyntaxFlags, &[u8], &[u8]), Option<usize>); 10] = [
        ((SyntaxFlags::EMACS, b"a|b", b"a|b"), Some(3)),
        ((SyntaxFlags::EGREP, b"a|b", b"b"), Some(1)),
        ((SyntaxFlags::EMACS, b"a\\|b", b"b"), Some(1)),
        ((SyntaxFlags::EMACS, b"(a)", b"(a)"), Some(3)),
        ((SyntaxFlags::GREP, b"a\\+", b"aaa"), Some(3)),
        ((SyntaxFlags::GREP, b"a+", b"a+"), Some(2)),
        ((SyntaxFlags::GREP, b"a+", b"aa"), None),
        ((SyntaxFlags::EGREP, b"a\nb", b"b"), Some(1)),
        ((SyntaxFlags::EMACS, b"\\w\\W", b"a!"), Some(2)),
        ((SyntaxFlags::NO_GNU_EXTENSIONS, b"\\w", b"w"), Some(1)),
    ];

    for (test_id, ((flags, pattern, subject), expected)) in input_output.into_iter().enumerate() {
        let compiled = compile_under(flags, pattern).unwrap();
        let res = match_at(&compiled, subject, 0, None);

        assert_eq!((test_id, Ok(expected)), (test_id, res));
    }
}

#[test]
fn should_resolve_ansi_escapes() {
    let flags = SyntaxFlags::AWK | SyntaxFlags::ANSI_HEX;

    let input_output: [((&[u8], &[u8]), Option<usize>); 4] = [
        ((b"a\\tb", b"a\tb"), Some(3)),
        ((b"\\x41\\x62", b"Ab"), Some(2)),
        ((b"[\\n]", b"\n"), Some(1)),
        ((b"(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)\\v10", b"abcdefghijj"), Some(11)),
    ];

    for (test_id, ((pattern, subject), expected)) in input_output.into_iter().enumerate() {
        let compiled = compile_under(flags, pattern).unwrap();
        let res = match_at(&compiled, subject, 0, None);

        assert_eq!((test_id, Ok(expected)), (test_id, res));
    }
}

#[test]
fn should_compile_under_replaced_default_syntax() {
    let _guard = lock_default_syntax();

    let previous = set_syntax(SyntaxFlags::EGREP);
    let egrep = compile(b"(a|b)+").map(|compiled| match_at(&compiled, b"abba", 0, None));

    set_syntax(SyntaxFlags::EMACS);
    let mut emacs = CompiledPattern::new();
    let emacs_res = compile_pattern(b"(a|b)+", &mut emacs);

    set_syntax(previous);

    assert_eq!(Ok(Ok(Some(4))), egrep);
    assert!(emacs_res.is_ok());
    assert_eq!(Ok(Some(6)), match_at(&emacs, b"(a|b))", 0, None));
}

#[test]
fn should_report_messages_through_compat_surface() {
    let _guard = lock_default_syntax();

    let previous = re_set_syntax(SyntaxFlags::EMACS.bits());
    let mut pattern = CompiledPattern::new();
    let unbalanced = re_compile_pattern(b"\\(a", &mut pattern);
    let unusable = re_match(&pattern, b"a", 0, None);
    let balanced = re_compile_pattern(b"\\(a\\)b", &mut pattern);
    let matched = re_match(&pattern, b"ab", 0, None);
    re_set_syntax(previous);

    assert_eq!(Some("Badly placed parenthesis".to_string()), unbalanced);
    assert_eq!(-2, unusable);
    assert_eq!(None, balanced);
    assert_eq!(2, matched);
}
