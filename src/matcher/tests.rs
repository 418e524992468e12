use super::*;
use crate::{compile, Pattern};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn all_matches(src: &str, flags: &str, text: &str) -> Vec<String> {
    let p = compile(src, flags).unwrap();
    let mut m = p.matcher(text);
    m.find_iter().map(|s| s.to_string()).collect()
}

fn first_span(src: &str, text: &str) -> Option<(usize, usize)> {
    let p = compile(src, "").unwrap();
    let mut m = p.matcher(text);
    if m.find() {
        Some((m.start(0).unwrap(), m.end(0).unwrap()))
    } else {
        None
    }
}

#[test]
fn test_find_successive_matches() {
    assert_eq!(all_matches(r"\d+", "", "a1b22c333"), ["1", "22", "333"]);
    assert_eq!(all_matches("ab", "", "xxabyyab"), ["ab", "ab"]);
    assert!(all_matches("q", "", "abc").is_empty());
}

#[test]
fn test_empty_matches_advance() {
    assert_eq!(all_matches("a*", "", "baa"), ["", "aa", ""]);
    let p = compile("x*", "").unwrap();
    assert_eq!(p.matcher("").count_matches(), 1);
    assert_eq!(p.matcher("yy").count_matches(), 3);
}

#[test]
fn test_lazy_quantifiers() {
    assert_eq!(all_matches("a+?", "", "aaa"), ["a", "a", "a"]);
    assert_eq!(all_matches("<.+?>", "", "<a><b>"), ["<a>", "<b>"]);
    assert_eq!(all_matches("<.+>", "", "<a><b>"), ["<a><b>"]);
    assert_eq!(first_span("a??b", "ab"), Some((0, 2)));
    assert_eq!(first_span(".*?foo", "xfooyfoo"), Some((0, 4)));
}

#[test]
fn test_lazy_star_enumerates_through_the_stack() {
    let p = compile("a*?", "").unwrap();
    let mut m = p.matcher("aa");
    let mut spans = Vec::new();
    while m.find() {
        spans.push((m.start(0).unwrap(), m.end(0).unwrap()));
    }
    assert_eq!(spans, [(0, 0), (0, 1), (1, 1), (1, 2), (2, 2)]);
}

#[test]
fn test_greedy_backtracking_to_literal() {
    assert_eq!(first_span(".*foo", "xfooyfooz"), Some((0, 8)));
    assert_eq!(first_span("a*ab", "aaab"), Some((0, 4)));
    assert_eq!(first_span(r"\w+\d", "abc1 x"), Some((0, 4)));
    assert_eq!(first_span("[ab]*c", "ababd"), None);
}

#[test]
fn test_proceed_enumerates_every_match() {
    let p = compile("a+", "").unwrap();
    let mut m = p.matcher("aaa");
    let mut spans = Vec::new();
    while m.proceed() {
        spans.push((m.start(0).unwrap(), m.end(0).unwrap()));
    }
    assert_eq!(spans, [(0, 3), (0, 2), (0, 1), (1, 3), (1, 2), (2, 3)]);
}

#[test]
fn test_proceed_tries_alternatives() {
    let p = compile("(a|ab)(c|bcd)", "").unwrap();
    let mut m = p.matcher("abcd");
    assert!(m.find());
    assert_eq!(m.group(0).unwrap().as_deref(), Some("abcd"));
    assert_eq!(m.group(1).unwrap().as_deref(), Some("a"));
    assert!(m.proceed());
    assert_eq!(m.group(0).unwrap().as_deref(), Some("abc"));
    assert_eq!(m.group(1).unwrap().as_deref(), Some("ab"));
}

#[test]
fn test_lookahead() {
    assert_eq!(all_matches(r"\w+(?=!)", "", "hi there!"), ["there"]);
    assert_eq!(first_span("foo(?!bar)", "foobar foobaz"), Some((7, 10)));
    assert_eq!(first_span("(?=.*b)a", "cab"), Some((1, 2)));
}

#[test]
fn test_lookbehind() {
    assert_eq!(first_span("(?<=\\$)\\d+", "a $42"), Some((3, 5)));
    assert_eq!(all_matches(r"(?<!\$)\b\d+", "", "$10 20"), ["20"]);
    // a lookbehind cannot see before the start of the target
    let p = compile("(?<=a)b", "").unwrap();
    let mut m = p.empty_matcher();
    m.set_target_range("ab", 1, 1);
    assert!(!m.find());
    m.set_target("ab");
    assert!(m.find());
}

#[test]
fn test_lookaround_captures_survive() {
    let p = compile(r"(?=(\d+))\w+", "").unwrap();
    let mut m = p.matcher("123abc");
    assert!(m.find());
    assert_eq!(m.group(1).unwrap().as_deref(), Some("123"));
    assert_eq!(m.group(0).unwrap().as_deref(), Some("123abc"));
}

#[test]
fn test_atomic_groups() {
    let p = compile("(?>a+)b", "").unwrap();
    assert!(p.matches("aaab"));
    let p = compile("(?>a*)a", "").unwrap();
    assert!(!p.matches("aaa"));
    let p = compile("(?>a|ab)c", "").unwrap();
    assert!(p.matches("ac"));
    assert!(!p.matches("abc"));
}

#[test]
fn test_group_conditionals() {
    let p = compile(r"^(<)?\w+(?(1)>)$", "").unwrap();
    assert!(p.matches("<a>"));
    assert!(p.matches("a"));
    assert!(!p.matches("<a"));
    assert!(!p.matches("a>"));

    let p = compile(r"(a)?(?(1)b|c)", "").unwrap();
    assert!(p.matches("ab"));
    assert!(p.matches("c"));
    assert!(!p.matches("ac"));
}

#[test]
fn test_lookaround_conditionals() {
    let p = compile(r"(?(?=\d)\d{3}|[a-z]{2})", "").unwrap();
    assert!(p.matches("123"));
    assert!(p.matches("ab"));
    assert!(!p.matches("1b"));

    let p = compile(r"(?(?!\d)[a-z]|\d\d)", "").unwrap();
    assert!(p.matches("q"));
    assert!(p.matches("42"));
    assert!(!p.matches("4"));
}

#[test]
fn test_counted_loops() {
    assert_eq!(all_matches("(?:ab){2,3}", "", "abababab"), ["ababab"]);
    assert_eq!(all_matches("(?:ab){2,3}?", "", "abababab"), ["abab", "abab"]);
    assert_eq!(all_matches("a{2,}?", "", "aaaaa"), ["aa", "aa"]);

    let p = compile("(a|b){3}", "").unwrap();
    let mut m = p.matcher("abba");
    assert!(m.find());
    assert_eq!(m.group(0).unwrap().as_deref(), Some("abb"));
    assert_eq!(m.group(1).unwrap().as_deref(), Some("b"));

    let p = compile("(?:a|bc){2}d", "").unwrap();
    assert!(p.matches("abcd"));
    assert!(!p.matches("ad"));
}

#[test]
fn test_nested_counted_loops_restore_counters() {
    let p = compile("(?:(?:ab){1,2}c){2}", "").unwrap();
    assert!(p.matches("abcababc"));
    assert!(!p.matches("abc"));
}

#[test]
fn test_empty_iterations_leave_loops() {
    assert!(compile("(a|)*b", "").unwrap().matches("aab"));
    assert!(compile("(?:a?)+b", "").unwrap().matches("b"));
    assert!(compile("(?:)*x", "").unwrap().matches("x"));
    assert!(compile("(a*){2,}b", "").unwrap().matches("b"));
    assert_eq!(first_span("(?:a*)*", "b"), Some((0, 0)));
}

#[test]
fn test_backreferences() {
    assert_eq!(all_matches(r"(\w)\1", "", "abccdee"), ["cc", "ee"]);
    assert!(compile(r"(a)\1", "i").unwrap().matches("aA"));
    assert!(compile(r"(ab)\1{2}", "").unwrap().matches("ababab"));
    assert!(!compile(r"(ab)\1{2}", "").unwrap().matches("abab"));
    assert!(compile(r"(?<q>['x])\w*\k<q>", "").unwrap().matches("'abc'"));
    assert_eq!(first_span(r"(a+)x*\1", "aaxxaa"), Some((0, 6)));
}

#[test]
fn test_unset_backreference_matches_empty() {
    assert!(compile(r"(a)?\1b", "").unwrap().matches("b"));
    assert!(compile(r"(a)?\1*b", "").unwrap().matches("b"));
    assert!(compile(r"(a)?x*\1b", "").unwrap().matches("xxb"));
    assert!(compile(r"(?:(a)|b)\1", "").unwrap().matches("b"));
}

#[test]
fn test_backref_to_group_recaptured_in_loop() {
    let p = compile(r"(?:(a*)\1,)*", "").unwrap();
    let mut m = p.matcher("aaaa,aa,");
    assert!(m.matches());
    assert_eq!(m.group(1).unwrap().as_deref(), Some("a"));

    assert!(p.matches("aa,,"));
    assert!(!p.matches("aaa,"));
    assert_eq!(first_span(r"(a+)(a*)\1,", "aaa,"), Some((0, 4)));
}

#[test]
fn test_anchors_and_flags() {
    assert_eq!(first_span("(?m)^b", "a\nb"), Some((2, 3)));
    assert_eq!(first_span("^b", "a\nb"), None);
    assert_eq!(first_span("a$", "a\n"), Some((0, 1)));
    assert_eq!(first_span(r"a\z", "a\n"), None);
    assert!(!compile("a.c", "").unwrap().matches("a\nc"));
    assert!(compile("a.c", "s").unwrap().matches("a\nc"));
    assert!(compile("[a-c]+", "i").unwrap().matches("AbC"));
    assert!(compile("a b", "x").unwrap().matches("ab"));
    assert_eq!(first_span(r"\bis\b", "this is"), Some((5, 7)));
    assert_eq!(first_span(r"\Bis", "this is"), Some((2, 4)));
}

#[test]
fn test_last_match_anchor() {
    let p = compile(r"\Ga", "").unwrap();
    assert_eq!(p.matcher("aab").count_matches(), 2);
    assert_eq!(p.matcher("aba").count_matches(), 1);
}

#[test]
fn test_search_options() {
    let p = compile("b", "").unwrap();
    let mut m = p.matcher("ab");
    assert!(!m.find_with(SearchOptions::ANCHOR_START));
    m.set_position(1);
    assert!(m.find_with(SearchOptions::ANCHOR_START));

    let mut m = p.matcher("abb");
    assert!(m.find_with(SearchOptions::ANCHOR_END));
    assert_eq!(m.start(0).unwrap(), 2);
}

#[test]
fn test_matches_prefix() {
    let p = compile("abc", "").unwrap();
    assert!(p.starts_with("ab"));
    assert!(p.starts_with("abc"));
    assert!(!p.starts_with("abx"));
    assert!(!p.starts_with("abcd"));

    let p = compile(r"\d{3}-\d{4}", "").unwrap();
    assert!(p.starts_with("555-1"));
    assert!(!p.starts_with("55a"));

    let p = compile(r"(ab)\1", "").unwrap();
    assert!(p.starts_with("aba"));
}

#[test]
fn test_matches_resets_between_calls() {
    let p = compile("a+", "").unwrap();
    let mut m = p.matcher("aaa");
    assert!(m.find());
    assert!(m.matches());
    assert!(m.matches());
    assert_eq!(m.end(0).unwrap(), 3);
}

#[test]
fn test_target_range_and_positions() {
    let p = compile(r"\d+", "").unwrap();
    let mut m = p.empty_matcher();
    m.set_target_range("xx12ab34yy", 2, 6);
    assert_eq!(m.target(), "12ab34");
    assert!(m.find());
    assert_eq!(m.start(0).unwrap(), 0);
    assert_eq!(m.bounds(0).unwrap(), Some((2, 4)));
    assert_eq!(m.suffix(), "ab34");
    assert!(m.find());
    assert_eq!(m.prefix(), "12ab");
    assert!(!m.find());

    m.set_position(3);
    assert!(m.find());
    assert_eq!(m.group(0).unwrap().as_deref(), Some("34"));

    m.set_offset(5);
    assert_eq!(m.target(), "b34");
    assert_eq!(m.char_at(0), Some('b'));
    assert_eq!(m.char_at(3), None);
}

#[test]
fn test_shared_targets() {
    let p = compile(r"(\w+)=(\w+)", "").unwrap();
    let mut m = p.matcher("key=value;");
    assert!(m.find());

    let q = compile("a", "").unwrap();
    let mut sub = q.empty_matcher();
    sub.set_target_from(&m, 2).unwrap();
    assert!(sub.is_shared());
    assert!(m.is_shared());
    assert_eq!(sub.target(), "value");
    assert!(sub.find());
    assert_eq!(sub.start(0).unwrap(), 1);
    assert_eq!(sub.bounds(0).unwrap(), Some((5, 6)));

    sub.set_target("xyz");
    assert!(!sub.is_shared());
    assert!(!m.is_shared());

    m.set_target_group(1).unwrap();
    assert_eq!(m.target(), "key");
    assert!(!m.find());
}

#[test]
fn test_snapshot_outlives_next_search() {
    let p = compile(r"(\d)(\d)?", "").unwrap();
    let mut m = p.matcher("1 23");
    let snaps: Vec<_> = m.find_iter().collect();
    assert_eq!(snaps.len(), 2);
    assert_eq!(snaps[0].group(1).unwrap().as_deref(), Some("1"));
    assert_eq!(snaps[0].group(2).unwrap(), None);
    assert_eq!(snaps[1].to_string(), "23");
    assert_eq!(snaps[1].span(), Some((2, 4)));
    assert_eq!(
        snaps[1].groups(),
        vec![Some("23".to_string()), Some("2".to_string()), Some("3".to_string())]
    );
}

#[test]
fn test_group_errors() {
    let p = compile("(?<x>a)|b", "").unwrap();
    let mut m = p.matcher("b");
    assert!(m.find());
    assert!(matches!(m.group(5), Err(Error::UnknownGroup(_))));
    assert!(matches!(m.group("nope"), Err(Error::UnknownGroup(_))));
    assert!(matches!(m.group(-1), Err(Error::UnknownGroup(_))));
    assert_eq!(m.group(1).unwrap(), None);
    assert_eq!(m.group("x").unwrap(), None);
    assert!(!m.is_captured("x"));
    match m.start("x") {
        Err(Error::Unassigned(g)) => assert_eq!(g, "x"),
        other => panic!("expected unassigned, got {:?}", other),
    }
    assert!(matches!(m.length(1), Err(Error::Unassigned(_))));
    assert!(m.set_target_group(1).is_err());
}

#[test]
fn test_failed_search_clears_the_match() {
    let p = compile("a", "").unwrap();
    let mut m = p.matcher("a");
    assert!(m.find());
    assert!(!m.find());
    assert_eq!(m.group(0).unwrap(), None);
    assert_eq!(m.prefix(), "");
    assert!(!m.find());
}

#[test]
fn test_unicode_classes() {
    assert!(compile(r"\p{Lu}+", "").unwrap().matches("ÀB"));
    assert!(!compile(r"\p{Lu}+", "").unwrap().matches("Àb"));
    assert!(compile(r"\P{L}", "").unwrap().matches("7"));
    assert!(compile(r"\w+", "u").unwrap().matches("héllo"));
    assert!(!compile(r"\w+", "").unwrap().matches("héllo"));
}

#[test]
fn test_non_ascii_offsets_are_chars() {
    let p = compile("b", "").unwrap();
    let mut m = p.matcher("ééb");
    assert!(m.find());
    assert_eq!(m.start(0).unwrap(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_full_match_is_a_prefix(s in "[ab]{0,10}") {
        for src in ["(a|b)*abb", "a*b+a?", "(ab)+", "(?:a|ab)(?:b|)", r"(a)\1*b?"] {
            let p = compile(src, "").unwrap();
            if p.matches(&s) {
                prop_assert!(p.starts_with(&s), "{} on {:?}", src, s);
            }
        }
    }

    #[test]
    fn prop_suffix_oracle(s in "[ab]{0,12}") {
        let p = compile("(a|b)*abb", "").unwrap();
        prop_assert_eq!(p.matches(&s), s.ends_with("abb"));
    }

    #[test]
    fn prop_captures_are_ordered(s in "[abc]{0,12}") {
        for src in [r"(a+)(b*)c", r"(?:(a)|(b))+", r"(?<=(a))b", r"((a)|c)*?b"] {
            let p = compile(src, "").unwrap();
            let mut m = p.matcher(&s);
            while m.find() {
                for g in 0..m.group_count() {
                    if let Some((st, en)) = m.bounds(g).unwrap() {
                        prop_assert!(st <= en && en <= s.len(), "{} on {:?}", src, s);
                    }
                }
            }
        }
    }

    #[test]
    fn prop_compiling_twice_agrees(s in "[ab ]{0,12}") {
        let src = r"\b(a+)b|b\s";
        let (p, q) = (compile(src, "").unwrap(), compile(src, "").unwrap());
        let left: Vec<_> = p.matcher(&s).find_iter().map(|m| m.span()).collect();
        let right: Vec<_> = q.matcher(&s).find_iter().map(|m| m.span()).collect();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_shortcuts_agree_with_plain_graph(s in "[a,]{0,12}") {
        for src in [
            r"(?:(a*)\1,)*",
            r"(a*),\1",
            r"(a)a*\1",
            r"(a+)(a*)\1,",
            r"(?:(a)|,)+\1",
            r"a*,",
            r".*a,",
            r"(,)?a*\1",
            r"^a+,?$",
            r"(?:a,)+?a",
        ] {
            let fast = compile(src, "").unwrap();
            let plain = Pattern::compile_unoptimized(src, "").unwrap();
            prop_assert_eq!(fast.matches(&s), plain.matches(&s), "{} on {:?}", src, s);
            let left: Vec<_> = fast.matcher(&s).find_iter().map(|m| m.span()).collect();
            let right: Vec<_> = plain.matcher(&s).find_iter().map(|m| m.span()).collect();
            prop_assert_eq!(left, right, "{} on {:?}", src, s);
        }
    }

    #[test]
    fn prop_unset_backref_is_empty(s in "[ab]{0,12}") {
        let with = compile(r"(x)?\1a", "").unwrap();
        let without = compile("a", "").unwrap();
        let left: Vec<_> = with.matcher(&s).find_iter().map(|m| m.span()).collect();
        let right: Vec<_> = without.matcher(&s).find_iter().map(|m| m.span()).collect();
        prop_assert_eq!(left, right);
    }
}
