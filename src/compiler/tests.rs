use super::*;
use pretty_assertions::assert_eq;

fn compiled(src: &str) -> Compiled {
    compile(src, Flags::empty(), ClassRegistry::shared()).unwrap()
}

fn error(src: &str) -> SyntaxError {
    compile(src, Flags::empty(), ClassRegistry::shared()).unwrap_err()
}

fn has(src: &str, pred: impl Fn(&Term) -> bool) -> bool {
    compiled(src).program.terms().any(pred)
}

#[test]
fn test_unbalanced_parentheses() {
    assert_eq!(error("(a"), SyntaxError::new("unbalanced parenthesis", 2));
    assert_eq!(error("a)"), SyntaxError::new("unbalanced parenthesis", 1));
    assert_eq!(error("(?"), SyntaxError::new("unbalanced parenthesis", 0));
}

#[test]
fn test_quantifier_errors() {
    assert_eq!(error("*a"), SyntaxError::new("missing term before *", 0));
    assert_eq!(error("a**"), SyntaxError::new("stacked quantifiers", 2));
    assert_eq!(error("a{3,1}"), SyntaxError::new("wrong quantifier bounds", 1));
    assert_eq!(error("a{1,2"), SyntaxError::new("malformed quantifier", 1));
    assert_eq!(
        error("a{99999999999}").message,
        "quantifier too large".to_string()
    );
}

#[test]
fn test_lookbehind_width_errors() {
    assert_eq!(
        error("(?<=a+)b").message,
        "variable length element within a lookbehind assertion"
    );
    assert_eq!(
        error("(?<=ab|c)d").message,
        "variable length element within a lookbehind assertion"
    );
    assert_eq!(
        error(r"(a)(?<=\1)").message,
        "variable length element within a lookbehind assertion"
    );
}

#[test]
fn test_group_reference_errors() {
    assert_eq!(
        error(r"(a)\2"),
        SyntaxError::new("reference to an undeclared group: 2", 3)
    );
    assert_eq!(
        error(r"\k<x>(?<x>a)").message,
        "reference to an undeclared group: x"
    );
    assert_eq!(
        error("(?<n>a)(?<n>b)").message,
        "group redeclaration: n"
    );
    assert_eq!(error("({0}a)").message, "group 0 cannot be declared");
    assert_eq!(error("({2}a)({2}b)").message, "group redeclaration: 2");
}

#[test]
fn test_syntax_errors_from_groups_and_escapes() {
    assert_eq!(error("(?z)"), SyntaxError::new("wrong char after (?", 2));
    assert_eq!(error(r"a\zb"), SyntaxError::new("misplaced end anchor", 1));
    assert_eq!(error("(?#open").message, "unterminated comment");
    assert_eq!(
        error("(a)(?(1)a|b|c)").message,
        "attempt to set a 3rd choice in a conditional expr"
    );
    assert_eq!(error("(?(x)a)").message, "reference to an undeclared group: x");
    assert!(error("[a-").message.contains("unbalanced brackets"));
    assert_eq!(error(r"\p{Nope}").message, "unknown class: {Nope}");
}

#[test]
fn test_slot_allocation() {
    let c = compiled("(a)(?:b)(?<x>c)(?P<y>d)");
    assert_eq!(c.slot_count, 4);
    assert_eq!(c.names.get("x"), Some(&2));
    assert_eq!(c.names.get("y"), Some(&3));

    // numeric names address their slot directly
    let c = compiled("({3}x)(y)");
    assert_eq!(c.slot_count, 5);
    assert!(c.names.is_empty());

    // a reassigned name reuses its slot
    let c = compiled("({n}a)({=n}b)");
    assert_eq!(c.slot_count, 2);
}

#[test]
fn test_comments_and_flag_groups() {
    let c = compiled("(?#note)a(?i)b");
    assert_eq!(c.slot_count, 1);
    assert!(c.program.terms().any(|t| matches!(t, Term::Char('a'))));
    assert!(c.program.terms().any(|t| matches!(t, Term::Class(_))));
    assert!(!c.program.terms().any(|t| matches!(t, Term::Char('b'))));
}

#[test]
fn test_icase_caseless_char_stays_char() {
    let c = compile("1", Flags::IGNORE_CASE, ClassRegistry::shared()).unwrap();
    assert!(c.program.terms().any(|t| matches!(t, Term::Char('1'))));
}

#[test]
fn test_primitive_repeats() {
    assert!(has("a*", |t| matches!(
        t,
        Term::Repeat {
            min: 0,
            max: None,
            ..
        }
    )));
    assert!(has("[ab]{2,5}", |t| matches!(
        t,
        Term::Repeat {
            min: 2,
            max: Some(5),
            ..
        }
    )));
    assert!(has("a?", |t| matches!(t, Term::Branch { .. })));
    assert_eq!(compiled("a+").repeats.len(), 1);
}

#[test]
fn test_lazy_star_is_a_branch_loop() {
    let c = compiled("a*?");
    assert!(c.repeats.is_empty());
    match c.program.term(c.root0) {
        Term::Branch { alt } => assert!(matches!(c.program.term(*alt), Term::Char('a'))),
        other => panic!("expected branch, got {:?}", other),
    }
}

#[test]
fn test_compound_loops() {
    let c = compiled("(?:ab)+");
    assert!(c.program.terms().any(|t| matches!(t, Term::LoopMark { .. })));
    assert!(c
        .program
        .terms()
        .any(|t| matches!(t, Term::LoopGuard { counter: None, .. })));
    assert!(!c.program.terms().any(|t| matches!(t, Term::CounterReset { .. })));

    let c = compiled("(?:ab){2,4}");
    assert!(c.program.terms().any(|t| matches!(t, Term::CounterReset { .. })));
    assert!(c
        .program
        .terms()
        .any(|t| matches!(t, Term::CounterBelow { max: 4, .. })));
    assert!(c
        .program
        .terms()
        .any(|t| matches!(t, Term::CounterAtLeast { min: 2, .. })));
    assert_eq!(c.counter_count, 2);

    // lazy counted repeats of a primitive go through counters too
    let c = compiled("a{2,}?");
    assert!(c
        .program
        .terms()
        .any(|t| matches!(t, Term::CounterAtLeast { min: 2, .. })));
    assert!(!c.program.terms().any(|t| matches!(t, Term::CounterBelow { .. })));
}

#[test]
fn test_backref_repeat() {
    assert!(has(r"(a)\1+", |t| matches!(
        t,
        Term::RepeatBackref {
            slot: 1,
            min: 1,
            max: None,
            ..
        }
    )));
    assert!(has(r"(?<w>a)\k<w>", |t| matches!(t, Term::Backref { slot: 1, .. })));
    assert!(has(r"(a){\1}", |t| matches!(t, Term::Backref { slot: 1, .. })));
}

#[test]
fn test_lookbehind_widths() {
    assert!(has("(?<=ab)c", |t| matches!(
        t,
        Term::LookIn {
            behind: Some(2),
            ..
        }
    )));
    assert!(has("(?<!(a|b)c{2})d", |t| matches!(
        t,
        Term::LookIn {
            mode: LookMode::Negative,
            behind: Some(3),
            ..
        }
    )));
    assert!(has("(?=a+)", |t| matches!(t, Term::LookIn { behind: None, .. })));
}

#[test]
fn test_atomic_and_conditionals() {
    let c = compiled("(?>a|ab)c");
    assert_eq!(c.look_count, 1);
    assert!(c.program.terms().any(|t| matches!(t, Term::AtomicIn { .. })));

    assert!(has("(a)?(?(1)b|c)", |t| matches!(
        t,
        Term::SlotCondition { slot: 1, .. }
    )));
    assert!(has("(?(?=a)ab|cd)", |t| matches!(
        t,
        Term::LookIn {
            mode: LookMode::Condition,
            ..
        }
    )));
}

#[test]
fn test_anchors() {
    assert!(has("^a$", |t| matches!(t, Term::Anchor(Anchor::Start))));
    assert!(has("^a$", |t| matches!(t, Term::Anchor(Anchor::EndEol))));
    let c = compile("^a$", Flags::MULTILINE, ClassRegistry::shared()).unwrap();
    assert!(c
        .program
        .terms()
        .any(|t| matches!(t, Term::Anchor(Anchor::LineStart))));
    assert!(has(r"\Ga\z", |t| matches!(t, Term::Anchor(Anchor::LastMatchEnd))));
    assert!(has(r"\bx\B", |t| matches!(t, Term::Boundary { negated: true, .. })));
}

#[test]
fn test_empty_pattern() {
    let c = compiled("");
    assert!(matches!(c.program.term(c.root0), Term::Void));
    let c = compiled("a|");
    assert!(matches!(c.program.term(c.root0), Term::Branch { .. }));
}
