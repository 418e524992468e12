//! Skip shortcuts over a compiled term graph.
//!
//! The optimizer looks for the first term every match must pass through
//! that consumes a recognisable char: a literal, a narrow class or a
//! backreference. When one sits a fixed `distance` from the match start,
//! the search root becomes a `Find` that jumps straight to candidates
//! instead of retrying at every offset. The same walk from the continuation
//! of each primitive repeat turns its `Backtrack` into a `BacktrackFind`
//! that gives back chars until the continuation can match.

use crate::compiler::{Anchor, Program, Term, TermId};

/// Classes accepting more code points than this are not worth scanning for.
pub(crate) const FIND_THRESHOLD: u32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lead {
    /// `target` must match `distance` chars after the walk's start.
    Atom { target: TermId, distance: usize },
    /// The walk hit a start-of-text anchor.
    StartAnchor,
    Nothing,
}

/// Result of optimizing a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Shortcuts {
    /// The term to start unanchored searches at.
    pub root: TermId,
    /// The pattern can only match at the start of the target.
    pub start_anchored: bool,
}

fn find_lead(program: &Program, from: TermId) -> Lead {
    let mut id = from;
    let mut distance = 0;
    // slots the walk re-enters or re-commits; their span at scan time is stale
    let mut touched: Vec<usize> = Vec::new();
    // a cycle of transparent terms cannot be longer than the program
    for _ in 0..program.len() {
        if id.is_none() {
            return Lead::Nothing;
        }
        match program.term(id) {
            Term::Backref { slot, .. } if touched.contains(slot) => return Lead::Nothing,
            Term::Char(_) | Term::Backref { .. } => return Lead::Atom { target: id, distance },
            Term::Class(cls) if cls.weight() <= FIND_THRESHOLD => {
                return Lead::Atom { target: id, distance }
            }
            Term::Class(_) | Term::Any { .. } => distance += 1,
            Term::Anchor(Anchor::Start) => return Lead::StartAnchor,
            Term::GroupIn { slot } | Term::GroupOut { slot } => touched.push(*slot),
            Term::Anchor(_)
            | Term::Boundary { .. }
            | Term::Void
            | Term::CounterReset { .. }
            | Term::CounterInc { .. }
            | Term::LoopMark { .. } => {}
            _ => return Lead::Nothing,
        }
        id = program.next(id);
    }
    Lead::Nothing
}

pub(crate) fn optimize(program: &mut Program, root0: TermId, repeats: &[TermId]) -> Shortcuts {
    let mut shortcuts = Shortcuts {
        root: root0,
        start_anchored: false,
    };

    match find_lead(program, root0) {
        Lead::Atom { target, distance } => {
            let eat = target == root0 && distance == 0;
            let find = match *program.term(target) {
                Term::Backref { slot, icase } => Term::FindBackref {
                    slot,
                    icase,
                    distance,
                    eat,
                },
                _ => Term::Find {
                    target,
                    distance,
                    eat,
                },
            };
            let next = if eat { program.next(target) } else { root0 };
            let root = program.push(find);
            program.set_next(root, next);
            tracing::debug!(%target, distance, eat, "installed find shortcut at the root");
            shortcuts.root = root;
        }
        Lead::StartAnchor => {
            tracing::debug!("pattern is anchored at the start");
            shortcuts.start_anchored = true;
        }
        Lead::Nothing => {}
    }

    for &repeat in repeats {
        let (min, back) = match *program.term(repeat) {
            Term::Repeat { min, back, .. } => (min, back),
            _ => continue,
        };
        let continuation = program.next(repeat);
        let (target, distance) = match find_lead(program, continuation) {
            Lead::Atom { target, distance } => (target, distance),
            _ => continue,
        };
        let eat = target == continuation && distance == 0;
        let term = match *program.term(target) {
            Term::Backref { slot, icase } => Term::BacktrackFindBackref {
                min,
                slot,
                icase,
                distance,
                eat,
            },
            _ => Term::BacktrackFind {
                min,
                target,
                distance,
                eat,
            },
        };
        let next = if eat {
            program.next(target)
        } else {
            program.next(back)
        };
        let node = program.node_mut(back);
        node.term = term;
        node.next = next;
        tracing::debug!(%repeat, %target, distance, eat, "installed backtrack shortcut");
    }

    shortcuts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charclass::ClassRegistry;
    use crate::compiler::compile;
    use crate::Flags;

    fn optimized(src: &str) -> (Program, TermId, Shortcuts) {
        let mut compiled = compile(src, Flags::empty(), ClassRegistry::shared()).unwrap();
        let shortcuts = optimize(&mut compiled.program, compiled.root0, &compiled.repeats);
        (compiled.program, compiled.root0, shortcuts)
    }

    #[test]
    fn test_literal_lead_is_eaten() {
        let (program, root0, s) = optimized("abc");
        assert_ne!(s.root, root0);
        match program.term(s.root) {
            Term::Find {
                target,
                distance,
                eat,
            } => {
                assert_eq!(*target, root0);
                assert_eq!(*distance, 0);
                assert!(*eat);
            }
            other => panic!("expected find, got {:?}", other),
        }
        assert_eq!(program.next(s.root), program.next(root0));
    }

    #[test]
    fn test_lead_through_groups_and_wildcards() {
        let (program, root0, s) = optimized("(..x)");
        match program.term(s.root) {
            Term::Find { distance, eat, .. } => {
                assert_eq!(*distance, 2);
                assert!(!eat);
            }
            other => panic!("expected find, got {:?}", other),
        }
        assert_eq!(program.next(s.root), root0);
    }

    #[test]
    fn test_wide_class_is_not_a_lead() {
        let (_, root0, s) = optimized(r"\w+");
        assert_eq!(s.root, root0);
        assert!(!s.start_anchored);
    }

    #[test]
    fn test_narrow_class_is_a_lead() {
        let (program, _, s) = optimized("[abc]z");
        assert!(matches!(program.term(s.root), Term::Find { .. }));
    }

    #[test]
    fn test_start_anchor() {
        let (_, root0, s) = optimized("^abc");
        assert_eq!(s.root, root0);
        assert!(s.start_anchored);

        let (_, _, s) = optimized("(?m)^abc");
        assert!(!s.start_anchored);
    }

    #[test]
    fn test_alternation_has_no_lead() {
        let (_, root0, s) = optimized("a|b");
        assert_eq!(s.root, root0);
    }

    #[test]
    fn test_repeat_backtrack_becomes_find() {
        let (program, _, _) = optimized(".*foo");
        assert!(program
            .terms()
            .any(|t| matches!(t, Term::BacktrackFind { eat: true, .. })));

        let (program, _, _) = optimized(".*(?:a|b)");
        assert!(!program
            .terms()
            .any(|t| matches!(t, Term::BacktrackFind { .. })));

        let (program, _, _) = optimized(r"(a)x*\1");
        assert!(program
            .terms()
            .any(|t| matches!(t, Term::BacktrackFindBackref { slot: 1, .. })));
    }

    #[test]
    fn test_backref_behind_its_own_group_is_not_a_lead() {
        let (program, _, _) = optimized(r"(?:(a*)\1,)*");
        assert!(!program
            .terms()
            .any(|t| matches!(t, Term::BacktrackFindBackref { .. })));

        let (_, root0, s) = optimized(r"()\1x");
        assert_eq!(s.root, root0);

        // a backref to another group still leads
        let (program, _, _) = optimized(r"(a)(x*)\1");
        assert!(program
            .terms()
            .any(|t| matches!(t, Term::BacktrackFindBackref { slot: 1, .. })));
    }
}
