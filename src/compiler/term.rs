//! The term graph.
//!
//! Terms live in a `Program` arena and refer to each other by `TermId`, so
//! loops are plain back-edges between indices. Every node has a `next`
//! successor; the kinds that can branch carry their second edge inline
//! (`Branch::alt`, `LookIn::alt`, `SlotCondition::alt`, `LoopGuard::exit`).
//!
//! While a fragment is being built its dangling edges are recorded as
//! `Hole`s and patched once the continuation is known.

use std::fmt::{self, Write};

use crate::charclass::CharClass;

/// A term identifier, an index into the program arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct TermId(u32);

impl TermId {
    /// "No term": an edge that was never patched.
    pub const NONE: TermId = TermId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "-")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Zero-width position tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Anchor {
    /// `\A`, or `^` without `m`.
    Start,
    /// `\z`
    End,
    /// `\Z`, or `$` without `m`: end of text or before a final newline.
    EndEol,
    /// `^` under `m`
    LineStart,
    /// `$` under `m`
    LineEnd,
    /// `\G`
    LastMatchEnd,
}

/// How a lookaround enter/exit pair treats the body's outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LookMode {
    /// Body must match; continue after the exit.
    Positive,
    /// Body must not match; continue at the enter term's `alt`.
    Negative,
    /// Dispatch: exit's `next` when the body matches, enter's `alt` when not.
    Condition,
}

#[derive(Clone, Debug)]
pub(crate) enum Term {
    /// Matches the empty string.
    Void,
    Char(char),
    Class(Box<CharClass>),
    Any {
        dotall: bool,
    },
    Anchor(Anchor),
    Boundary {
        word: Box<CharClass>,
        negated: bool,
    },
    Backref {
        slot: usize,
        icase: bool,
    },
    GroupIn {
        slot: usize,
    },
    GroupOut {
        slot: usize,
    },
    /// Try `next`, and on failure `alt`.
    Branch {
        alt: TermId,
    },
    /// Consume a run of `atom` (a `Char`, `Class` or `Any` node).
    Repeat {
        atom: TermId,
        min: u32,
        max: Option<u32>,
        back: TermId,
    },
    /// Consume a run of copies of a captured group.
    RepeatBackref {
        slot: usize,
        icase: bool,
        min: u32,
        max: Option<u32>,
        back: TermId,
    },
    /// Give back one char of a `Repeat` run.
    Backtrack {
        min: u32,
    },
    /// Give back one copy of a `RepeatBackref` run.
    BacktrackBackref {
        min: u32,
    },
    /// Give back chars of a `Repeat` run until `target` matches `distance`
    /// chars further on.
    BacktrackFind {
        min: u32,
        target: TermId,
        distance: usize,
        eat: bool,
    },
    BacktrackFindBackref {
        min: u32,
        slot: usize,
        icase: bool,
        distance: usize,
        eat: bool,
    },
    /// Jump the search start to the next place where `target` occurs
    /// `distance` chars after it.
    Find {
        target: TermId,
        distance: usize,
        eat: bool,
    },
    FindBackref {
        slot: usize,
        icase: bool,
        distance: usize,
        eat: bool,
    },
    LookIn {
        slot: usize,
        mode: LookMode,
        /// Fixed width of a lookbehind body.
        behind: Option<usize>,
        alt: TermId,
    },
    LookOut {
        slot: usize,
        mode: LookMode,
    },
    AtomicIn {
        slot: usize,
    },
    AtomicOut {
        slot: usize,
    },
    /// `next` if the capture slot is set, `alt` otherwise.
    SlotCondition {
        slot: usize,
        alt: TermId,
    },
    CounterReset {
        reg: usize,
    },
    CounterInc {
        reg: usize,
    },
    CounterBelow {
        reg: usize,
        max: u32,
    },
    CounterAtLeast {
        reg: usize,
        min: u32,
    },
    /// Record the position at the start of a loop iteration.
    LoopMark {
        reg: usize,
    },
    /// Leave the loop through `exit` when an iteration consumed nothing
    /// (and the optional counter has reached its minimum).
    LoopGuard {
        mark: usize,
        counter: Option<(usize, u32)>,
        exit: TermId,
    },
    Success,
}

#[derive(Clone, Debug)]
pub(crate) struct TermNode {
    pub term: Term,
    pub next: TermId,
}

/// Which edge of a node a hole refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Edge {
    Next,
    Alt,
}

/// A dangling edge waiting for its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Hole {
    pub id: TermId,
    pub edge: Edge,
}

impl Hole {
    pub fn next(id: TermId) -> Hole {
        Hole {
            id,
            edge: Edge::Next,
        }
    }

    pub fn alt(id: TermId) -> Hole {
        Hole { id, edge: Edge::Alt }
    }
}

/// A partially built piece of graph: where to enter, which edges to patch.
#[derive(Clone, Debug)]
pub(crate) struct Frag {
    pub entry: TermId,
    pub holes: Vec<Hole>,
}

impl Frag {
    /// A single node whose `next` is still open.
    pub fn single(id: TermId) -> Frag {
        Frag {
            entry: id,
            holes: vec![Hole::next(id)],
        }
    }
}

/// The term arena.
#[derive(Clone, Default)]
pub(crate) struct Program {
    nodes: Vec<TermNode>,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("terms", &self.nodes.len())
            .finish()
    }
}

impl Program {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Append a term with an open `next` edge.
    pub fn push(&mut self, term: Term) -> TermId {
        let id = TermId(self.nodes.len() as u32);
        self.nodes.push(TermNode {
            term,
            next: TermId::NONE,
        });
        id
    }

    #[inline]
    pub fn node(&self, id: TermId) -> &TermNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: TermId) -> &mut TermNode {
        &mut self.nodes[id.index()]
    }

    #[inline]
    pub fn term(&self, id: TermId) -> &Term {
        &self.nodes[id.index()].term
    }

    #[inline]
    pub fn next(&self, id: TermId) -> TermId {
        self.nodes[id.index()].next
    }

    pub fn set_next(&mut self, id: TermId, target: TermId) {
        self.nodes[id.index()].next = target;
    }

    /// Point the second edge of a branching node at `target`.
    pub fn set_alt(&mut self, id: TermId, target: TermId) {
        match &mut self.nodes[id.index()].term {
            Term::Branch { alt } | Term::LookIn { alt, .. } | Term::SlotCondition { alt, .. } => {
                *alt = target
            }
            Term::LoopGuard { exit, .. } => *exit = target,
            other => debug_assert!(false, "no alternate edge on {:?}", other),
        }
    }

    pub fn patch(&mut self, holes: &[Hole], target: TermId) {
        for hole in holes {
            match hole.edge {
                Edge::Next => self.set_next(hole.id, target),
                Edge::Alt => self.set_alt(hole.id, target),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub fn terms(&self) -> impl Iterator<Item = &Term> + '_ {
        self.nodes.iter().map(|node| &node.term)
    }

    /// One line per term, for debugging.
    pub fn dump(&self, roots: &[(&str, TermId)]) -> String {
        let mut out = String::new();
        for (label, id) in roots {
            let _ = writeln!(out, "{}: {}", label, id);
        }
        for (n, node) in self.nodes.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>5} {:<48} -> {}",
                TermId(n as u32).to_string(),
                describe(&node.term),
                node.next
            );
        }
        out
    }
}

fn describe(term: &Term) -> String {
    match term {
        Term::Void => "void".into(),
        Term::Char(c) => format!("char {:?}", c),
        Term::Class(cls) => format!("class {:?}", cls),
        Term::Any { dotall } => format!("any dotall={}", dotall),
        Term::Anchor(a) => format!("anchor {:?}", a),
        Term::Boundary { negated, .. } => format!("boundary negated={}", negated),
        Term::Backref { slot, icase } => format!("backref {} icase={}", slot, icase),
        Term::GroupIn { slot } => format!("group-in {}", slot),
        Term::GroupOut { slot } => format!("group-out {}", slot),
        Term::Branch { alt } => format!("branch alt={}", alt),
        Term::Repeat {
            atom,
            min,
            max,
            back,
        } => format!("repeat {} {{{},{:?}}} back={}", atom, min, max, back),
        Term::RepeatBackref {
            slot,
            min,
            max,
            back,
            ..
        } => format!("repeat-backref {} {{{},{:?}}} back={}", slot, min, max, back),
        Term::Backtrack { min } => format!("backtrack min={}", min),
        Term::BacktrackBackref { min } => format!("backtrack-backref min={}", min),
        Term::BacktrackFind {
            min,
            target,
            distance,
            eat,
        } => format!(
            "backtrack-find min={} target={} distance={} eat={}",
            min, target, distance, eat
        ),
        Term::BacktrackFindBackref {
            min,
            slot,
            distance,
            eat,
            ..
        } => format!(
            "backtrack-find-backref min={} slot={} distance={} eat={}",
            min, slot, distance, eat
        ),
        Term::Find {
            target,
            distance,
            eat,
        } => format!("find target={} distance={} eat={}", target, distance, eat),
        Term::FindBackref {
            slot,
            distance,
            eat,
            ..
        } => format!("find-backref slot={} distance={} eat={}", slot, distance, eat),
        Term::LookIn {
            slot,
            mode,
            behind,
            alt,
        } => format!("look-in {} {:?} behind={:?} alt={}", slot, mode, behind, alt),
        Term::LookOut { slot, mode } => format!("look-out {} {:?}", slot, mode),
        Term::AtomicIn { slot } => format!("atomic-in {}", slot),
        Term::AtomicOut { slot } => format!("atomic-out {}", slot),
        Term::SlotCondition { slot, alt } => format!("if-group {} else={}", slot, alt),
        Term::CounterReset { reg } => format!("counter-reset {}", reg),
        Term::CounterInc { reg } => format!("counter-inc {}", reg),
        Term::CounterBelow { reg, max } => format!("counter {} < {}", reg, max),
        Term::CounterAtLeast { reg, min } => format!("counter {} >= {}", reg, min),
        Term::LoopMark { reg } => format!("loop-mark {}", reg),
        Term::LoopGuard {
            mark,
            counter,
            exit,
        } => format!("loop-guard {} counter={:?} exit={}", mark, counter, exit),
        Term::Success => "success".into(),
    }
}
