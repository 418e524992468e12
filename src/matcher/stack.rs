//! Search registers, choice points and the undo trail.
//!
//! Every register write made during a search is logged on the trail with
//! the value it replaced. A choice point remembers the trail length when it
//! was pushed; resuming it unwinds the trail back to that mark, so captures
//! and counters from abandoned paths never leak. Both vectors keep their
//! capacity between searches.

use crate::compiler::TermId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct Capture {
    pub span: Option<(usize, usize)>,
    /// Start recorded by the group's enter term, committed by its exit.
    pub pending: Option<usize>,
}

/// Saved state of an active lookaround or independent group.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct LookContext {
    pub index: usize,
    pub depth: usize,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct ChoicePoint {
    pub term: TermId,
    pub index: usize,
    /// Remaining repeat count for backtrack terms.
    pub cnt: usize,
    /// Captured length stepped by backreference repeats.
    pub reg_len: usize,
    trail: usize,
}

#[derive(Clone, Copy, Debug)]
enum Undo {
    Span {
        slot: usize,
        prev: Option<(usize, usize)>,
    },
    Pending {
        slot: usize,
        prev: Option<usize>,
    },
    Counter {
        reg: usize,
        prev: usize,
    },
}

#[derive(Debug, Default)]
pub(super) struct Engine {
    slots: Vec<Capture>,
    counters: Vec<usize>,
    pub looks: Vec<LookContext>,
    stack: Vec<ChoicePoint>,
    trail: Vec<Undo>,
}

impl Engine {
    pub fn new(slots: usize, counters: usize, looks: usize) -> Self {
        Self {
            slots: vec![Capture::default(); slots],
            counters: vec![0; counters],
            looks: vec![LookContext::default(); looks],
            stack: Vec::new(),
            trail: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, term: TermId, index: usize, cnt: usize, reg_len: usize) {
        self.stack.push(ChoicePoint {
            term,
            index,
            cnt,
            reg_len,
            trail: self.trail.len(),
        });
    }

    /// Take the most recent choice point and restore the registers it saw.
    pub fn pop(&mut self) -> Option<ChoicePoint> {
        let cp = self.stack.pop()?;
        self.unwind(cp.trail);
        Some(cp)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drop choice points above `depth`. Their trail entries stay and are
    /// undone by whichever older choice point is resumed.
    #[inline]
    pub fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }

    /// Undo register writes until the trail is `mark` long.
    pub fn unwind(&mut self, mark: usize) {
        while self.trail.len() > mark {
            match self.trail.pop() {
                Some(Undo::Span { slot, prev }) => self.slots[slot].span = prev,
                Some(Undo::Pending { slot, prev }) => self.slots[slot].pending = prev,
                Some(Undo::Counter { reg, prev }) => self.counters[reg] = prev,
                None => break,
            }
        }
    }

    /// Give up the current search: no choice points, registers as before it.
    pub fn abandon(&mut self) {
        self.stack.clear();
        self.unwind(0);
    }

    /// Forget everything, including the last match.
    pub fn flush(&mut self) {
        self.stack.clear();
        self.trail.clear();
        self.slots.fill(Capture::default());
        self.counters.fill(0);
    }

    #[inline]
    pub fn span(&self, slot: usize) -> Option<(usize, usize)> {
        self.slots.get(slot).and_then(|c| c.span)
    }

    #[inline]
    pub fn pending(&self, slot: usize) -> Option<usize> {
        self.slots[slot].pending
    }

    pub fn set_span(&mut self, slot: usize, span: Option<(usize, usize)>) {
        let prev = self.slots[slot].span;
        self.trail.push(Undo::Span { slot, prev });
        self.slots[slot].span = span;
    }

    pub fn set_pending(&mut self, slot: usize, start: Option<usize>) {
        let prev = self.slots[slot].pending;
        self.trail.push(Undo::Pending { slot, prev });
        self.slots[slot].pending = start;
    }

    /// Record the whole-match span. Not logged: it is rewritten by every
    /// successful search and cleared by every failed one.
    pub fn set_match(&mut self, span: Option<(usize, usize)>) {
        if let Some(slot) = self.slots.first_mut() {
            slot.span = span;
        }
    }

    #[inline]
    pub fn counter(&self, reg: usize) -> usize {
        self.counters[reg]
    }

    pub fn set_counter(&mut self, reg: usize, value: usize) {
        let prev = self.counters[reg];
        self.trail.push(Undo::Counter { reg, prev });
        self.counters[reg] = value;
    }

    pub fn spans(&self) -> Vec<Option<(usize, usize)>> {
        self.slots.iter().map(|c| c.span).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_restores_registers() {
        let mut e = Engine::new(2, 1, 0);
        e.set_span(1, Some((0, 1)));
        e.push(TermId::NONE, 5, 0, 0);
        e.set_span(1, Some((2, 3)));
        e.set_counter(0, 7);
        e.set_pending(1, Some(4));

        let cp = e.pop().unwrap();
        assert_eq!(cp.index, 5);
        assert_eq!(e.span(1), Some((0, 1)));
        assert_eq!(e.counter(0), 0);
        assert_eq!(e.pending(1), None);
        assert!(e.pop().is_none());
    }

    #[test]
    fn test_truncate_keeps_trail_for_older_points() {
        let mut e = Engine::new(1, 1, 0);
        e.push(TermId::NONE, 0, 0, 0);
        e.set_counter(0, 1);
        e.push(TermId::NONE, 1, 0, 0);
        e.set_counter(0, 2);
        e.truncate(1);
        assert_eq!(e.depth(), 1);
        e.pop();
        assert_eq!(e.counter(0), 0);
    }

    #[test]
    fn test_abandon_and_flush() {
        let mut e = Engine::new(2, 1, 0);
        e.set_span(1, Some((1, 2)));
        e.push(TermId::NONE, 0, 0, 0);
        e.abandon();
        assert!(e.is_idle());
        assert_eq!(e.span(1), None);

        e.set_match(Some((0, 3)));
        e.set_counter(0, 9);
        e.flush();
        assert_eq!(e.span(0), None);
        assert_eq!(e.counter(0), 0);
    }
}
