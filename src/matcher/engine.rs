//! The backtracking interpreter.
//!
//! `run` walks the term graph from a cursor. A term that passes moves the
//! cursor to its `next`; one that fails resumes the newest choice point.
//! When no choice point is left the attempt at the current start position
//! is exhausted and `search` moves the start one char to the right, unless
//! the search is anchored.

use std::sync::Arc;

use super::stack::{ChoicePoint, LookContext};
use super::{Matcher, Window};
use crate::charclass::eq_ignore_case;
use crate::compiler::{Anchor, LookMode, Term, TermId};
use crate::SearchOptions;

enum Outcome {
    /// Reached `Success` with the match ending at the given index.
    Matched(usize),
    /// No choice point left for this start position.
    Exhausted,
    /// A root `Find` proved no later start position can match.
    Abandoned,
}

#[derive(Clone, Copy, Debug)]
struct Cursor {
    term: TermId,
    index: usize,
    cnt: usize,
    reg_len: usize,
}

impl Cursor {
    fn start(term: TermId, index: usize) -> Self {
        Cursor {
            term,
            index,
            cnt: 0,
            reg_len: 0,
        }
    }
}

impl From<ChoicePoint> for Cursor {
    fn from(cp: ChoicePoint) -> Self {
        Cursor {
            term: cp.term,
            index: cp.index,
            cnt: cp.cnt,
            reg_len: cp.reg_len,
        }
    }
}

/// Whether a single-char term accepts `c`.
#[inline]
fn accepts(term: &Term, c: char) -> bool {
    match term {
        Term::Char(x) => *x == c,
        Term::Class(cls) => cls.matches(c),
        Term::Any { dotall } => *dotall || c != '\n',
        _ => false,
    }
}

/// Compare `len` chars at `a` with `len` chars at `b`.
#[inline]
fn same_text(text: &[char], a: usize, b: usize, len: usize, icase: bool) -> bool {
    let (x, y) = (&text[a..a + len], &text[b..b + len]);
    if icase {
        x.iter().zip(y).all(|(&p, &q)| eq_ignore_case(p, q))
    } else {
        x == y
    }
}

impl<'p> Matcher<'p> {
    /// Look for the next match from the search window.
    ///
    /// A non-empty choice-point stack means the previous match is still
    /// live and the search resumes it for an alternative.
    pub(super) fn search(&mut self, options: SearchOptions) -> bool {
        let pattern = self.pattern;
        let text = Arc::clone(&self.text);
        let Window { offset, end, .. } = self.window;
        let anchored = pattern.start_anchored
            || options.intersects(SearchOptions::ANCHOR_START | SearchOptions::ANCHOR_LASTMATCH);
        let root = if anchored { pattern.root0 } else { pattern.root };
        let mut w_offset = self.window.w_offset;

        tracing::trace!(w_offset, end, ?options, resume = !self.engine.is_idle(), "search");

        let mut cursor = match self.engine.pop() {
            Some(cp) => Cursor::from(cp),
            None => {
                if w_offset > end || (pattern.start_anchored && w_offset != offset) {
                    return self.miss(w_offset);
                }
                self.engine.unwind(0);
                Cursor::start(root, w_offset)
            }
        };

        loop {
            match self.run(cursor, &mut w_offset, &text, options) {
                Outcome::Matched(at) => {
                    self.engine.set_match(Some((w_offset, at)));
                    self.window.w_offset = w_offset;
                    self.window.w_end = Some(at);
                    return true;
                }
                Outcome::Abandoned => break,
                Outcome::Exhausted => {}
            }
            if anchored || w_offset >= end {
                break;
            }
            w_offset += 1;
            self.engine.unwind(0);
            cursor = Cursor::start(root, w_offset);
        }
        self.miss(w_offset)
    }

    fn miss(&mut self, w_offset: usize) -> bool {
        self.engine.abandon();
        self.engine.set_match(None);
        self.window.w_offset = w_offset;
        self.window.w_end = None;
        false
    }

    fn run(
        &mut self,
        mut cur: Cursor,
        w_offset: &mut usize,
        text: &[char],
        options: SearchOptions,
    ) -> Outcome {
        let program = &self.pattern.program;
        let Window { offset, end, .. } = self.window;
        let last_end = self.window.w_end.unwrap_or(offset);
        let engine = &mut self.engine;

        loop {
            let node = program.node(cur.term);
            let i = cur.index;
            let passed = match &node.term {
                Term::Void => true,
                Term::Char(_) | Term::Class(_) | Term::Any { .. } => {
                    if i < end && accepts(&node.term, text[i]) {
                        cur.index = i + 1;
                        true
                    } else {
                        false
                    }
                }
                Term::Anchor(anchor) => match anchor {
                    Anchor::Start => i == offset,
                    Anchor::End => i == end,
                    Anchor::EndEol => i == end || (i + 1 == end && text[i] == '\n'),
                    Anchor::LineStart => i == offset || text[i - 1] == '\n',
                    Anchor::LineEnd => i == end || text[i] == '\n',
                    Anchor::LastMatchEnd => i == last_end,
                },
                Term::Boundary { word, negated } => {
                    let before = i > offset && word.matches(text[i - 1]);
                    let after = i < end && word.matches(text[i]);
                    (before != after) != *negated
                }
                Term::Backref { slot, icase } => match engine.span(*slot) {
                    None => true,
                    Some((s, e)) => {
                        let len = e - s;
                        if i + len <= end && same_text(text, s, i, len, *icase) {
                            cur.index = i + len;
                            true
                        } else {
                            if i + len > end && same_text(text, s, i, end - i, *icase) {
                                // the text ran out partway through the copy
                                cur.index = end;
                            }
                            false
                        }
                    }
                },
                Term::GroupIn { slot } => {
                    engine.set_pending(*slot, Some(i));
                    true
                }
                Term::GroupOut { slot } => {
                    let start = engine.pending(*slot).unwrap_or(i);
                    engine.set_span(*slot, Some((start, i)));
                    true
                }
                Term::Branch { alt } => {
                    engine.push(*alt, i, 0, 0);
                    true
                }
                Term::Repeat {
                    atom,
                    min,
                    max,
                    back,
                } => {
                    let atom = program.term(*atom);
                    let room = end - i;
                    let limit = max.map_or(room, |m| room.min(m as usize));
                    let n = text[i..i + limit]
                        .iter()
                        .take_while(|&&c| accepts(atom, c))
                        .count();
                    cur.index = i + n;
                    let min = *min as usize;
                    if n > min {
                        engine.push(*back, i + n, n, 0);
                    }
                    n >= min
                }
                Term::RepeatBackref {
                    slot,
                    icase,
                    min,
                    max,
                    back,
                } => match engine.span(*slot) {
                    Some((s, e)) if e > s => {
                        let len = e - s;
                        let (mut n, mut p) = (0usize, i);
                        while max.map_or(true, |m| n < m as usize)
                            && p + len <= end
                            && same_text(text, s, p, len, *icase)
                        {
                            n += 1;
                            p += len;
                        }
                        let min = *min as usize;
                        if n < min {
                            false
                        } else {
                            cur.index = p;
                            if n > min {
                                engine.push(*back, p, n, len);
                            }
                            true
                        }
                    }
                    // nothing to repeat: every count matches the empty string
                    _ => true,
                },
                Term::Backtrack { min } => {
                    cur.cnt -= 1;
                    cur.index = i - 1;
                    if cur.cnt > *min as usize {
                        engine.push(cur.term, cur.index, cur.cnt, 0);
                    }
                    true
                }
                Term::BacktrackBackref { min } => {
                    cur.cnt -= 1;
                    cur.index = i - cur.reg_len;
                    if cur.cnt > *min as usize {
                        engine.push(cur.term, cur.index, cur.cnt, cur.reg_len);
                    }
                    true
                }
                Term::BacktrackFind {
                    min,
                    target,
                    distance,
                    eat,
                } => {
                    let target = program.term(*target);
                    let lowest = i - (cur.cnt - *min as usize);
                    let found = (lowest..i)
                        .rev()
                        .find(|&p| p + distance < end && accepts(target, text[p + distance]));
                    match found {
                        Some(p) => {
                            cur.cnt -= i - p;
                            cur.index = p;
                            if cur.cnt > *min as usize {
                                engine.push(cur.term, p, cur.cnt, 0);
                            }
                            if *eat {
                                cur.index += 1;
                            }
                            true
                        }
                        None => false,
                    }
                }
                Term::BacktrackFindBackref {
                    min,
                    slot,
                    icase,
                    distance,
                    eat,
                } => {
                    let lowest = i - (cur.cnt - *min as usize);
                    let found = match engine.span(*slot) {
                        Some((s, e)) if e > s => {
                            let len = e - s;
                            (lowest..i)
                                .rev()
                                .find(|&p| {
                                    p + distance + len <= end
                                        && same_text(text, s, p + distance, len, *icase)
                                })
                                .map(|p| (p, len))
                        }
                        _ => Some((i - 1, 0)),
                    };
                    match found {
                        Some((p, len)) => {
                            cur.cnt -= i - p;
                            cur.index = p;
                            if cur.cnt > *min as usize {
                                engine.push(cur.term, p, cur.cnt, 0);
                            }
                            if *eat {
                                cur.index += len;
                            }
                            true
                        }
                        None => false,
                    }
                }
                Term::Find {
                    target,
                    distance,
                    eat,
                } => {
                    let target = program.term(*target);
                    match (i + distance..end).find(|&p| accepts(target, text[p])) {
                        Some(p) => {
                            let start = p - distance;
                            *w_offset = start;
                            cur.index = if *eat { start + 1 } else { start };
                            true
                        }
                        None => return Outcome::Abandoned,
                    }
                }
                Term::FindBackref {
                    slot,
                    icase,
                    distance,
                    eat,
                } => {
                    let found = match engine.span(*slot) {
                        Some((s, e)) if e > s => {
                            let len = e - s;
                            (i + distance..end)
                                .find(|&p| p + len <= end && same_text(text, s, p, len, *icase))
                                .map(|p| (p, len))
                        }
                        _ => Some((i + distance, 0)),
                    };
                    match found {
                        Some((p, len)) => {
                            let start = p - distance;
                            *w_offset = start;
                            cur.index = if *eat { start + len } else { start };
                            true
                        }
                        None => return Outcome::Abandoned,
                    }
                }
                Term::LookIn {
                    slot,
                    mode,
                    behind,
                    alt,
                } => {
                    let start = match behind {
                        None => Some(i),
                        Some(width) => i.checked_sub(*width).filter(|&s| s >= offset),
                    };
                    match (start, mode) {
                        (None, LookMode::Positive) => false,
                        (None, _) => {
                            cur.term = *alt;
                            continue;
                        }
                        (Some(s), mode) => {
                            engine.looks[*slot] = LookContext {
                                index: i,
                                depth: engine.depth(),
                            };
                            if *mode != LookMode::Positive {
                                engine.push(*alt, i, 0, 0);
                            }
                            cur.index = s;
                            true
                        }
                    }
                }
                Term::LookOut { slot, mode } => {
                    let saved = engine.looks[*slot];
                    engine.truncate(saved.depth);
                    cur.index = saved.index;
                    *mode != LookMode::Negative
                }
                Term::AtomicIn { slot } => {
                    engine.looks[*slot] = LookContext {
                        index: i,
                        depth: engine.depth(),
                    };
                    true
                }
                Term::AtomicOut { slot } => {
                    engine.truncate(engine.looks[*slot].depth);
                    true
                }
                Term::SlotCondition { slot, alt } => {
                    if engine.span(*slot).is_none() {
                        cur.term = *alt;
                        continue;
                    }
                    true
                }
                Term::CounterReset { reg } => {
                    engine.set_counter(*reg, 0);
                    true
                }
                Term::CounterInc { reg } => {
                    engine.set_counter(*reg, engine.counter(*reg) + 1);
                    true
                }
                Term::CounterBelow { reg, max } => engine.counter(*reg) < *max as usize,
                Term::CounterAtLeast { reg, min } => engine.counter(*reg) >= *min as usize,
                Term::LoopMark { reg } => {
                    engine.set_counter(*reg, i);
                    true
                }
                Term::LoopGuard {
                    mark,
                    counter,
                    exit,
                } => {
                    let stalled = engine.counter(*mark) == i
                        && counter.map_or(true, |(reg, min)| engine.counter(reg) >= min as usize);
                    if stalled {
                        cur.term = *exit;
                        continue;
                    }
                    true
                }
                Term::Success => {
                    if options.contains(SearchOptions::ANCHOR_END) && i != end {
                        false
                    } else {
                        return Outcome::Matched(i);
                    }
                }
            };

            if passed {
                cur.term = node.next;
                continue;
            }
            if options.contains(SearchOptions::ACCEPT_INCOMPLETE) && cur.index >= end {
                return Outcome::Matched(cur.index);
            }
            match engine.pop() {
                Some(cp) => cur = Cursor::from(cp),
                None => return Outcome::Exhausted,
            }
        }
    }
}
