//! Literal runs: chars, escapes, classes, anchors and quantifiers.

use crate::charclass::{
    code_point_escape, has_case, named_class, parse_class, parse_name, Bitset, CharSet,
};
use crate::{Flags, SyntaxError};

use super::{Anchor, Compiler, Frag, Hole, Piece, PieceKind, Term, TermId};

/// A parsed quantifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Quantifier {
    min: u32,
    max: Option<u32>,
    lazy: bool,
}

impl<'a> Compiler<'a> {
    /// Compile `data[start..end]`, which holds no group structure.
    pub(super) fn literal_run(
        &mut self,
        start: usize,
        end: usize,
        flags: Flags,
        pieces: &mut Vec<Piece>,
    ) -> Result<(), SyntaxError> {
        let spaces = flags.contains(Flags::IGNORE_SPACES);
        let mut pos = start;
        while pos < end {
            let c = self.data[pos];
            if spaces && c.is_whitespace() {
                pos += 1;
                continue;
            }
            let quantifier = match c {
                '*' | '+' | '?' => Some(self.simple_quantifier(pos, end)),
                '{' => self.braced_quantifier(pos, end)?,
                _ => None,
            };
            if let Some((quantifier, next)) = quantifier {
                let piece = match pieces.pop() {
                    Some(piece) => piece,
                    None => {
                        return Err(SyntaxError::new(
                            format!("missing term before {}", c),
                            pos,
                        ))
                    }
                };
                if piece.kind == PieceKind::Quantified {
                    return Err(SyntaxError::new("stacked quantifiers", pos));
                }
                pieces.push(self.quantify(piece, quantifier));
                pos = next;
                continue;
            }

            let (piece, next) = match c {
                '\\' => self.escape(pos, end, flags)?,
                '[' => {
                    let (set, next) = parse_class(self.data, pos + 1, end, flags, self.registry)?;
                    (self.class_piece(set), next)
                }
                '{' => self.braced_atom(pos, end, flags)?,
                '.' => {
                    let any = self.program.push(Term::Any {
                        dotall: flags.contains(Flags::DOTALL),
                    });
                    (primitive(any), pos + 1)
                }
                '^' => {
                    let anchor = if flags.contains(Flags::MULTILINE) {
                        Anchor::LineStart
                    } else {
                        Anchor::Start
                    };
                    (self.anchor_piece(anchor), pos + 1)
                }
                '$' => {
                    let anchor = if flags.contains(Flags::MULTILINE) {
                        Anchor::LineEnd
                    } else {
                        Anchor::EndEol
                    };
                    (self.anchor_piece(anchor), pos + 1)
                }
                c => (self.char_piece(c, flags), pos + 1),
            };
            pieces.push(piece);
            pos = next;
        }
        Ok(())
    }

    fn simple_quantifier(&self, pos: usize, end: usize) -> (Quantifier, usize) {
        let (min, max) = match self.data[pos] {
            '*' => (0, None),
            '+' => (1, None),
            _ => (0, Some(1)),
        };
        self.lazy_suffix(min, max, pos + 1, end)
    }

    fn lazy_suffix(&self, min: u32, max: Option<u32>, pos: usize, end: usize) -> (Quantifier, usize) {
        let lazy = pos < end && self.data[pos] == '?';
        let next = if lazy { pos + 1 } else { pos };
        (Quantifier { min, max, lazy }, next)
    }

    /// `{n}`, `{n,}`, `{,n}`, `{n,m}`. `None` when the braces hold no
    /// digits and no comma, i.e. a class name or named backreference.
    fn braced_quantifier(
        &self,
        pos: usize,
        end: usize,
    ) -> Result<Option<(Quantifier, usize)>, SyntaxError> {
        let mut i = pos + 1;
        let skip = |i: &mut usize| {
            while *i < end && self.data[*i] == ' ' {
                *i += 1;
            }
        };
        let number = |i: &mut usize| -> Result<Option<u32>, SyntaxError> {
            let start = *i;
            let mut value: u32 = 0;
            while *i < end {
                match self.data[*i].to_digit(10) {
                    Some(d) => {
                        value = value
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(d))
                            .ok_or_else(|| SyntaxError::new("quantifier too large", start))?;
                        *i += 1;
                    }
                    None => break,
                }
            }
            Ok((*i > start).then_some(value))
        };

        skip(&mut i);
        let min = number(&mut i)?;
        skip(&mut i);
        let comma = i < end && self.data[i] == ',';
        if min.is_none() && !comma {
            return Ok(None);
        }
        let max = if comma {
            i += 1;
            skip(&mut i);
            let max = number(&mut i)?;
            skip(&mut i);
            max
        } else {
            min
        };
        if i >= end || self.data[i] != '}' {
            return Err(SyntaxError::new("malformed quantifier", pos));
        }
        let min = min.unwrap_or(0);
        if matches!(max, Some(max) if max < min) {
            return Err(SyntaxError::new("wrong quantifier bounds", pos));
        }
        Ok(Some(self.lazy_suffix(min, max, i + 1, end)))
    }

    /// `{Name}` class or `{\name}` backreference.
    fn braced_atom(&mut self, pos: usize, end: usize, flags: Flags) -> Result<(Piece, usize), SyntaxError> {
        if pos + 1 < end && self.data[pos + 1] == '\\' {
            let start = pos + 2;
            let close = (start..end)
                .find(|&i| self.data[i] == '}')
                .ok_or_else(|| SyntaxError::new("unterminated group name", pos))?;
            let name: String = self.data[start..close].iter().collect();
            let slot = self.group_reference(name.trim(), pos)?;
            return Ok((self.backref_piece(slot, flags), close + 1));
        }
        let (name, next) = parse_name(self.data, pos, end, flags.contains(Flags::IGNORE_SPACES))?;
        let set = named_class(self.registry, &name, pos)?;
        Ok((self.class_piece(set), next))
    }

    /// An escape with `pos` on the backslash.
    fn escape(&mut self, pos: usize, end: usize, flags: Flags) -> Result<(Piece, usize), SyntaxError> {
        let at = pos + 1;
        if at >= end {
            return Err(SyntaxError::new("malformed escape", pos));
        }
        let letter = self.data[at];
        let unicode = flags.contains(Flags::UNICODE);
        let piece = match letter {
            'd' | 'D' | 's' | 'S' | 'w' | 'W' => match self.registry.predefined(letter, unicode) {
                Some(set) => self.class_piece(set),
                None => return Err(SyntaxError::new("malformed escape", pos)),
            },
            'p' | 'P' => {
                let (name, next) =
                    parse_name(self.data, at + 1, end, flags.contains(Flags::IGNORE_SPACES))?;
                let set = named_class(self.registry, &name, at)?;
                let set = if letter == 'P' { set.negated() } else { set };
                return Ok((self.class_piece(set), next));
            }
            'b' | 'B' => {
                let word = self.registry.word(unicode).clone().into_class();
                let id = self.program.push(Term::Boundary {
                    word: Box::new(word),
                    negated: letter == 'B',
                });
                zero_width(id)
            }
            'A' => self.anchor_piece(Anchor::Start),
            'Z' => self.anchor_piece(Anchor::EndEol),
            'G' => self.anchor_piece(Anchor::LastMatchEnd),
            'z' => {
                let mut next = at + 1;
                while next < end
                    && flags.contains(Flags::IGNORE_SPACES)
                    && self.data[next].is_whitespace()
                {
                    next += 1;
                }
                if next < end {
                    return Err(SyntaxError::new("misplaced end anchor", pos));
                }
                self.anchor_piece(Anchor::End)
            }
            'k' if at + 1 < end && self.data[at + 1] == '<' => {
                let start = at + 2;
                let close = (start..end)
                    .find(|&i| self.data[i] == '>')
                    .ok_or_else(|| SyntaxError::new("unterminated group name", pos))?;
                let name: String = self.data[start..close].iter().collect();
                let slot = self.group_reference(&name, pos)?;
                return Ok((self.backref_piece(slot, flags), close + 1));
            }
            '1'..='9' => {
                let mut next = at;
                let mut id: usize = 0;
                while next < end {
                    match self.data[next].to_digit(10) {
                        Some(d) => {
                            id = id.saturating_mul(10).saturating_add(d as usize);
                            next += 1;
                        }
                        None => break,
                    }
                }
                self.references.push((id, pos));
                return Ok((self.backref_piece(id, flags), next));
            }
            _ => match code_point_escape(self.data, at, end)? {
                Some((c, next)) => return Ok((self.char_piece(c, flags), next)),
                None => self.char_piece(letter, flags),
            },
        };
        Ok((piece, at + 1))
    }

    fn anchor_piece(&mut self, anchor: Anchor) -> Piece {
        let id = self.program.push(Term::Anchor(anchor));
        zero_width(id)
    }

    fn backref_piece(&mut self, slot: usize, flags: Flags) -> Piece {
        let id = self.program.push(Term::Backref {
            slot,
            icase: flags.contains(Flags::IGNORE_CASE),
        });
        Piece {
            frag: Frag::single(id),
            kind: PieceKind::Backref(id),
            width: None,
        }
    }

    /// A literal char; under `i` a char with case becomes a small class.
    fn char_piece(&mut self, c: char, flags: Flags) -> Piece {
        if flags.contains(Flags::IGNORE_CASE) && has_case(c) {
            let mut set = CharSet::new();
            set.insert_folded(c);
            return self.class_piece(Bitset::from_set(set));
        }
        let id = self.program.push(Term::Char(c));
        primitive(id)
    }

    /// A class atom; single-member classes become `Char`.
    pub(super) fn class_piece(&mut self, set: Bitset) -> Piece {
        let term = match set.single() {
            Some(c) => Term::Char(c),
            None => Term::Class(Box::new(set.into_class())),
        };
        let id = self.program.push(term);
        primitive(id)
    }

    fn quantify(&mut self, piece: Piece, q: Quantifier) -> Piece {
        let width = match (piece.width, q.max) {
            (_, Some(0)) => Some(0),
            (Some(w), Some(max)) if max == q.min => Some(w * max as usize),
            _ => None,
        };
        let optional = q.min == 0 && q.max == Some(1);
        let frag = match piece.kind {
            PieceKind::Primitive(id) if !q.lazy && optional => {
                let branch = self.program.push(Term::Branch { alt: TermId::NONE });
                self.program.set_next(branch, id);
                Frag {
                    entry: branch,
                    holes: vec![Hole::next(id), Hole::alt(branch)],
                }
            }
            PieceKind::Primitive(id) if !q.lazy => {
                let back = self.program.push(Term::Backtrack { min: q.min });
                let repeat = self.program.push(Term::Repeat {
                    atom: id,
                    min: q.min,
                    max: q.max,
                    back,
                });
                self.repeats.push(repeat);
                Frag {
                    entry: repeat,
                    holes: vec![Hole::next(repeat), Hole::next(back)],
                }
            }
            PieceKind::Primitive(id) if q.max.is_none() && q.min <= 1 => {
                // lazy `*?` / `+?`: leave first, come back for one more
                let branch = self.program.push(Term::Branch { alt: id });
                self.program.set_next(id, branch);
                Frag {
                    entry: if q.min == 0 { branch } else { id },
                    holes: vec![Hole::next(branch)],
                }
            }
            PieceKind::Primitive(id) if optional => {
                let branch = self.program.push(Term::Branch { alt: id });
                Frag {
                    entry: branch,
                    holes: vec![Hole::next(branch), Hole::next(id)],
                }
            }
            PieceKind::Backref(id) if !q.lazy && !optional => {
                let (slot, icase) = match self.program.term(id) {
                    Term::Backref { slot, icase } => (*slot, *icase),
                    _ => (0, false),
                };
                let back = self.program.push(Term::BacktrackBackref { min: q.min });
                self.program.node_mut(id).term = Term::RepeatBackref {
                    slot,
                    icase,
                    min: q.min,
                    max: q.max,
                    back,
                };
                Frag {
                    entry: id,
                    holes: vec![Hole::next(id), Hole::next(back)],
                }
            }
            _ => self.compound_loop(piece.frag, q),
        };
        Piece {
            frag,
            kind: PieceKind::Quantified,
            width,
        }
    }

    /// A quantifier over anything that is not a single primitive: the body
    /// is re-entered through a `Branch`, with a progress mark so an
    /// iteration that consumed nothing leaves the loop.
    fn compound_loop(&mut self, body: Frag, q: Quantifier) -> Frag {
        match (q.min, q.max) {
            (0, Some(1)) => {
                let branch = self.program.push(Term::Branch { alt: TermId::NONE });
                let mut holes = body.holes;
                if q.lazy {
                    self.program.set_alt(branch, body.entry);
                    holes.push(Hole::next(branch));
                } else {
                    self.program.set_next(branch, body.entry);
                    holes.push(Hole::alt(branch));
                }
                Frag {
                    entry: branch,
                    holes,
                }
            }
            (min, None) if min <= 1 => {
                let mark_reg = self.new_counter();
                let branch = self.program.push(Term::Branch { alt: TermId::NONE });
                let mark = self.program.push(Term::LoopMark { reg: mark_reg });
                let guard = self.program.push(Term::LoopGuard {
                    mark: mark_reg,
                    counter: None,
                    exit: TermId::NONE,
                });
                self.program.set_next(mark, body.entry);
                self.program.patch(&body.holes, guard);
                self.program.set_next(guard, branch);
                let exit = if q.lazy {
                    self.program.set_alt(branch, mark);
                    Hole::next(branch)
                } else {
                    self.program.set_next(branch, mark);
                    Hole::alt(branch)
                };
                Frag {
                    entry: if min == 0 { branch } else { mark },
                    holes: vec![exit, Hole::alt(guard)],
                }
            }
            (min, max) => {
                let count_reg = self.new_counter();
                let mark_reg = self.new_counter();
                let reset = self.program.push(Term::CounterReset { reg: count_reg });
                let branch = self.program.push(Term::Branch { alt: TermId::NONE });
                self.program.set_next(reset, branch);

                let mark = self.program.push(Term::LoopMark { reg: mark_reg });
                let body_entry = match max {
                    Some(max) => {
                        let below = self.program.push(Term::CounterBelow {
                            reg: count_reg,
                            max,
                        });
                        self.program.set_next(below, mark);
                        below
                    }
                    None => mark,
                };
                self.program.set_next(mark, body.entry);
                let inc = self.program.push(Term::CounterInc { reg: count_reg });
                self.program.patch(&body.holes, inc);
                let guard = self.program.push(Term::LoopGuard {
                    mark: mark_reg,
                    counter: Some((count_reg, min)),
                    exit: TermId::NONE,
                });
                self.program.set_next(inc, guard);
                self.program.set_next(guard, branch);

                let enough = self.program.push(Term::CounterAtLeast { reg: count_reg, min });
                if q.lazy {
                    self.program.set_next(branch, enough);
                    self.program.set_alt(branch, body_entry);
                } else {
                    self.program.set_next(branch, body_entry);
                    self.program.set_alt(branch, enough);
                }
                Frag {
                    entry: reset,
                    holes: vec![Hole::next(enough), Hole::alt(guard)],
                }
            }
        }
    }
}

fn primitive(id: TermId) -> Piece {
    Piece {
        frag: Frag::single(id),
        kind: PieceKind::Primitive(id),
        width: Some(1),
    }
}

fn zero_width(id: TermId) -> Piece {
    Piece {
        frag: Frag::single(id),
        kind: PieceKind::Compound,
        width: Some(0),
    }
}
