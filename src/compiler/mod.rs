//! Pattern compiler: pattern text to term graph.
//!
//! Recursive descent over the tokenizer. Every construct is compiled into a
//! `Frag` (entry term plus dangling edges) and concatenation patches the
//! dangling edges of one piece onto the entry of the next. Literal runs,
//! escapes and quantifiers live in `atoms`.

mod atoms;
mod term;
mod tokenizer;

#[cfg(test)]
mod tests;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::charclass::ClassRegistry;
use crate::{Flags, SyntaxError};

pub(crate) use term::{Anchor, LookMode, Program, Term, TermId};
use term::{Frag, Hole};
use tokenizer::{GroupKind, Token, Tokenizer};

/// Output of the compiler, before optimization.
#[derive(Debug)]
pub(crate) struct Compiled {
    pub program: Program,
    pub root0: TermId,
    pub slot_count: usize,
    pub counter_count: usize,
    pub look_count: usize,
    pub names: FxHashMap<String, usize>,
    /// Every primitive `Repeat` term, for the optimizer.
    pub repeats: Vec<TermId>,
}

pub(crate) fn compile(
    source: &str,
    flags: Flags,
    registry: &ClassRegistry,
) -> Result<Compiled, SyntaxError> {
    let data: Vec<char> = source.chars().collect();
    let mut compiler = Compiler::new(&data, registry);
    let alternatives = compiler.group_body(flags, true)?;
    let (frag, _) = compiler.alternation(alternatives);
    let success = compiler.program.push(Term::Success);
    compiler.program.patch(&frag.holes, success);
    compiler.check_references()?;

    Ok(Compiled {
        program: compiler.program,
        root0: frag.entry,
        slot_count: compiler.slot_count,
        counter_count: compiler.counter_count,
        look_count: compiler.look_count,
        names: compiler.names,
        repeats: compiler.repeats,
    })
}

/// What a compiled piece is, as far as quantifiers care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PieceKind {
    /// A single-char node: `Char`, `Class` or `Any`.
    Primitive(TermId),
    /// A single `Backref` node.
    Backref(TermId),
    /// Anything else.
    Compound,
    /// Already carries a quantifier.
    Quantified,
}

#[derive(Debug)]
struct Piece {
    frag: Frag,
    kind: PieceKind,
    /// Number of chars consumed, when fixed.
    width: Option<usize>,
}

impl Piece {
    fn compound(frag: Frag, width: Option<usize>) -> Piece {
        Piece {
            frag,
            kind: PieceKind::Compound,
            width,
        }
    }
}

/// One `|`-separated alternative of a group.
#[derive(Debug)]
struct Alternative {
    frag: Frag,
    width: Option<usize>,
}

struct Compiler<'a> {
    data: &'a [char],
    tokens: Tokenizer<'a>,
    registry: &'a ClassRegistry,
    program: Program,
    slot_count: usize,
    declared: FxHashSet<usize>,
    names: FxHashMap<String, usize>,
    counter_count: usize,
    look_count: usize,
    repeats: Vec<TermId>,
    /// Numeric group references `(slot, offset)`, checked once all groups
    /// are known.
    references: Vec<(usize, usize)>,
}

impl<'a> Compiler<'a> {
    fn new(data: &'a [char], registry: &'a ClassRegistry) -> Self {
        Self {
            data,
            tokens: Tokenizer::new(data),
            registry,
            program: Program::new(),
            slot_count: 1,
            declared: FxHashSet::default(),
            names: FxHashMap::default(),
            counter_count: 0,
            look_count: 0,
            repeats: Vec::new(),
            references: Vec::new(),
        }
    }

    fn new_counter(&mut self) -> usize {
        self.counter_count += 1;
        self.counter_count - 1
    }

    fn new_look(&mut self) -> usize {
        self.look_count += 1;
        self.look_count - 1
    }

    fn new_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        self.declared.insert(slot);
        slot
    }

    /// Slot for `({name}` / `({=name}`; all-digit names address a slot directly.
    fn named_slot(&mut self, name: &str, reassign: bool, at: usize) -> Result<usize, SyntaxError> {
        if let Ok(id) = name.parse::<usize>() {
            if id == 0 {
                return Err(SyntaxError::new("group 0 cannot be declared", at));
            }
            if !self.declared.insert(id) && !reassign {
                return Err(SyntaxError::new(
                    format!("group redeclaration: {}", id),
                    at,
                ));
            }
            self.slot_count = self.slot_count.max(id + 1);
            return Ok(id);
        }
        match self.names.get(name) {
            Some(&slot) if reassign => Ok(slot),
            Some(_) => Err(SyntaxError::new(
                format!("group redeclaration: {}", name),
                at,
            )),
            None => {
                let slot = self.new_slot();
                self.names.insert(name.to_string(), slot);
                Ok(slot)
            }
        }
    }

    /// Resolve a group reference by number or name.
    fn group_reference(&mut self, name: &str, at: usize) -> Result<usize, SyntaxError> {
        if let Ok(id) = name.parse::<usize>() {
            self.references.push((id, at));
            return Ok(id);
        }
        self.names.get(name).copied().ok_or_else(|| {
            SyntaxError::new(format!("reference to an undeclared group: {}", name), at)
        })
    }

    fn check_references(&self) -> Result<(), SyntaxError> {
        match self
            .references
            .iter()
            .find(|(slot, _)| *slot >= self.slot_count)
        {
            Some(&(slot, at)) => Err(SyntaxError::new(
                format!("reference to an undeclared group: {}", slot),
                at,
            )),
            None => Ok(()),
        }
    }

    /// Compile alternatives up to the closing `)` (or the end, at top level).
    fn group_body(&mut self, flags: Flags, top: bool) -> Result<Vec<Alternative>, SyntaxError> {
        let mut flags = flags;
        let mut alternatives = Vec::new();
        let mut pieces: Vec<Piece> = Vec::new();
        loop {
            let token = self.tokens.next(flags)?;
            let at = self.tokens.start();
            match token {
                Token::End if top => {
                    alternatives.push(self.sequence(pieces));
                    return Ok(alternatives);
                }
                Token::End => return Err(SyntaxError::new("unbalanced parenthesis", at)),
                Token::Close if top => {
                    return Err(SyntaxError::new("unbalanced parenthesis", at));
                }
                Token::Close => {
                    alternatives.push(self.sequence(pieces));
                    return Ok(alternatives);
                }
                Token::Alternation => {
                    let done = std::mem::take(&mut pieces);
                    alternatives.push(self.sequence(done));
                }
                Token::Flags { start, end } => {
                    flags = flags.apply_toggles(&self.data[start..end], start)?;
                }
                Token::Literal { start, end } => self.literal_run(start, end, flags, &mut pieces)?,
                Token::ClassGroup { start, end } => {
                    let set = crate::charclass::parse_class_group(
                        self.data,
                        start,
                        end,
                        flags,
                        self.registry,
                    )?;
                    pieces.push(self.class_piece(set));
                }
                Token::Open(kind) => {
                    let piece = self.group(kind, flags, at)?;
                    pieces.push(piece);
                }
            }
        }
    }

    /// Concatenate pieces into one alternative.
    fn sequence(&mut self, pieces: Vec<Piece>) -> Alternative {
        let mut iter = pieces.into_iter();
        let first = match iter.next() {
            Some(first) => first,
            None => {
                let void = self.program.push(Term::Void);
                return Alternative {
                    frag: Frag::single(void),
                    width: Some(0),
                };
            }
        };
        let mut frag = first.frag;
        let mut width = first.width;
        for piece in iter {
            self.program.patch(&frag.holes, piece.frag.entry);
            frag.holes = piece.frag.holes;
            width = match (width, piece.width) {
                (Some(a), Some(b)) => Some(a + b),
                _ => None,
            };
        }
        Alternative { frag, width }
    }

    /// Chain alternatives with `Branch` terms. The width is known only when
    /// every alternative has the same fixed width.
    fn alternation(&mut self, alternatives: Vec<Alternative>) -> (Frag, Option<usize>) {
        let width = fixed_common_width(&alternatives);
        let mut alternatives = alternatives;
        let last = match alternatives.pop() {
            Some(last) => last,
            None => {
                let void = self.program.push(Term::Void);
                return (Frag::single(void), Some(0));
            }
        };
        let mut entry = last.frag.entry;
        let mut holes = last.frag.holes;
        for alt in alternatives.into_iter().rev() {
            let branch = self.program.push(Term::Branch { alt: entry });
            self.program.set_next(branch, alt.frag.entry);
            holes.extend(alt.frag.holes);
            entry = branch;
        }
        (Frag { entry, holes }, width)
    }

    fn group(&mut self, kind: GroupKind, flags: Flags, at: usize) -> Result<Piece, SyntaxError> {
        match kind {
            GroupKind::Capture => {
                let slot = self.new_slot();
                self.capture(slot, flags)
            }
            GroupKind::Named { name, reassign } => {
                let slot = self.named_slot(&name, reassign, at)?;
                self.capture(slot, flags)
            }
            GroupKind::NonCapture { toggles } => {
                let flags = match toggles {
                    Some((start, end)) => flags.apply_toggles(&self.data[start..end], start)?,
                    None => flags,
                };
                let alternatives = self.group_body(flags, false)?;
                let (frag, width) = self.alternation(alternatives);
                Ok(Piece::compound(frag, width))
            }
            GroupKind::LookAhead { negative } => self.lookaround(flags, negative, false, at),
            GroupKind::LookBehind { negative } => self.lookaround(flags, negative, true, at),
            GroupKind::Atomic => {
                let slot = self.new_look();
                let alternatives = self.group_body(flags, false)?;
                let (body, width) = self.alternation(alternatives);
                let enter = self.program.push(Term::AtomicIn { slot });
                let exit = self.program.push(Term::AtomicOut { slot });
                self.program.set_next(enter, body.entry);
                self.program.patch(&body.holes, exit);
                Ok(Piece::compound(
                    Frag {
                        entry: enter,
                        holes: vec![Hole::next(exit)],
                    },
                    width,
                ))
            }
            GroupKind::Conditional => self.conditional(flags, at),
        }
    }

    fn capture(&mut self, slot: usize, flags: Flags) -> Result<Piece, SyntaxError> {
        let alternatives = self.group_body(flags, false)?;
        let (body, width) = self.alternation(alternatives);
        let enter = self.program.push(Term::GroupIn { slot });
        let exit = self.program.push(Term::GroupOut { slot });
        self.program.set_next(enter, body.entry);
        self.program.patch(&body.holes, exit);
        Ok(Piece::compound(
            Frag {
                entry: enter,
                holes: vec![Hole::next(exit)],
            },
            width,
        ))
    }

    /// Compile a lookaround body into a `LookIn`/`LookOut` pair; returns the
    /// two terms with both continuations still open.
    fn look_pair(
        &mut self,
        flags: Flags,
        mode: LookMode,
        behind: bool,
        at: usize,
    ) -> Result<(TermId, TermId), SyntaxError> {
        let slot = self.new_look();
        let alternatives = self.group_body(flags, false)?;
        let behind = if behind {
            Some(lookbehind_width(&alternatives, at)?)
        } else {
            None
        };
        let (body, _) = self.alternation(alternatives);
        let enter = self.program.push(Term::LookIn {
            slot,
            mode,
            behind,
            alt: TermId::NONE,
        });
        let exit = self.program.push(Term::LookOut { slot, mode });
        self.program.set_next(enter, body.entry);
        self.program.patch(&body.holes, exit);
        Ok((enter, exit))
    }

    fn lookaround(
        &mut self,
        flags: Flags,
        negative: bool,
        behind: bool,
        at: usize,
    ) -> Result<Piece, SyntaxError> {
        let mode = if negative {
            LookMode::Negative
        } else {
            LookMode::Positive
        };
        let (enter, exit) = self.look_pair(flags, mode, behind, at)?;
        let holes = if negative {
            vec![Hole::alt(enter)]
        } else {
            vec![Hole::next(exit)]
        };
        Ok(Piece::compound(
            Frag {
                entry: enter,
                holes,
            },
            Some(0),
        ))
    }

    /// `(?(cond)yes|no)`; the tokenizer is on the condition's `(`.
    fn conditional(&mut self, flags: Flags, at: usize) -> Result<Piece, SyntaxError> {
        let condition = self.tokens.next(flags)?;
        let cond_at = self.tokens.start();
        match condition {
            Token::Open(GroupKind::Capture) => {
                let name = match self.tokens.next(flags)? {
                    Token::Literal { start, end } => self.data[start..end]
                        .iter()
                        .filter(|c| !c.is_whitespace())
                        .collect::<String>(),
                    _ => return Err(SyntaxError::new("malformed condition", cond_at)),
                };
                if self.tokens.next(flags)? != Token::Close {
                    return Err(SyntaxError::new("malformed condition", cond_at));
                }
                let slot = self.group_reference(&name, cond_at)?;
                let (yes, no) = self.branches(flags, at)?;
                let test = self.program.push(Term::SlotCondition {
                    slot,
                    alt: TermId::NONE,
                });
                let width = branch_width(&yes, no.as_ref());
                self.program.set_next(test, yes.frag.entry);
                let mut holes = yes.frag.holes;
                match no {
                    Some(no) => {
                        self.program.set_alt(test, no.frag.entry);
                        holes.extend(no.frag.holes);
                    }
                    None => holes.push(Hole::alt(test)),
                }
                Ok(Piece::compound(Frag { entry: test, holes }, width))
            }
            Token::Open(GroupKind::LookAhead { negative }) => {
                self.look_condition(flags, negative, false, cond_at, at)
            }
            Token::Open(GroupKind::LookBehind { negative }) => {
                self.look_condition(flags, negative, true, cond_at, at)
            }
            _ => Err(SyntaxError::new("malformed condition", cond_at)),
        }
    }

    /// `(?(?=..)yes|no)` and the other lookaround conditions.
    fn look_condition(
        &mut self,
        flags: Flags,
        negative: bool,
        behind: bool,
        cond_at: usize,
        at: usize,
    ) -> Result<Piece, SyntaxError> {
        let (enter, exit) = self.look_pair(flags, LookMode::Condition, behind, cond_at)?;
        let (yes, no) = self.branches(flags, at)?;
        let width = branch_width(&yes, no.as_ref());
        let (on_match, on_miss) = if negative {
            (no, Some(yes))
        } else {
            (Some(yes), no)
        };
        let mut holes = Vec::new();
        match on_match {
            Some(branch) => {
                self.program.set_next(exit, branch.frag.entry);
                holes.extend(branch.frag.holes);
            }
            None => holes.push(Hole::next(exit)),
        }
        match on_miss {
            Some(branch) => {
                self.program.set_alt(enter, branch.frag.entry);
                holes.extend(branch.frag.holes);
            }
            None => holes.push(Hole::alt(enter)),
        }
        Ok(Piece::compound(
            Frag {
                entry: enter,
                holes,
            },
            width,
        ))
    }

    /// The `yes|no` part of a conditional, up to its `)`.
    fn branches(
        &mut self,
        flags: Flags,
        at: usize,
    ) -> Result<(Alternative, Option<Alternative>), SyntaxError> {
        let alternatives = self.group_body(flags, false)?;
        if alternatives.len() > 2 {
            return Err(SyntaxError::new(
                "attempt to set a 3rd choice in a conditional expr",
                at,
            ));
        }
        let mut iter = alternatives.into_iter();
        match iter.next() {
            Some(yes) => Ok((yes, iter.next())),
            None => Err(SyntaxError::new("malformed condition", at)),
        }
    }
}

fn fixed_common_width(alternatives: &[Alternative]) -> Option<usize> {
    let first = alternatives.first()?.width?;
    alternatives
        .iter()
        .all(|a| a.width == Some(first))
        .then_some(first)
}

fn branch_width(yes: &Alternative, no: Option<&Alternative>) -> Option<usize> {
    let no = no.map_or(Some(0), |n| n.width);
    match (yes.width, no) {
        (Some(a), Some(b)) if a == b => Some(a),
        _ => None,
    }
}

fn lookbehind_width(alternatives: &[Alternative], at: usize) -> Result<usize, SyntaxError> {
    // unequal alternatives are as unbounded as a variable-width element
    let width = if alternatives.iter().all(|a| a.width.is_some()) {
        fixed_common_width(alternatives)
    } else {
        None
    };
    width.ok_or_else(|| {
        SyntaxError::new(
            "variable length element within a lookbehind assertion",
            at,
        )
    })
}
