//! Splits a pattern into group structure and literal runs.
//!
//! The compiler pulls tokens one at a time with the flags in force at that
//! point, so bracket skipping inside runs follows the current `X` setting.

use crate::{Flags, SyntaxError};

/// The kinds of `(` openers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum GroupKind {
    Capture,
    /// `(?:` or `(?flags:`; `toggles` is the char range of the flag letters.
    NonCapture { toggles: Option<(usize, usize)> },
    /// `({name}`, `({=name}`, `(?<name>`, `(?P<name>`
    Named { name: String, reassign: bool },
    LookAhead { negative: bool },
    LookBehind { negative: bool },
    Atomic,
    /// `(?(`; the tokenizer stops on the condition's own `(`.
    Conditional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token {
    Open(GroupKind),
    /// `(?[...])`; the range covers the body between `(?` and `)`.
    ClassGroup { start: usize, end: usize },
    Alternation,
    Close,
    /// Everything up to the next structural char.
    Literal { start: usize, end: usize },
    /// `(?imsx-u)`; the range covers the toggle letters.
    Flags { start: usize, end: usize },
    End,
}

pub(super) struct Tokenizer<'a> {
    data: &'a [char],
    pos: usize,
    /// Where the most recent token started.
    start: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a [char]) -> Self {
        Self {
            data,
            pos: 0,
            start: 0,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<char> {
        self.data.get(self.pos + n).copied()
    }

    pub fn next(&mut self, flags: Flags) -> Result<Token, SyntaxError> {
        loop {
            self.start = self.pos;
            let c = match self.peek() {
                Some(c) => c,
                None => return Ok(Token::End),
            };
            match c {
                '(' => {
                    self.pos += 1;
                    match self.open()? {
                        Some(token) => return Ok(token),
                        None => continue,
                    }
                }
                ')' => {
                    self.pos += 1;
                    return Ok(Token::Close);
                }
                '|' => {
                    self.pos += 1;
                    return Ok(Token::Alternation);
                }
                _ => {
                    let start = self.pos;
                    self.skip_literal(flags);
                    return Ok(Token::Literal {
                        start,
                        end: self.pos,
                    });
                }
            }
        }
    }

    /// Classify the opener after `(`. `None` means a comment was skipped.
    fn open(&mut self) -> Result<Option<Token>, SyntaxError> {
        match self.peek() {
            Some('?') => {}
            Some('{') => return self.braced_name().map(Some),
            _ => return Ok(Some(Token::Open(GroupKind::Capture))),
        }
        let question = self.pos;
        self.pos += 1;
        let c = match self.peek() {
            Some(c) => c,
            None => return Err(SyntaxError::new("unbalanced parenthesis", self.start)),
        };
        let kind = match c {
            ':' => {
                self.pos += 1;
                GroupKind::NonCapture { toggles: None }
            }
            '=' | '!' => {
                self.pos += 1;
                GroupKind::LookAhead {
                    negative: c == '!',
                }
            }
            '>' => {
                self.pos += 1;
                GroupKind::Atomic
            }
            '(' => GroupKind::Conditional,
            '#' => {
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == ')' {
                        return Ok(None);
                    }
                }
                return Err(SyntaxError::new("unterminated comment", self.start));
            }
            '[' => return self.class_group().map(Some),
            '<' => match self.peek_at(1) {
                Some('=') | Some('!') => {
                    let negative = self.peek_at(1) == Some('!');
                    self.pos += 2;
                    GroupKind::LookBehind { negative }
                }
                _ => {
                    self.pos += 1;
                    self.angle_name()?
                }
            },
            'P' if self.peek_at(1) == Some('<') => {
                self.pos += 2;
                self.angle_name()?
            }
            _ => return self.flag_group(question).map(Some),
        };
        Ok(Some(Token::Open(kind)))
    }

    /// `(?i)` or `(?i:`; `pos` is on the first toggle char.
    fn flag_group(&mut self, question: usize) -> Result<Token, SyntaxError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                ')' => {
                    let end = self.pos;
                    self.pos += 1;
                    return Ok(Token::Flags { start, end });
                }
                ':' => {
                    let end = self.pos;
                    self.pos += 1;
                    return Ok(Token::Open(GroupKind::NonCapture {
                        toggles: Some((start, end)),
                    }));
                }
                '+' | '-' => self.pos += 1,
                c if Flags::from_letter(c).is_some() => self.pos += 1,
                _ => break,
            }
        }
        let at = if self.pos == start { question + 1 } else { self.pos };
        Err(SyntaxError::new("wrong char after (?", at))
    }

    /// `<name>` with `pos` after the `<`.
    fn angle_name(&mut self) -> Result<GroupKind, SyntaxError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '>' {
                let name: String = self.data[start..self.pos - 1].iter().collect();
                if name.is_empty() {
                    return Err(SyntaxError::new("empty group name", start));
                }
                return Ok(GroupKind::Named {
                    name,
                    reassign: false,
                });
            }
        }
        Err(SyntaxError::new("unterminated group name", start))
    }

    /// `({name}`, `({=name}`; `pos` is on the `{`.
    fn braced_name(&mut self) -> Result<Token, SyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let reassign = self.peek() == Some('=');
        if reassign {
            self.pos += 1;
        }
        let mut name = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '}' if name.is_empty() => {
                    return Err(SyntaxError::new("empty group name", open));
                }
                '}' => return Ok(Token::Open(GroupKind::Named { name, reassign })),
                c if c.is_whitespace() => {}
                c => name.push(c),
            }
        }
        Err(SyntaxError::new("unterminated group name", open))
    }

    /// `(?[...])`; `pos` is on the first `[`.
    fn class_group(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                '[' => self.skip_class(true),
                ')' => {
                    let end = self.pos;
                    self.pos += 1;
                    return Ok(Token::ClassGroup { start, end });
                }
                _ => self.pos += 1,
            }
        }
        Err(SyntaxError::new("unterminated class group", self.start))
    }

    fn skip_literal(&mut self, flags: Flags) {
        let xml = flags.contains(Flags::XML_SCHEMA);
        while let Some(c) = self.peek() {
            match c {
                '(' | ')' | '|' => return,
                '\\' => self.pos = (self.pos + 2).min(self.data.len()),
                '[' => self.skip_class(xml),
                _ => self.pos += 1,
            }
        }
    }

    /// Skip a bracketed class with `pos` on its `[`. Nested brackets only
    /// count in the `-[` subtraction form when `nested` is set. An
    /// unterminated class runs to the end; the class parser reports it.
    fn skip_class(&mut self, nested: bool) {
        self.pos += 1;
        let mut depth = 1;
        if self.peek() == Some('^') {
            self.pos += 1;
        }
        if self.peek() == Some(']') {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.pos = (self.pos + 2).min(self.data.len());
                    continue;
                }
                '-' if nested && self.peek_at(1) == Some('[') => {
                    self.pos += 2;
                    depth += 1;
                    if self.peek() == Some('^') {
                        self.pos += 1;
                    }
                    if self.peek() == Some(']') {
                        self.pos += 1;
                    }
                    continue;
                }
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(src: &str, flags: Flags) -> Vec<Token> {
        let data: Vec<char> = src.chars().collect();
        let mut tok = Tokenizer::new(&data);
        let mut out = Vec::new();
        loop {
            let t = tok.next(flags).unwrap();
            if t == Token::End {
                return out;
            }
            out.push(t);
        }
    }

    #[test]
    fn test_structure() {
        assert_eq!(
            tokens("ab(c|d)", Flags::empty()),
            vec![
                Token::Literal { start: 0, end: 2 },
                Token::Open(GroupKind::Capture),
                Token::Literal { start: 3, end: 4 },
                Token::Alternation,
                Token::Literal { start: 5, end: 6 },
                Token::Close,
            ]
        );
    }

    #[test]
    fn test_escapes_and_classes_stay_in_the_run() {
        assert_eq!(
            tokens(r"a\(b[)|]c", Flags::empty()),
            vec![Token::Literal { start: 0, end: 9 }]
        );
        assert_eq!(
            tokens("[]|]x", Flags::empty()),
            vec![Token::Literal { start: 0, end: 5 }]
        );
    }

    #[test]
    fn test_nested_class_only_in_xml_mode() {
        // [a-[b]|] : with X the inner class nests, so '|' is inside
        assert_eq!(
            tokens("[a-[b]|]", Flags::XML_SCHEMA),
            vec![Token::Literal { start: 0, end: 8 }]
        );
        assert_eq!(
            tokens("[a-[b]|]", Flags::empty()),
            vec![
                Token::Literal { start: 0, end: 6 },
                Token::Alternation,
                Token::Literal { start: 7, end: 8 },
            ]
        );
    }

    #[test]
    fn test_group_openers() {
        let cases = [
            ("(?:", GroupKind::NonCapture { toggles: None }),
            ("(?=", GroupKind::LookAhead { negative: false }),
            ("(?!", GroupKind::LookAhead { negative: true }),
            ("(?<=", GroupKind::LookBehind { negative: false }),
            ("(?<!", GroupKind::LookBehind { negative: true }),
            ("(?>", GroupKind::Atomic),
            ("(?(", GroupKind::Conditional),
            (
                "(?i-s:",
                GroupKind::NonCapture {
                    toggles: Some((2, 5)),
                },
            ),
            (
                "({x}",
                GroupKind::Named {
                    name: "x".into(),
                    reassign: false,
                },
            ),
            (
                "({=x}",
                GroupKind::Named {
                    name: "x".into(),
                    reassign: true,
                },
            ),
            (
                "(?<year>",
                GroupKind::Named {
                    name: "year".into(),
                    reassign: false,
                },
            ),
            (
                "(?P<y>",
                GroupKind::Named {
                    name: "y".into(),
                    reassign: false,
                },
            ),
        ];
        for (src, kind) in cases {
            let data: Vec<char> = src.chars().collect();
            let mut tok = Tokenizer::new(&data);
            assert_eq!(tok.next(Flags::empty()).unwrap(), Token::Open(kind), "{}", src);
        }
    }

    #[test]
    fn test_conditional_stops_on_condition() {
        let data: Vec<char> = "(?(1)a)".chars().collect();
        let mut tok = Tokenizer::new(&data);
        assert_eq!(
            tok.next(Flags::empty()).unwrap(),
            Token::Open(GroupKind::Conditional)
        );
        assert_eq!(
            tok.next(Flags::empty()).unwrap(),
            Token::Open(GroupKind::Capture)
        );
    }

    #[test]
    fn test_flags_comment_and_class_group() {
        assert_eq!(
            tokens("(?#note)(?im)x(?[a-z]-[q])", Flags::empty()),
            vec![
                Token::Flags { start: 10, end: 12 },
                Token::Literal { start: 13, end: 14 },
                Token::ClassGroup { start: 16, end: 25 },
            ]
        );
    }

    #[test]
    fn test_bad_openers() {
        let data: Vec<char> = "(?q)".chars().collect();
        let err = Tokenizer::new(&data).next(Flags::empty()).unwrap_err();
        assert_eq!(err.message, "wrong char after (?");
        assert_eq!(err.offset, 2);

        let data: Vec<char> = "(?#open".chars().collect();
        assert!(Tokenizer::new(&data).next(Flags::empty()).is_err());
    }
}
