//! Parsing of class syntax.
//!
//! Offsets passed in and returned are indexes into the pattern's `char`
//! buffer; `end` bounds the region the caller allows us to read.

use crate::{Flags, SyntaxError};

use super::bitset::{Bitset, CharSet};
use super::registry::ClassRegistry;

enum Element {
    Char(char),
    Set(Bitset),
}

#[derive(Clone, Copy)]
enum SetOp {
    Add,
    Subtract,
    Intersect,
}

struct ClassParser<'a> {
    data: &'a [char],
    pos: usize,
    end: usize,
    flags: Flags,
    registry: &'a ClassRegistry,
}

impl<'a> ClassParser<'a> {
    #[inline]
    fn peek(&self) -> Option<char> {
        (self.pos < self.end).then(|| self.data[self.pos])
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<char> {
        let at = self.pos + n;
        (at < self.end).then(|| self.data[at])
    }

    fn skip_spaces(&mut self) {
        if !self.flags.contains(Flags::IGNORE_SPACES) {
            return;
        }
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn xml(&self) -> bool {
        self.flags.contains(Flags::XML_SCHEMA)
    }

    /// Parse a class body. `self.pos` is just past the opening bracket at `open`.
    fn class_body(&mut self, open: usize) -> Result<Bitset, SyntaxError> {
        let mut literals = CharSet::new();
        let mut sets = Bitset::new();
        let mut subtrahend: Option<Bitset> = None;

        let negate = self.peek() == Some('^');
        if negate {
            self.pos += 1;
        }

        let mut first = true;
        loop {
            self.skip_spaces();
            let c = match self.peek() {
                Some(c) => c,
                None => return Err(SyntaxError::new("unbalanced brackets in a class def", open)),
            };
            if c == ']' && !first {
                self.pos += 1;
                break;
            }
            if c == '-' && !first && self.xml() && self.peek_at(1) == Some('[') {
                let inner = self.pos + 1;
                self.pos += 2;
                subtrahend = Some(self.class_body(inner)?);
                self.skip_spaces();
                if self.peek() != Some(']') {
                    return Err(SyntaxError::new(
                        "class subtraction must be the last element of a class",
                        self.pos,
                    ));
                }
                self.pos += 1;
                break;
            }
            first = false;

            let at = self.pos;
            match self.element()? {
                Element::Set(set) => sets.add(&set),
                Element::Char(lo) if self.range_follows() => {
                    self.pos += 1;
                    match self.element()? {
                        Element::Char(hi) if hi >= lo => self.add_range(&mut literals, lo, hi),
                        _ => return Err(SyntaxError::new("illegal range", at)),
                    }
                }
                Element::Char(c) => self.add_char(&mut literals, c),
            }
        }

        sets.add(&Bitset::from_set(literals));
        if negate {
            sets.complement();
        }
        if let Some(sub) = subtrahend {
            sets.subtract(&sub);
        }
        Ok(sets)
    }

    fn range_follows(&self) -> bool {
        self.peek() == Some('-')
            && match self.peek_at(1) {
                None | Some(']') => false,
                Some('[') => !self.xml(),
                Some(_) => true,
            }
    }

    fn add_char(&self, set: &mut CharSet, c: char) {
        if self.flags.contains(Flags::IGNORE_CASE) {
            set.insert_folded(c);
        } else {
            set.insert(c as u32);
        }
    }

    fn add_range(&self, set: &mut CharSet, lo: char, hi: char) {
        if self.flags.contains(Flags::IGNORE_CASE) {
            set.insert_range_folded(lo, hi);
        } else {
            set.insert_range(lo as u32, hi as u32);
        }
    }

    fn element(&mut self) -> Result<Element, SyntaxError> {
        let c = self.data[self.pos];
        self.pos += 1;
        if c != '\\' {
            return Ok(Element::Char(c));
        }
        let letter = match self.peek() {
            Some(l) => l,
            None => return Err(SyntaxError::new("malformed escape", self.pos - 1)),
        };
        match letter {
            'd' | 'D' | 's' | 'S' | 'w' | 'W' => {
                self.pos += 1;
                let unicode = self.flags.contains(Flags::UNICODE);
                match self.registry.predefined(letter, unicode) {
                    Some(set) => Ok(Element::Set(set)),
                    None => Err(SyntaxError::new("malformed escape", self.pos - 2)),
                }
            }
            'p' | 'P' => {
                let skip = self.flags.contains(Flags::IGNORE_SPACES);
                let (name, next) = parse_name(self.data, self.pos + 1, self.end, skip)?;
                let set = named_class(self.registry, &name, self.pos)?;
                self.pos = next;
                Ok(Element::Set(if letter == 'P' { set.negated() } else { set }))
            }
            'b' => {
                self.pos += 1;
                Ok(Element::Char('\u{8}'))
            }
            _ => match code_point_escape(self.data, self.pos, self.end)? {
                Some((ch, next)) => {
                    self.pos = next;
                    Ok(Element::Char(ch))
                }
                None => {
                    self.pos += 1;
                    Ok(Element::Char(letter))
                }
            },
        }
    }
}

/// Parse `[...]`. `pos` is just past the `[`. Returns the set and the
/// position after the closing `]`.
pub(crate) fn parse_class(
    data: &[char],
    pos: usize,
    end: usize,
    flags: Flags,
    registry: &ClassRegistry,
) -> Result<(Bitset, usize), SyntaxError> {
    let mut parser = ClassParser {
        data,
        pos,
        end,
        flags,
        registry,
    };
    let set = parser.class_body(pos.saturating_sub(1))?;
    Ok((set, parser.pos))
}

/// Parse the body of a class group such as `[a-z]-[aeiou]&[^q]`.
pub(crate) fn parse_class_group(
    data: &[char],
    pos: usize,
    end: usize,
    flags: Flags,
    registry: &ClassRegistry,
) -> Result<Bitset, SyntaxError> {
    let mut parser = ClassParser {
        data,
        pos,
        end,
        flags,
        registry,
    };
    let mut sum = Bitset::new();
    let mut op = SetOp::Add;
    while let Some(c) = parser.peek() {
        match c {
            '+' => op = SetOp::Add,
            '-' => op = SetOp::Subtract,
            '&' => op = SetOp::Intersect,
            '[' => {
                let open = parser.pos;
                parser.pos += 1;
                let set = parser.class_body(open)?;
                match op {
                    SetOp::Add => sum.add(&set),
                    SetOp::Subtract => sum.subtract(&set),
                    SetOp::Intersect => sum.intersect(&set),
                }
                continue;
            }
            c if c.is_whitespace() => {}
            ')' => return Err(SyntaxError::new("unbalanced class group", parser.pos)),
            _ => return Err(SyntaxError::new("illegal char in a class group", parser.pos)),
        }
        parser.pos += 1;
    }
    Ok(sum)
}

/// Parse `{Name}` starting at the `{`. Returns the name and the position
/// after the `}`.
pub(crate) fn parse_name(
    data: &[char],
    pos: usize,
    end: usize,
    skip_spaces: bool,
) -> Result<(String, usize), SyntaxError> {
    if pos >= end || data[pos] != '{' {
        return Err(SyntaxError::new("named class doesn't start with '{'", pos));
    }
    let mut name = String::new();
    for i in pos + 1..end {
        match data[i] {
            '}' if name.is_empty() => return Err(SyntaxError::new("empty class name", pos)),
            '}' => return Ok((name, i + 1)),
            c if skip_spaces && c.is_whitespace() => {}
            c => name.push(c),
        }
    }
    Err(SyntaxError::new("wrong class name", pos))
}

/// Resolve a class name against the registry.
pub(crate) fn named_class(
    registry: &ClassRegistry,
    name: &str,
    offset: usize,
) -> Result<Bitset, SyntaxError> {
    registry
        .get(name)
        .cloned()
        .ok_or_else(|| SyntaxError::new(format!("unknown class: {{{}}}", name), offset))
}

/// Decode a code point escape whose letter is at `pos` (just past the
/// backslash). Returns `None` when the letter is not one of them.
pub(crate) fn code_point_escape(
    data: &[char],
    pos: usize,
    end: usize,
) -> Result<Option<(char, usize)>, SyntaxError> {
    let after = pos + 1;
    let at = pos.saturating_sub(1);
    let decoded = match data[pos] {
        'n' => ('\n', after),
        'r' => ('\r', after),
        't' => ('\t', after),
        'f' => ('\u{c}', after),
        'e' => ('\u{1b}', after),
        'a' => ('\u{7}', after),
        'x' if after < end && data[after] == '{' => braced_hex(data, after + 1, end, at)?,
        'x' => fixed_hex(data, after, end, 2, at)?,
        'u' => fixed_hex(data, after, end, 4, at)?,
        'v' => fixed_hex(data, after, end, 6, at)?,
        '0' => radix_digits(data, after, end, 8, 0, 3, at)?,
        'o' => radix_digits(data, after, end, 8, 1, 3, at)?,
        'm' => radix_digits(data, after, end, 10, 1, 7, at)?,
        'c' => {
            if after >= end {
                return Err(SyntaxError::new("malformed control escape", at));
            }
            (to_char(data[after] as u32 & 0x1f, at)?, after + 1)
        }
        _ => return Ok(None),
    };
    Ok(Some(decoded))
}

fn to_char(value: u32, at: usize) -> Result<char, SyntaxError> {
    char::from_u32(value)
        .ok_or_else(|| SyntaxError::new(format!("invalid code point {:#x}", value), at))
}

fn fixed_hex(
    data: &[char],
    pos: usize,
    end: usize,
    count: usize,
    at: usize,
) -> Result<(char, usize), SyntaxError> {
    if pos + count > end {
        return Err(SyntaxError::new(
            format!("malformed escape: {} hex digits expected", count),
            at,
        ));
    }
    let mut value = 0u32;
    for &c in &data[pos..pos + count] {
        let digit = c
            .to_digit(16)
            .ok_or_else(|| SyntaxError::new(format!("wrong hex digit '{}'", c), at))?;
        value = value * 16 + digit;
    }
    Ok((to_char(value, at)?, pos + count))
}

fn braced_hex(
    data: &[char],
    pos: usize,
    end: usize,
    at: usize,
) -> Result<(char, usize), SyntaxError> {
    let mut value = 0u32;
    let mut digits = 0;
    for (i, &c) in data.iter().enumerate().take(end).skip(pos) {
        if c == '}' {
            if digits == 0 {
                return Err(SyntaxError::new("empty hex escape", at));
            }
            return Ok((to_char(value, at)?, i + 1));
        }
        let digit = c
            .to_digit(16)
            .ok_or_else(|| SyntaxError::new(format!("wrong hex digit '{}'", c), at))?;
        digits += 1;
        if digits > 6 {
            return Err(SyntaxError::new("hex escape too long", at));
        }
        value = value * 16 + digit;
    }
    Err(SyntaxError::new("unterminated hex escape", at))
}

fn radix_digits(
    data: &[char],
    pos: usize,
    end: usize,
    radix: u32,
    min: usize,
    max: usize,
    at: usize,
) -> Result<(char, usize), SyntaxError> {
    let mut value = 0u32;
    let mut i = pos;
    while i < end && i - pos < max {
        match data[i].to_digit(radix) {
            Some(d) => value = value * radix + d,
            None => break,
        }
        i += 1;
    }
    if i - pos < min {
        return Err(SyntaxError::new("malformed numeric escape", at));
    }
    Ok((to_char(value, at)?, i))
}
