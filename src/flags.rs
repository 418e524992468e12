//! Compile flags and search options.
//!
//! Flags can be given as a [`Flags`] value or as a string of toggles such as
//! `"im"`, `"+s-i"` or `"-x"`. Letters after `-` clear a flag, letters before
//! it (or after `+`) set it.

use bitflags::bitflags;

use crate::{Error, SyntaxError};

bitflags! {
    /// Pattern compile flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        /// `i`: case-insensitive literals, classes and backreferences.
        const IGNORE_CASE = 1 << 0;
        /// `m`: `^` and `$` match at line boundaries.
        const MULTILINE = 1 << 1;
        /// `s`: `.` matches `\n` too.
        const DOTALL = 1 << 2;
        /// `x`: literal whitespace in the pattern is ignored.
        const IGNORE_SPACES = 1 << 3;
        /// `u`: `\d`, `\s`, `\w` and `\b` use Unicode tables.
        const UNICODE = 1 << 4;
        /// `X`: XML-schema class subtraction `[a-z-[aeiou]]`.
        const XML_SCHEMA = 1 << 5;
    }
}

bitflags! {
    /// Anchoring options for a single search.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SearchOptions: u32 {
        /// Only try a match at the current window position.
        const ANCHOR_START = 1 << 0;
        /// Only try a match where the previous match ended.
        const ANCHOR_LASTMATCH = 1 << 1;
        /// A match must end at the end of the target.
        const ANCHOR_END = 1 << 2;
        /// Running out of input before failing counts as success.
        const ACCEPT_INCOMPLETE = 1 << 3;
    }
}

impl Flags {
    /// Map a flag letter to its flag.
    pub fn from_letter(c: char) -> Option<Flags> {
        match c {
            'i' => Some(Flags::IGNORE_CASE),
            'm' => Some(Flags::MULTILINE),
            's' => Some(Flags::DOTALL),
            'x' => Some(Flags::IGNORE_SPACES),
            'u' => Some(Flags::UNICODE),
            'X' => Some(Flags::XML_SCHEMA),
            _ => None,
        }
    }

    /// Apply a toggle string to `self`.
    ///
    /// `base_offset` is only used to position errors inside a larger pattern.
    pub(crate) fn apply_toggles(
        self,
        toggles: &[char],
        base_offset: usize,
    ) -> Result<Flags, SyntaxError> {
        let mut flags = self;
        let mut clear = false;
        for (n, &c) in toggles.iter().enumerate() {
            match c {
                '+' => clear = false,
                '-' => clear = true,
                _ => match Flags::from_letter(c) {
                    Some(f) if clear => flags.remove(f),
                    Some(f) => flags.insert(f),
                    None => {
                        return Err(SyntaxError::new(
                            format!("unknown flag letter '{}'", c),
                            base_offset + n,
                        ))
                    }
                },
            }
        }
        Ok(flags)
    }

    /// Parse a toggle string relative to the empty set.
    pub fn parse(s: &str) -> Result<Flags, Error> {
        let chars: Vec<char> = s.chars().collect();
        Ok(Flags::empty().apply_toggles(&chars, 0)?)
    }

    /// Render the set flags as letters, e.g. `"is"`.
    pub fn letters(self) -> String {
        let mut out = String::new();
        for (c, f) in [
            ('i', Flags::IGNORE_CASE),
            ('m', Flags::MULTILINE),
            ('s', Flags::DOTALL),
            ('x', Flags::IGNORE_SPACES),
            ('u', Flags::UNICODE),
            ('X', Flags::XML_SCHEMA),
        ] {
            if self.contains(f) {
                out.push(c);
            }
        }
        out
    }
}

/// Anything `compile` accepts as flags.
pub trait IntoFlags {
    fn into_flags(self) -> Result<Flags, Error>;
}

impl IntoFlags for Flags {
    fn into_flags(self) -> Result<Flags, Error> {
        Ok(self)
    }
}

impl IntoFlags for &str {
    fn into_flags(self) -> Result<Flags, Error> {
        Flags::parse(self)
    }
}

impl IntoFlags for &String {
    fn into_flags(self) -> Result<Flags, Error> {
        Flags::parse(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_letters() {
        let f = Flags::parse("ims").unwrap();
        assert!(f.contains(Flags::IGNORE_CASE | Flags::MULTILINE | Flags::DOTALL));
        assert!(!f.contains(Flags::UNICODE));
    }

    #[test]
    fn test_parse_toggles() {
        let f = Flags::parse("+im-m").unwrap();
        assert_eq!(f, Flags::IGNORE_CASE);

        let g = Flags::IGNORE_CASE
            .apply_toggles(&['-', 'i', 'x'], 0)
            .unwrap();
        assert_eq!(g, Flags::empty());
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(Flags::parse("").unwrap(), Flags::empty());
    }

    #[test]
    fn test_unknown_letter() {
        let err = Flags::parse("iq").unwrap_err();
        assert!(err.to_string().contains("unknown flag letter 'q'"));
    }

    #[test]
    fn test_letters_roundtrip() {
        let f = Flags::IGNORE_CASE | Flags::XML_SCHEMA;
        assert_eq!(f.letters(), "iX");
        assert_eq!(Flags::parse(&f.letters()).unwrap(), f);
    }
}
