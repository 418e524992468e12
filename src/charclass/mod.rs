//! Character classes.
//!
//! This module turns class syntax into code point sets:
//!
//! - `bitset`: `CharSet`, the signed `Bitset` builder and the frozen `CharClass`
//! - `registry`: named classes (POSIX, Unicode categories, Unicode blocks)
//! - `parser`: `[...]` bodies, `(?[...])` class groups, `{Name}` references
//!   and the escapes shared with the pattern compiler
//! - `unicode_data`: static general category tables

mod bitset;
mod parser;
mod registry;
mod unicode_data;

pub use bitset::{Bitset, CharClass, CharSet, MAX_CODE_POINT};
pub use registry::ClassRegistry;

pub(crate) use parser::{
    code_point_escape, named_class, parse_class, parse_class_group, parse_name,
};

/// Simple (single char) lower case mapping, or `c` itself.
#[inline]
pub(crate) fn simple_lower(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Simple (single char) upper case mapping, or `c` itself.
#[inline]
pub(crate) fn simple_upper(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_uppercase();
    }
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Case-insensitive comparison of two chars.
#[inline]
pub(crate) fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || simple_lower(a) == simple_lower(b) || simple_upper(a) == simple_upper(b)
}

/// True if `c` has a different lower or upper case form.
#[inline]
pub(crate) fn has_case(c: char) -> bool {
    simple_lower(c) != c || simple_upper(c) != c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_helpers() {
        assert_eq!(simple_lower('Q'), 'q');
        assert_eq!(simple_upper('\u{3b1}'), '\u{391}');
        // 'ß' upper-cases to "SS"; the simple mapping keeps it.
        assert_eq!(simple_upper('ß'), 'ß');
        assert!(eq_ignore_case('k', 'K'));
        assert!(eq_ignore_case('\u{3a3}', '\u{3c3}'));
        assert!(!eq_ignore_case('a', 'b'));
        assert!(has_case('x'));
        assert!(!has_case('7'));
    }
}
