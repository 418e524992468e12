//! retrace: a backtracking regular expression engine
//!
//! Patterns are compiled once into an immutable [`Pattern`] (a graph of
//! terms plus skip shortcuts) that can be shared freely between threads.
//! Each search runs on a [`Matcher`], a small virtual machine with an
//! explicit choice-point stack and an undo trail for captures and counters.
//!
//! Supported syntax includes capturing, named and non-capturing groups,
//! greedy and lazy quantifiers (`* + ? {n,m}`), lookahead and fixed-width
//! lookbehind, independent groups `(?>...)`, conditionals `(?(1)yes|no)`,
//! backreferences, inline flags, Unicode categories and blocks, and class
//! arithmetic.
//!
//! ```
//! use retrace::{compile, MatchResult};
//!
//! let pattern = compile(r"(\w+)@(\w+)", "").unwrap();
//! let mut m = pattern.matcher("joe@host");
//! assert!(m.matches());
//! assert_eq!(m.group(1).unwrap().as_deref(), Some("joe"));
//! assert_eq!(m.group(2).unwrap().as_deref(), Some("host"));
//! ```

mod cache;
pub mod charclass;
mod compiler;
pub mod flags;
mod matcher;
mod optimizer;
mod pattern;

use std::fmt;

pub use cache::PatternCache;
pub use charclass::ClassRegistry;
pub use flags::{Flags, IntoFlags, SearchOptions};
pub use matcher::{FindIter, GroupRef, MatchResult, MatchSnapshot, Matcher};
pub use pattern::Pattern;

/// A malformed pattern, with the char offset where the problem was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        SyntaxError {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for SyntaxError {}

/// Errors returned by compilation and by the result accessors.
#[derive(Debug)]
pub enum Error {
    /// The pattern or flag string is malformed.
    Syntax(SyntaxError),
    /// No such group id or name.
    UnknownGroup(String),
    /// The group exists but did not take part in the match.
    Unassigned(String),
    /// Reading a target from a reader failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "syntax error: {}", e),
            Error::UnknownGroup(g) => write!(f, "unknown group: {}", g),
            Error::Unassigned(g) => write!(f, "group not assigned: {}", g),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Syntax(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Self {
        Error::Syntax(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Compile `source` with the given flags (a [`Flags`] value or a string
/// such as `"im"`).
pub fn compile(source: &str, flags: impl IntoFlags) -> Result<Pattern, Error> {
    Pattern::compile(source, flags)
}
