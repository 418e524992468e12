//! Reading a match: group spans and the text around them.

use std::fmt;
use std::sync::Arc;

use super::{unassigned, Matcher};
use crate::{Error, Pattern};

/// Names a capture group, or one of the spans around the whole match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupRef<'a> {
    Index(usize),
    Name(&'a str),
    /// Target text before the match.
    Prefix,
    /// Target text after the match.
    Suffix,
    /// The whole target.
    Target,
}

impl From<usize> for GroupRef<'_> {
    fn from(n: usize) -> Self {
        GroupRef::Index(n)
    }
}

impl From<i32> for GroupRef<'_> {
    fn from(n: i32) -> Self {
        GroupRef::Index(usize::try_from(n).unwrap_or(usize::MAX))
    }
}

impl<'a> From<&'a str> for GroupRef<'a> {
    fn from(name: &'a str) -> Self {
        GroupRef::Name(name)
    }
}

impl fmt::Display for GroupRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Index(n) => write!(f, "{}", n),
            GroupRef::Name(name) => f.write_str(name),
            GroupRef::Prefix => f.write_str("prefix"),
            GroupRef::Suffix => f.write_str("suffix"),
            GroupRef::Target => f.write_str("target"),
        }
    }
}

/// Access to the groups of a match.
///
/// Positions returned by [`start`](MatchResult::start) and friends are
/// relative to the start of the target; [`bounds`](MatchResult::bounds)
/// returns absolute indices into [`text`](MatchResult::text).
pub trait MatchResult {
    /// Absolute span of a group, `None` if it did not participate.
    fn bounds<'a>(&self, group: impl Into<GroupRef<'a>>) -> Result<Option<(usize, usize)>, Error>;

    /// The whole buffer the target lives in.
    fn text(&self) -> &[char];

    fn target_start(&self) -> usize;

    fn target_end(&self) -> usize;

    /// Number of capture slots, including group 0.
    fn group_count(&self) -> usize;

    fn is_captured<'a>(&self, group: impl Into<GroupRef<'a>>) -> bool {
        matches!(self.bounds(group), Ok(Some(_)))
    }

    fn group<'a>(&self, group: impl Into<GroupRef<'a>>) -> Result<Option<String>, Error> {
        Ok(self
            .bounds(group)?
            .map(|(s, e)| self.text()[s..e].iter().collect()))
    }

    fn start<'a>(&self, group: impl Into<GroupRef<'a>>) -> Result<usize, Error> {
        let group = group.into();
        let (s, _) = self.bounds(group)?.ok_or_else(|| unassigned(group))?;
        Ok(s - self.target_start())
    }

    fn end<'a>(&self, group: impl Into<GroupRef<'a>>) -> Result<usize, Error> {
        let group = group.into();
        let (_, e) = self.bounds(group)?.ok_or_else(|| unassigned(group))?;
        Ok(e - self.target_start())
    }

    fn length<'a>(&self, group: impl Into<GroupRef<'a>>) -> Result<usize, Error> {
        let group = group.into();
        let (s, e) = self.bounds(group)?.ok_or_else(|| unassigned(group))?;
        Ok(e - s)
    }

    /// Text before the match; empty when there is no match.
    fn prefix(&self) -> String {
        self.group(GroupRef::Prefix).ok().flatten().unwrap_or_default()
    }

    fn suffix(&self) -> String {
        self.group(GroupRef::Suffix).ok().flatten().unwrap_or_default()
    }

    fn target(&self) -> String {
        self.group(GroupRef::Target).ok().flatten().unwrap_or_default()
    }

    /// Every group, group 0 first.
    fn groups(&self) -> Vec<Option<String>> {
        (0..self.group_count())
            .map(|n| self.group(n).ok().flatten())
            .collect()
    }

    /// The char `i` positions into the target.
    fn char_at(&self, i: usize) -> Option<char> {
        let at = self.target_start().checked_add(i)?;
        if at < self.target_end() {
            self.text().get(at).copied()
        } else {
            None
        }
    }
}

/// Resolve a group reference against a pattern's slots.
fn resolve(
    pattern: &Pattern,
    group: GroupRef<'_>,
    target: (usize, usize),
    span: impl Fn(usize) -> Option<(usize, usize)>,
) -> Result<Option<(usize, usize)>, Error> {
    let slot = match group {
        GroupRef::Index(n) => n,
        GroupRef::Name(name) => pattern
            .group_id(name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))?,
        GroupRef::Prefix => return Ok(span(0).map(|(s, _)| (target.0, s))),
        GroupRef::Suffix => return Ok(span(0).map(|(_, e)| (e, target.1))),
        GroupRef::Target => return Ok(Some(target)),
    };
    if slot >= pattern.group_count() {
        return Err(Error::UnknownGroup(group.to_string()));
    }
    Ok(span(slot).filter(|(s, e)| s <= e))
}

impl MatchResult for Matcher<'_> {
    fn bounds<'a>(&self, group: impl Into<GroupRef<'a>>) -> Result<Option<(usize, usize)>, Error> {
        resolve(
            self.pattern,
            group.into(),
            (self.window.offset, self.window.end),
            |slot| self.engine.span(slot),
        )
    }

    fn text(&self) -> &[char] {
        &self.text
    }

    fn target_start(&self) -> usize {
        self.window.offset
    }

    fn target_end(&self) -> usize {
        self.window.end
    }

    fn group_count(&self) -> usize {
        self.pattern.group_count()
    }
}

/// A match detached from its matcher.
///
/// Shares the target buffer, so taking a snapshot does not copy text.
#[derive(Clone, Debug)]
pub struct MatchSnapshot<'p> {
    pattern: &'p Pattern,
    text: Arc<Vec<char>>,
    offset: usize,
    end: usize,
    spans: Vec<Option<(usize, usize)>>,
}

impl<'p> MatchSnapshot<'p> {
    pub(super) fn new(
        pattern: &'p Pattern,
        text: Arc<Vec<char>>,
        offset: usize,
        end: usize,
        spans: Vec<Option<(usize, usize)>>,
    ) -> Self {
        MatchSnapshot {
            pattern,
            text,
            offset,
            end,
            spans,
        }
    }

    pub fn pattern(&self) -> &'p Pattern {
        self.pattern
    }

    /// Absolute span of the whole match.
    pub fn span(&self) -> Option<(usize, usize)> {
        self.spans.first().copied().flatten()
    }
}

impl MatchResult for MatchSnapshot<'_> {
    fn bounds<'a>(&self, group: impl Into<GroupRef<'a>>) -> Result<Option<(usize, usize)>, Error> {
        resolve(
            self.pattern,
            group.into(),
            (self.offset, self.end),
            |slot| self.spans.get(slot).copied().flatten(),
        )
    }

    fn text(&self) -> &[char] {
        &self.text
    }

    fn target_start(&self) -> usize {
        self.offset
    }

    fn target_end(&self) -> usize {
        self.end
    }

    fn group_count(&self) -> usize {
        self.pattern.group_count()
    }
}

impl fmt::Display for MatchSnapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span() {
            Some((s, e)) => {
                for c in &self.text[s..e] {
                    write!(f, "{}", c)?;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}
