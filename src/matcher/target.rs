//! Binding a matcher to its target text.

use std::io::Read;
use std::sync::Arc;

use super::{unassigned, GroupRef, MatchResult, Matcher, Window};
use crate::Error;

impl<'p> Matcher<'p> {
    pub fn set_target(&mut self, text: &str) {
        self.load(text.chars());
        self.bind(0, self.text.len());
    }

    /// Target `len` chars of `text` starting at char `start`. Anchors and
    /// boundaries see the chars outside the range as absent.
    pub fn set_target_range(&mut self, text: &str, start: usize, len: usize) {
        self.load(text.chars());
        let n = self.text.len();
        let start = start.min(n);
        let end = start.saturating_add(len).min(n);
        self.bind(start, end);
    }

    pub fn set_target_chars(&mut self, text: &[char]) {
        self.load(text.iter().copied());
        self.bind(0, self.text.len());
    }

    /// Read the target from `reader`, keeping at most `limit` chars.
    pub fn set_target_reader<R: Read>(
        &mut self,
        mut reader: R,
        limit: Option<usize>,
    ) -> Result<(), Error> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        self.load(buf.chars().take(limit.unwrap_or(usize::MAX)));
        self.bind(0, self.text.len());
        tracing::trace!(chars = self.text.len(), "loaded target from reader");
        Ok(())
    }

    /// Target a group of another matcher's current match, sharing its buffer.
    pub fn set_target_from<'a>(
        &mut self,
        other: &Matcher<'_>,
        group: impl Into<GroupRef<'a>>,
    ) -> Result<(), Error> {
        let group = group.into();
        let (start, end) = other.bounds(group)?.ok_or_else(|| unassigned(group))?;
        self.text = Arc::clone(&other.text);
        self.bind(start, end);
        Ok(())
    }

    /// Narrow the target to a group of this matcher's current match.
    pub fn set_target_group<'a>(&mut self, group: impl Into<GroupRef<'a>>) -> Result<(), Error> {
        let group = group.into();
        let (start, end) = self.bounds(group)?.ok_or_else(|| unassigned(group))?;
        self.bind(start, end);
        Ok(())
    }

    /// Replace the buffer contents, in place unless another owner holds it.
    fn load(&mut self, chars: impl Iterator<Item = char>) {
        match Arc::get_mut(&mut self.text) {
            Some(buf) => {
                buf.clear();
                buf.extend(chars);
            }
            None => self.text = Arc::new(chars.collect()),
        }
    }

    fn bind(&mut self, offset: usize, end: usize) {
        self.window = Window {
            offset,
            end,
            w_offset: offset,
            w_end: None,
        };
        self.flush();
    }
}
