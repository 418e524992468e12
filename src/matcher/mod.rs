//! Matching a compiled pattern against a target.
//!
//! A [`Matcher`] borrows its [`Pattern`] and owns everything mutable about a
//! search: the target text, the search window and the backtracking state.
//! The target chars sit behind an `Arc` so that a matcher can be pointed at
//! a group of another matcher's match without copying.

mod engine;
mod result;
mod stack;
mod target;
#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

pub use result::{GroupRef, MatchResult, MatchSnapshot};

use crate::{Error, Pattern, SearchOptions};
use stack::Engine;

/// Search bounds over the target buffer, all absolute char indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Window {
    /// Start of the target.
    pub offset: usize,
    /// End of the target.
    pub end: usize,
    /// Where the next search attempt begins.
    pub w_offset: usize,
    /// End of the last match, if it is still current.
    pub w_end: Option<usize>,
}

/// Searches one target with one pattern.
///
/// ```
/// use retrace::{compile, MatchResult};
///
/// let p = compile(r"\w+", "").unwrap();
/// let mut m = p.matcher("one two");
/// let mut words = Vec::new();
/// while m.find() {
///     words.push(m.group(0).unwrap().unwrap());
/// }
/// assert_eq!(words, ["one", "two"]);
/// ```
pub struct Matcher<'p> {
    pattern: &'p Pattern,
    text: Arc<Vec<char>>,
    window: Window,
    engine: Engine,
    /// A search ran since the last reset; `find` must move past it first.
    called: bool,
}

impl<'p> Matcher<'p> {
    /// A matcher with an empty target.
    pub fn new(pattern: &'p Pattern) -> Self {
        Matcher {
            pattern,
            text: Arc::new(Vec::new()),
            window: Window::default(),
            engine: Engine::new(
                pattern.slot_count,
                pattern.counter_count,
                pattern.look_count,
            ),
            called: false,
        }
    }

    pub fn pattern(&self) -> &'p Pattern {
        self.pattern
    }

    /// Find the next match, continuing after the previous one.
    pub fn find(&mut self) -> bool {
        self.find_with(SearchOptions::empty())
    }

    pub fn find_with(&mut self, options: SearchOptions) -> bool {
        if self.called {
            self.skip();
        }
        self.called = true;
        self.search(options)
    }

    /// True if the whole target matches.
    pub fn matches(&mut self) -> bool {
        if self.called {
            self.set_position(0);
        }
        self.called = true;
        self.search(SearchOptions::ANCHOR_START | SearchOptions::ANCHOR_END)
    }

    /// True if the target is a prefix of some match: matching only failed
    /// because the text ran out.
    pub fn matches_prefix(&mut self) -> bool {
        self.set_position(0);
        self.called = true;
        self.search(
            SearchOptions::ANCHOR_START
                | SearchOptions::ACCEPT_INCOMPLETE
                | SearchOptions::ANCHOR_END,
        )
    }

    /// Look for another way to match from the current position. Unlike
    /// [`find`](Matcher::find) this does not skip past the last match, so it
    /// enumerates overlapping and alternative matches.
    pub fn proceed(&mut self) -> bool {
        self.proceed_with(SearchOptions::empty())
    }

    pub fn proceed_with(&mut self, options: SearchOptions) -> bool {
        // nothing left to resume: the next attempt starts one char later
        if self.called && self.engine.is_idle() {
            self.window.w_offset += 1;
        }
        self.called = true;
        self.search(options)
    }

    /// Move the search window past the last match.
    ///
    /// After an empty match the window moves one char, unless the match
    /// still has alternatives to try from the same start.
    pub fn skip(&mut self) {
        let Some(w_end) = self.window.w_end else {
            return;
        };
        if w_end != self.window.w_offset {
            self.window.w_offset = w_end;
            self.flush();
        } else if self.engine.is_idle() {
            self.window.w_offset += 1;
            self.flush();
        }
    }

    /// Restart searching at `pos` chars into the target.
    pub fn set_position(&mut self, pos: usize) {
        let Window { offset, end, .. } = self.window;
        self.window.w_offset = offset.saturating_add(pos).min(end);
        self.window.w_end = None;
        self.flush();
    }

    /// Make `offset`, an absolute index into the buffer, the start of the
    /// target.
    pub fn set_offset(&mut self, offset: usize) {
        let offset = offset.min(self.window.end);
        self.window.offset = offset;
        self.window.w_offset = offset;
        self.window.w_end = None;
        self.flush();
    }

    /// Iterate over successive matches.
    pub fn find_iter(&mut self) -> FindIter<'_, 'p> {
        FindIter { matcher: self }
    }

    /// Count the remaining matches, consuming them.
    pub fn count_matches(&mut self) -> usize {
        let mut n = 0;
        while self.find() {
            n += 1;
        }
        n
    }

    /// True if the target buffer is shared with another matcher or snapshot.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.text) > 1
    }

    /// Capture the current match so the matcher can move on.
    pub fn snapshot(&self) -> MatchSnapshot<'p> {
        MatchSnapshot::new(
            self.pattern,
            Arc::clone(&self.text),
            self.window.offset,
            self.window.end,
            self.engine.spans(),
        )
    }

    fn flush(&mut self) {
        self.engine.flush();
        self.called = false;
    }
}

impl fmt::Debug for Matcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("pattern", &self.pattern.source())
            .field("window", &self.window)
            .field("pending", &self.engine.depth())
            .finish()
    }
}

/// Iterator over the matches of a [`Matcher`], see [`Matcher::find_iter`].
pub struct FindIter<'m, 'p> {
    matcher: &'m mut Matcher<'p>,
}

impl<'p> Iterator for FindIter<'_, 'p> {
    type Item = MatchSnapshot<'p>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.matcher.find() {
            Some(self.matcher.snapshot())
        } else {
            None
        }
    }
}

/// Name a group reference in error messages.
pub(crate) fn unassigned(group: GroupRef<'_>) -> Error {
    Error::Unassigned(group.to_string())
}
