//! The compiled, immutable pattern.

use std::fmt;
use std::io::Read;

use rustc_hash::FxHashMap;

use crate::charclass::ClassRegistry;
use crate::compiler::{self, Program, TermId};
use crate::matcher::{MatchSnapshot, Matcher};
use crate::optimizer;
use crate::{Error, Flags, IntoFlags};

/// A compiled regular expression.
///
/// A `Pattern` never changes after [`Pattern::compile`] returns, so one
/// instance can back any number of [`Matcher`]s on any number of threads.
///
/// ```
/// use retrace::{Pattern, MatchResult};
///
/// let p = Pattern::compile(r"(?<year>\d{4})-(?<month>\d\d)", "").unwrap();
/// let mut m = p.matcher("due 2024-07");
/// assert!(m.find());
/// assert_eq!(m.group("month").unwrap().as_deref(), Some("07"));
/// ```
pub struct Pattern {
    source: String,
    flags: Flags,
    pub(crate) program: Program,
    /// Entry of the optimized graph.
    pub(crate) root: TermId,
    /// Entry of the graph without the root shortcut, for anchored searches.
    pub(crate) root0: TermId,
    pub(crate) slot_count: usize,
    pub(crate) counter_count: usize,
    pub(crate) look_count: usize,
    pub(crate) start_anchored: bool,
    names: FxHashMap<String, usize>,
}

impl Pattern {
    /// Compile `source` against the shared class registry.
    pub fn compile(source: &str, flags: impl IntoFlags) -> Result<Pattern, Error> {
        Pattern::compile_with(source, flags, ClassRegistry::shared())
    }

    /// Compile `source`, resolving named classes in `registry`.
    pub fn compile_with(
        source: &str,
        flags: impl IntoFlags,
        registry: &ClassRegistry,
    ) -> Result<Pattern, Error> {
        Pattern::build(source, flags.into_flags()?, registry, true)
    }

    /// Compile without skip shortcuts, so searches walk the plain graph.
    #[cfg(test)]
    pub(crate) fn compile_unoptimized(
        source: &str,
        flags: impl IntoFlags,
    ) -> Result<Pattern, Error> {
        Pattern::build(source, flags.into_flags()?, ClassRegistry::shared(), false)
    }

    fn build(
        source: &str,
        flags: Flags,
        registry: &ClassRegistry,
        optimize: bool,
    ) -> Result<Pattern, Error> {
        let mut compiled = compiler::compile(source, flags, registry)?;
        let shortcuts = if optimize {
            optimizer::optimize(&mut compiled.program, compiled.root0, &compiled.repeats)
        } else {
            optimizer::Shortcuts {
                root: compiled.root0,
                start_anchored: false,
            }
        };

        tracing::debug!(
            source,
            flags = %flags.letters(),
            terms = compiled.program.len(),
            groups = compiled.slot_count,
            start_anchored = shortcuts.start_anchored,
            "compiled pattern"
        );

        Ok(Pattern {
            source: source.to_string(),
            flags,
            program: compiled.program,
            root: shortcuts.root,
            root0: compiled.root0,
            slot_count: compiled.slot_count,
            counter_count: compiled.counter_count,
            look_count: compiled.look_count,
            start_anchored: shortcuts.start_anchored,
            names: compiled.names,
        })
    }

    /// A matcher over `text`.
    pub fn matcher(&self, text: &str) -> Matcher<'_> {
        let mut m = Matcher::new(self);
        m.set_target(text);
        m
    }

    /// A matcher over a char buffer.
    pub fn matcher_chars(&self, text: &[char]) -> Matcher<'_> {
        let mut m = Matcher::new(self);
        m.set_target_chars(text);
        m
    }

    /// A matcher over everything `reader` yields.
    pub fn matcher_reader<R: Read>(&self, reader: R) -> Result<Matcher<'_>, Error> {
        let mut m = Matcher::new(self);
        m.set_target_reader(reader, None)?;
        Ok(m)
    }

    /// A matcher with an empty target, to be bound later.
    pub fn empty_matcher(&self) -> Matcher<'_> {
        Matcher::new(self)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Number of capture slots, including group 0.
    pub fn group_count(&self) -> usize {
        self.slot_count
    }

    /// Slot of a named group.
    pub fn group_id(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Group names ordered by slot.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, usize)> =
            self.names.iter().map(|(n, &s)| (n.as_str(), s)).collect();
        names.sort_unstable_by_key(|&(_, slot)| slot);
        names.into_iter().map(|(n, _)| n).collect()
    }

    /// True if the whole of `text` matches.
    pub fn matches(&self, text: &str) -> bool {
        self.matcher(text).matches()
    }

    /// True if `text` is a prefix of some match.
    pub fn starts_with(&self, text: &str) -> bool {
        self.matcher(text).matches_prefix()
    }

    /// The first match in `text`.
    pub fn find_first(&self, text: &str) -> Option<MatchSnapshot<'_>> {
        let mut m = self.matcher(text);
        if m.find() {
            Some(m.snapshot())
        } else {
            None
        }
    }

    /// The term graph, one term per line.
    pub fn dump(&self) -> String {
        self.program
            .dump(&[("root", self.root), ("anchored root", self.root0)])
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("flags", &self.flags)
            .field("groups", &self.slot_count)
            .field("terms", &self.program.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchResult;

    #[test]
    fn test_counts_and_names() {
        let p = Pattern::compile(r"(?<a>x)(y)({b}z)", "").unwrap();
        assert_eq!(p.group_count(), 4);
        assert_eq!(p.group_id("a"), Some(1));
        assert_eq!(p.group_id("b"), Some(3));
        assert_eq!(p.group_id("c"), None);
        assert_eq!(p.group_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_source_flags_display() {
        let p = Pattern::compile("a+b", "is").unwrap();
        assert_eq!(p.source(), "a+b");
        assert_eq!(p.flags(), Flags::IGNORE_CASE | Flags::DOTALL);
        assert_eq!(p.to_string(), "a+b");
        assert!(format!("{:?}", p).contains("a+b"));
    }

    #[test]
    fn test_helpers() {
        let p = Pattern::compile(r"\d+", "").unwrap();
        assert!(p.matches("123"));
        assert!(!p.matches("12a"));
        assert!(p.starts_with("1"));
        let m = p.find_first("ab 42 c").unwrap();
        assert_eq!(m.group(0).unwrap().as_deref(), Some("42"));
        assert!(p.find_first("none").is_none());
    }

    #[test]
    fn test_dump_lists_every_term() {
        let p = Pattern::compile("ab|c", "").unwrap();
        let dump = p.dump();
        assert!(dump.starts_with("root: #"));
        assert!(dump.contains("branch"));
        assert!(dump.contains("success"));
    }

    #[test]
    fn test_custom_registry() {
        let registry = ClassRegistry::new();
        let p = Pattern::compile_with(r"\p{Lu}+", Flags::empty(), &registry).unwrap();
        assert!(p.matches("ABC"));
    }

    #[test]
    fn test_reader_matcher() {
        let p = Pattern::compile("b+", "").unwrap();
        let mut m = p.matcher_reader("abbbc".as_bytes()).unwrap();
        assert!(m.find());
        assert_eq!(m.group(0).unwrap().as_deref(), Some("bbb"));
    }
}
