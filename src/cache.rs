//! A thread-safe cache of compiled patterns.
//!
//! Lookups load the current map through an `ArcSwap` and never block.
//! A miss compiles under the build lock, copies the map with the new entry
//! and swaps it in, so readers always see a complete snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{Error, Flags, IntoFlags, Pattern};

type PatternMap = FxHashMap<(String, Flags), Arc<Pattern>>;

/// Compiled patterns keyed by source and flags.
pub struct PatternCache {
    patterns: ArcSwap<PatternMap>,
    /// Serializes writers; readers go through `patterns` only.
    build_lock: Mutex<()>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self {
            patterns: ArcSwap::from_pointee(PatternMap::default()),
            build_lock: Mutex::new(()),
        }
    }

    /// The compiled pattern for `source`, compiling it on first use.
    pub fn get(&self, source: &str, flags: impl IntoFlags) -> Result<Arc<Pattern>, Error> {
        let flags = flags.into_flags()?;
        let key = (source.to_string(), flags);
        if let Some(p) = self.patterns.load().get(&key) {
            return Ok(Arc::clone(p));
        }

        let _guard = self.build_lock.lock();
        // another thread may have built it while we waited
        let current = self.patterns.load_full();
        if let Some(p) = current.get(&key) {
            return Ok(Arc::clone(p));
        }

        let pattern = Arc::new(Pattern::compile(source, flags)?);
        let mut next = PatternMap::clone(&current);
        next.insert(key, Arc::clone(&pattern));
        tracing::debug!(source, cached = next.len(), "pattern cache miss");
        self.patterns.store(Arc::new(next));
        Ok(pattern)
    }

    pub fn len(&self) -> usize {
        self.patterns.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.load().is_empty()
    }

    /// Drop every cached pattern. Patterns already handed out stay valid.
    pub fn clear(&self) {
        let _guard = self.build_lock.lock();
        self.patterns.store(Arc::new(PatternMap::default()));
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_reuses_compiled_pattern() {
        let cache = PatternCache::new();
        assert!(cache.is_empty());
        let a = cache.get("a+b", "").unwrap();
        let b = cache.get("a+b", Flags::empty()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        let c = cache.get("a+b", "i").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = PatternCache::new();
        assert!(cache.get("(", "").is_err());
        assert!(cache.get("a", "?").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_keeps_handed_out_patterns() {
        let cache = PatternCache::default();
        let p = cache.get("x", "").unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(p.matches("x"));
    }

    #[test]
    fn test_concurrent_get() {
        let cache = Arc::new(PatternCache::new());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let src = format!("n{}|shared", n % 2);
                    let p = cache.get(&src, "").unwrap();
                    let mut m = p.matcher("a shared word");
                    m.find()
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(cache.len(), 2);
    }
}
