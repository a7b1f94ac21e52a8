//! Lazily evaluated, memoized placeholder values
//!
//! A [PlaceholderStore] maps dotted keys (`commit.short`,
//! `describe.tag.version.patch`) to producers. A producer runs at most once
//! per store; its result is cached for the lifetime of the store. Producers
//! receive the store they are registered in, so derived keys can build on
//! other keys. Producers must not form reference cycles.
//!
//! Stores layer: a child created with [PlaceholderStore::with_parent]
//! shadows parent keys of the same name and sees every other parent key.
//! Parent entries are always evaluated against the parent, so their cached
//! value does not depend on which child asked first.
//!
//! ## Thread Safety
//!
//! Cached values live in `OnceLock` cells: a store is `Sync` and can serve
//! concurrent renders. Two threads racing on the first access of the same key
//! may both run its producer; only one result is kept.

use crate::error::{GitVersioningError, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

type Producer<'a> = Box<dyn Fn(&PlaceholderStore<'_>) -> Result<String> + Send + Sync + 'a>;

struct Entry<'a> {
    producer: Option<Producer<'a>>,
    value: OnceLock<String>,
}

/// Layered map from placeholder keys to memoized values
#[derive(Default)]
pub struct PlaceholderStore<'a> {
    parent: Option<&'a PlaceholderStore<'a>>,
    entries: HashMap<String, Entry<'a>>,
}

impl<'a> PlaceholderStore<'a> {
    /// Create an empty store
    pub fn new() -> Self {
        PlaceholderStore {
            parent: None,
            entries: HashMap::new(),
        }
    }

    /// Create a child store layered over `parent`
    pub fn with_parent(parent: &'a PlaceholderStore<'a>) -> Self {
        PlaceholderStore {
            parent: Some(parent),
            entries: HashMap::new(),
        }
    }

    /// Register a constant value
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = OnceLock::from(value.into());
        self.entries.insert(
            key.into(),
            Entry {
                producer: None,
                value,
            },
        );
    }

    /// Register a value computed on first access
    ///
    /// The producer may read other keys through the store it is given.
    pub fn put_lazy<F>(&mut self, key: impl Into<String>, producer: F)
    where
        F: Fn(&PlaceholderStore<'_>) -> Result<String> + Send + Sync + 'a,
    {
        self.entries.insert(
            key.into(),
            Entry {
                producer: Some(Box::new(producer)),
                value: OnceLock::new(),
            },
        );
    }

    /// Value of `key`, computing it on first access
    ///
    /// # Errors
    /// * `UnknownPlaceholder` - if neither this store nor a parent has `key`
    /// * any error raised by the producer; failed results are not cached
    pub fn get(&self, key: &str) -> Result<&str> {
        let Some(entry) = self.entries.get(key) else {
            return match self.parent {
                Some(parent) => parent.get(key),
                None => Err(GitVersioningError::unknown_placeholder(key)),
            };
        };

        if let Some(value) = entry.value.get() {
            return Ok(value);
        }

        let computed = match &entry.producer {
            Some(producer) => producer(self)?,
            None => String::new(),
        };
        Ok(entry.value.get_or_init(|| computed))
    }

    /// Whether `key` is visible from this store
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key) || self.parent.is_some_and(|p| p.contains(key))
    }

    /// All keys visible from this store, sorted
    pub fn keys(&self) -> BTreeSet<&str> {
        let mut keys = self.parent.map(|p| p.keys()).unwrap_or_default();
        keys.extend(self.entries.keys().map(String::as_str));
        keys
    }

    /// Evaluate `keys` now so later concurrent reads only hit the cache
    pub fn force<'k, I>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = &'k str>,
    {
        for key in keys {
            self.get(key)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PlaceholderStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut own: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        own.sort_unstable();
        f.debug_struct("PlaceholderStore")
            .field("keys", &own)
            .field("parent", &self.parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_constant() {
        let mut store = PlaceholderStore::new();
        store.put("commit", "abc");
        assert_eq!(store.get("commit").unwrap(), "abc");
    }

    #[test]
    fn test_get_unknown_key() {
        let store = PlaceholderStore::new();
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, GitVersioningError::UnknownPlaceholder(key) if key == "missing"));
    }

    #[test]
    fn test_lazy_value_computed_once() {
        let calls = AtomicUsize::new(0);
        let mut store = PlaceholderStore::new();
        store.put_lazy("expensive", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("value".to_string())
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get("expensive").unwrap(), "value");
        assert_eq!(store.get("expensive").unwrap(), "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_value_is_not_cached() {
        let calls = AtomicUsize::new(0);
        let mut store = PlaceholderStore::new();
        store.put_lazy("flaky", |_| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GitVersioningError::invalid_increment("x", 1))
            } else {
                Ok("ok".to_string())
            }
        });

        assert!(store.get("flaky").is_err());
        assert_eq!(store.get("flaky").unwrap(), "ok");
    }

    #[test]
    fn test_derived_key_reads_other_keys() {
        let mut store = PlaceholderStore::new();
        store.put("name", "feature/x");
        store.put_lazy("name.slug", |s| Ok(s.get("name")?.replace('/', "-")));
        assert_eq!(store.get("name.slug").unwrap(), "feature-x");
    }

    #[test]
    fn test_child_shadows_parent() {
        let mut parent = PlaceholderStore::new();
        parent.put("version", "parent");
        parent.put("commit", "abc");

        let mut child = PlaceholderStore::with_parent(&parent);
        child.put("version", "child");

        assert_eq!(child.get("version").unwrap(), "child");
        assert_eq!(child.get("commit").unwrap(), "abc");
        assert_eq!(parent.get("version").unwrap(), "parent");
    }

    #[test]
    fn test_child_derived_key_sees_child_values() {
        let mut parent = PlaceholderStore::new();
        parent.put("base", "1");

        let mut child = PlaceholderStore::with_parent(&parent);
        child.put("suffix", "-rc");
        child.put_lazy("combined", |s| Ok(format!("{}{}", s.get("base")?, s.get("suffix")?)));

        assert_eq!(child.get("combined").unwrap(), "1-rc");
    }

    #[test]
    fn test_keys_and_contains() {
        let mut parent = PlaceholderStore::new();
        parent.put("a", "1");
        let mut child = PlaceholderStore::with_parent(&parent);
        child.put("b", "2");

        assert!(child.contains("a"));
        assert!(child.contains("b"));
        assert!(!parent.contains("b"));
        assert_eq!(child.keys().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_force_surfaces_errors() {
        let mut store = PlaceholderStore::new();
        store.put("ok", "1");
        store.put_lazy("bad", |_| Err(GitVersioningError::invalid_increment("x", 1)));

        assert!(store.force(["ok"]).is_ok());
        assert!(store.force(["ok", "bad"]).is_err());
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        let mut store = PlaceholderStore::new();
        store.put_lazy("value", |_| Ok("shared".to_string()));
        store.force(["value"]).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| assert_eq!(store.get("value").unwrap(), "shared"));
            }
        });
    }
}
