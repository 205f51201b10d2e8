//! Compiled expression cache
//!
//! Keyed by expression text. Compiled expressions carry no document or
//! namespace state, so entries are shared freely between requests.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use super::compiler::{compile, CompiledExpr};
use crate::error::XPathError;

/// LRU cache of compiled XPath expressions; capacity 0 disables caching
#[derive(Clone)]
pub struct ExpressionCache {
    inner: Option<Arc<Mutex<LruCache<String, Arc<CompiledExpr>>>>>,
}

impl ExpressionCache {
    pub fn new(capacity: usize) -> Self {
        ExpressionCache {
            inner: NonZeroUsize::new(capacity).map(|cap| Arc::new(Mutex::new(LruCache::new(cap)))),
        }
    }

    /// Return the cached compilation of `xpath`, compiling it on a miss.
    /// Syntax errors are not cached.
    pub fn get_or_compile(&self, xpath: &str) -> Result<Arc<CompiledExpr>, XPathError> {
        let Some(cache) = &self.inner else {
            return compile(xpath).map(Arc::new);
        };

        if let Some(hit) = lock(cache).get(xpath) {
            tracing::trace!(xpath, "xpath cache hit");
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(compile(xpath)?);
        lock(cache).put(xpath.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |cache| lock(cache).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("enabled", &self.inner.is_some())
            .field("len", &self.len())
            .finish()
    }
}

/// A panic while holding the lock cannot leave a half-written entry behind,
/// so a poisoned cache is still usable
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_returns_same_compilation() {
        let cache = ExpressionCache::new(4);
        let first = cache.get_or_compile("//item").unwrap();
        let second = cache.get_or_compile("//item").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_eviction() {
        let cache = ExpressionCache::new(2);
        cache.get_or_compile("/a").unwrap();
        cache.get_or_compile("/b").unwrap();
        cache.get_or_compile("/c").unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_errors_not_cached() {
        let cache = ExpressionCache::new(2);
        assert!(cache.get_or_compile("[").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled() {
        let cache = ExpressionCache::new(0);
        let first = cache.get_or_compile("/a").unwrap();
        let second = cache.get_or_compile("/a").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.is_empty());
    }
}
