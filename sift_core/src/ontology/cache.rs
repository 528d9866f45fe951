use super::OntologyTerm;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Bounded, process-wide cache of direct child terms keyed by parent URI.
///
/// Concurrent misses for the same URI may both populate the entry; the last
/// write wins and both values are equivalent.
pub struct ChildTermCache {
    entries: Mutex<LruCache<String, Arc<Vec<OntologyTerm>>>>,
}

impl ChildTermCache {
    /// Create a cache holding at most `capacity` parent terms (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, uri: &str) -> Option<Arc<Vec<OntologyTerm>>> {
        self.entries.lock().get(uri).cloned()
    }

    pub fn insert(&self, uri: impl Into<String>, children: Vec<OntologyTerm>) -> Arc<Vec<OntologyTerm>> {
        let children = Arc::new(children);
        self.entries.lock().put(uri.into(), Arc::clone(&children));
        children
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.lock().contains(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl std::fmt::Debug for ChildTermCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildTermCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
