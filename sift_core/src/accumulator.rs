//! Deduplicating result container.
//!
//! Keyed by `(kind, id)`. For every key the stored result carries the maximum
//! score ever inserted, the union of all highlight maps (later values win per
//! field), and a payload if any insertion carried one. Insertion order does not
//! affect the final state.

use crate::model::{EntityId, EntityKind, SearchResult};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct ResultAccumulator {
    results: Mutex<HashMap<(EntityKind, EntityId), SearchResult>>,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `result`; returns true for a new key or a strictly higher score.
    pub fn add(&self, result: SearchResult) -> bool {
        match self.results.lock().entry(result.key()) {
            Entry::Vacant(slot) => {
                slot.insert(result);
                true
            }
            Entry::Occupied(mut slot) => merge(slot.get_mut(), result),
        }
    }

    /// Adds every result; returns how many changed the stored state.
    pub fn extend(&self, results: impl IntoIterator<Item = SearchResult>) -> usize {
        results.into_iter().map(|r| self.add(r)).filter(|changed| *changed).count()
    }

    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored results of `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.results.lock().keys().filter(|(k, _)| *k == kind).count()
    }

    pub fn get(&self, kind: EntityKind, id: EntityId) -> Option<SearchResult> {
        self.results.lock().get(&(kind, id)).cloned()
    }

    /// Copies of all stored results of `kind`.
    pub fn of_kind(&self, kind: EntityKind) -> Vec<SearchResult> {
        self.results
            .lock()
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Copies of all stored results.
    pub fn snapshot(&self) -> Vec<SearchResult> {
        self.results.lock().values().cloned().collect()
    }

    /// Removes and returns every stored result, partitioned by kind.
    pub fn drain_by_kind(&self) -> BTreeMap<EntityKind, Vec<SearchResult>> {
        let drained: Vec<SearchResult> = self.results.lock().drain().map(|(_, r)| r).collect();
        let mut buckets: BTreeMap<EntityKind, Vec<SearchResult>> = BTreeMap::new();
        for result in drained {
            buckets.entry(result.kind).or_default().push(result);
        }
        buckets
    }
}

fn merge(existing: &mut SearchResult, mut incoming: SearchResult) -> bool {
    if incoming.score() > existing.score() {
        let mut highlights = std::mem::take(&mut existing.highlights);
        highlights.append(&mut incoming.highlights);
        incoming.highlights = highlights;
        if incoming.entity.is_none() {
            incoming.entity = existing.entity.take();
        }
        *existing = incoming;
        true
    } else {
        existing.highlights.append(&mut incoming.highlights);
        if existing.entity.is_none() {
            existing.entity = incoming.entity;
        }
        false
    }
}
