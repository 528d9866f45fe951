use super::{ChildTermCache, OntologyTerm};
use crate::sources::OntologyProvider;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Computes descendant closures of ontology terms.
#[derive(Clone)]
pub struct OntologyTermExpander {
    provider: Arc<dyn OntologyProvider>,
    cache: Arc<ChildTermCache>,
}

impl OntologyTermExpander {
    pub fn new(provider: Arc<dyn OntologyProvider>, cache: Arc<ChildTermCache>) -> Self {
        Self { provider, cache }
    }

    pub fn provider(&self) -> &Arc<dyn OntologyProvider> {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<ChildTermCache> {
        &self.cache
    }

    /// Direct children of `term`, served from the cache when possible.
    ///
    /// Provider errors degrade to no children and are not cached.
    pub async fn direct_children(&self, term: &OntologyTerm) -> Arc<Vec<OntologyTerm>> {
        let Some(uri) = term.uri() else {
            warn!(target: "sift::ontology", label = %term.label, "Term has no URI, cannot fetch children");
            return Arc::new(Vec::new());
        };

        if let Some(children) = self.cache.get(uri) {
            return children;
        }

        match self.provider.children(term, true).await {
            Ok(children) => {
                debug!(target: "sift::ontology", uri, count = children.len(), "Cached child terms");
                self.cache.insert(uri, children)
            }
            Err(e) => {
                warn!(target: "sift::ontology", uri, error = %e, "Failed to fetch child terms");
                Arc::new(Vec::new())
            }
        }
    }

    /// Breadth-first closure of `seeds` and all their descendants.
    ///
    /// Each URI appears once, in discovery order. Terms without a URI are
    /// left out. Each level's children are fetched concurrently.
    pub async fn closure(&self, seeds: &[OntologyTerm]) -> Vec<OntologyTerm> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut closure = Vec::new();
        let mut frontier = Vec::new();

        for seed in seeds {
            if let Some(uri) = seed.uri() {
                if visited.insert(uri.to_string()) {
                    closure.push(seed.clone());
                    frontier.push(seed.clone());
                }
            }
        }

        while !frontier.is_empty() {
            let fetched =
                futures::future::join_all(frontier.iter().map(|t| self.direct_children(t))).await;

            let mut next = Vec::new();
            for children in fetched {
                for child in children.iter() {
                    let Some(uri) = child.uri() else { continue };
                    if visited.insert(uri.to_string()) {
                        closure.push(child.clone());
                        next.push(child.clone());
                    }
                }
            }
            frontier = next;
        }

        debug!(target: "sift::ontology", seeds = seeds.len(), size = closure.len(), "Expanded term closure");
        closure
    }

    /// URIs of [`closure`](Self::closure).
    pub async fn closure_uris(&self, seeds: &[OntologyTerm]) -> Vec<String> {
        self.closure(seeds)
            .await
            .into_iter()
            .filter_map(|t| t.uri)
            .collect()
    }
}
