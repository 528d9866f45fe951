//! Search orchestration.
//!
//! [`SearchService`] is the entry point of the crate. A request is resolved
//! either as an ontology URI or as free text, the results of every retrieval
//! step are accreted, and the accumulated set is filtered by taxon, bucketed
//! per kind, capped and optionally hydrated.

mod pipeline;
mod taxon;

use crate::accumulator::ResultAccumulator;
use crate::config::SearchConfig;
use crate::error::{SearchError, SourceError};
use crate::model::{Entity, EntityKind, SearchResult, SearchSettings, Taxon};
use crate::ontology::{ChildTermCache, OntologyTermExpander};
use crate::query::{self, QueryExpr};
use crate::searchers::{is_uri, SearchContext};
use crate::sources::{CharacteristicStore, EntityStore, FullTextIndex, OntologyProvider};
use pipeline::Resolution;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, warn};

// ============================================================================
// SearchResponse
// ============================================================================

/// Ranked results per entity kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub query: String,

    /// Buckets sorted by descending score; kinds without results are absent.
    pub results: BTreeMap<EntityKind, Vec<SearchResult>>,

    /// The taxon results were restricted to, given or inferred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,

    /// The deadline elapsed and only partial results are included.
    pub timed_out: bool,

    pub duration_ms: u64,
}

impl SearchResponse {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Default::default()
        }
    }

    pub fn get(&self, kind: EntityKind) -> &[SearchResult] {
        self.results.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of results across all kinds.
    pub fn total(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

enum Plan {
    Uri(String),
    FreeText { expr: QueryExpr, stripped: QueryExpr },
}

// ============================================================================
// SearchService
// ============================================================================

/// Federated entity search over the configured sources.
///
/// Cheap to share behind an `Arc`; concurrent searches share the child-term
/// cache and nothing else.
pub struct SearchService {
    ctx: SearchContext,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        index: Arc<dyn FullTextIndex>,
        ontology: Arc<dyn OntologyProvider>,
        characteristics: Arc<dyn CharacteristicStore>,
        config: SearchConfig,
    ) -> Self {
        let cache = Arc::new(ChildTermCache::new(config.child_cache_capacity));
        Self {
            ctx: SearchContext {
                store,
                index,
                characteristics,
                expander: OntologyTermExpander::new(ontology, cache),
                config: Arc::new(config),
            },
        }
    }

    /// Uses `cache` for ontology children instead of a private one.
    pub fn with_cache(mut self, cache: Arc<ChildTermCache>) -> Self {
        let provider = Arc::clone(self.ctx.expander.provider());
        self.ctx.expander = OntologyTermExpander::new(provider, cache);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.ctx.config
    }

    pub fn cache(&self) -> &Arc<ChildTermCache> {
        self.ctx.expander.cache()
    }

    pub fn supported_kinds(&self) -> BTreeSet<EntityKind> {
        EntityKind::ALL.into_iter().collect()
    }

    /// Runs a search.
    ///
    /// Only an unparseable query (even after escaping) or invalid settings are
    /// errors. Failing sources contribute nothing, and an elapsed deadline
    /// returns what was found so far with `timed_out` set.
    pub async fn search(&self, settings: &SearchSettings) -> Result<SearchResponse, SearchError> {
        let start = Instant::now();
        if settings.kinds.is_empty() {
            return Err(SearchError::InvalidSettings(
                "at least one entity kind must be requested".to_string(),
            ));
        }

        let query_text = settings.query.trim();
        let mut response = SearchResponse::new(query_text);

        let term_uri = settings
            .term_uri
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let plan = match term_uri {
            Some(uri) => Plan::Uri(uri.to_string()),
            None if is_uri(query_text) => Plan::Uri(query_text.to_string()),
            None => {
                if query_text.is_empty() {
                    debug!(target: "sift::service", "Blank query");
                    return Ok(response);
                }
                let parsed = query::parse_with_fallback(query_text)?;
                let Some(stripped) = query::strip_short_terms(&parsed.expr) else {
                    debug!(target: "sift::service", query = query_text, "Nothing left after removing short terms");
                    return Ok(response);
                };
                Plan::FreeText {
                    expr: parsed.expr,
                    stripped,
                }
            }
        };

        let taxon = match (&settings.taxon, &plan) {
            (Some(taxon), _) => Some(taxon.clone()),
            (None, Plan::FreeText { .. }) => {
                taxon::infer_taxon(
                    self.ctx.store.as_ref(),
                    query_text,
                    self.ctx.config.max_terms_for_taxon_inference,
                )
                .await
            }
            (None, Plan::Uri(_)) => None,
        };

        let acc = ResultAccumulator::new();
        let resolution = Resolution::new(&self.ctx, settings, &acc);
        let work = async {
            match &plan {
                Plan::Uri(uri) => resolution.uri(uri).await,
                Plan::FreeText { expr, stripped } => resolution.free_text(expr, stripped).await,
            }
        };

        response.timed_out = match self.ctx.config.deadline_for(settings.mode) {
            Some(deadline) => match timeout(deadline, work).await {
                Ok(()) => false,
                Err(_) => {
                    warn!(
                        target: "sift::service",
                        query = query_text,
                        deadline_ms = deadline.as_millis() as u64,
                        partial = acc.len(),
                        "Search deadline elapsed, returning partial results"
                    );
                    true
                }
            },
            None => {
                work.await;
                false
            }
        };

        let mut buckets = acc.drain_by_kind();
        buckets.retain(|kind, _| settings.includes(*kind));
        if let Some(taxon) = &taxon {
            self.filter_by_taxon(&mut buckets, taxon, settings.strict_taxon_filter)
                .await;
        }
        for results in buckets.values_mut() {
            rank(results, settings.max_results);
        }
        if settings.fill_results {
            self.hydrate(&mut buckets).await;
        } else {
            for result in buckets.values_mut().flatten() {
                result.entity = None;
            }
        }
        buckets.retain(|_, results| !results.is_empty());

        response.results = buckets;
        response.taxon = taxon;
        response.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            target: "sift::service",
            query = query_text,
            total = response.total(),
            timed_out = response.timed_out,
            duration_ms = response.duration_ms,
            "Search complete"
        );
        Ok(response)
    }

    /// Runs a search restricted to `kind` and returns the loaded entities in
    /// rank order.
    pub async fn search_for(
        &self,
        settings: &SearchSettings,
        kind: EntityKind,
    ) -> Result<Vec<Entity>, SearchError> {
        let settings = settings
            .clone()
            .with_kinds([kind])
            .with_fill_results(true);
        let mut response = self.search(&settings).await?;
        Ok(response
            .results
            .remove(&kind)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|result| result.entity)
            .collect())
    }

    // ========================================================================
    // Post-processing
    // ========================================================================

    /// Drops results whose taxon differs from `taxon` or is unknown.
    ///
    /// Kinds without a taxon pass through unless `strict` is set.
    async fn filter_by_taxon(
        &self,
        buckets: &mut BTreeMap<EntityKind, Vec<SearchResult>>,
        taxon: &Taxon,
        strict: bool,
    ) {
        for (kind, results) in buckets.iter_mut() {
            if !kind.has_taxon() {
                if strict {
                    debug!(target: "sift::service", %kind, dropped = results.len(), "Kind has no taxon, strict filter");
                    results.clear();
                }
                continue;
            }
            if let Err(e) = self.load_missing(*kind, results).await {
                warn!(
                    target: "sift::service",
                    %kind,
                    taxon = taxon.id,
                    unverifiable = results.iter().filter(|r| r.entity.is_none()).count(),
                    code = e.code_str(),
                    error = %e,
                    "Entity load failed, results without a known taxon are dropped"
                );
            }
            let before = results.len();
            results.retain(|result| {
                result
                    .entity
                    .as_ref()
                    .and_then(|entity| self.ctx.store.taxon_of(entity))
                    .is_some_and(|t| t == *taxon)
            });
            debug!(target: "sift::service", %kind, taxon = taxon.id, removed = before - results.len(), "Taxon filter");
        }
    }

    /// Attaches payloads; results that cannot be loaded are dropped.
    async fn hydrate(&self, buckets: &mut BTreeMap<EntityKind, Vec<SearchResult>>) {
        for (kind, results) in buckets.iter_mut() {
            if let Err(e) = self.load_missing(*kind, results).await {
                warn!(target: "sift::service", %kind, code = e.code_str(), error = %e, "Entity load failed");
            }
            let before = results.len();
            results.retain(|result| result.entity.is_some());
            if results.len() < before {
                debug!(target: "sift::service", %kind, dropped = before - results.len(), "Unresolvable results dropped");
            }
        }
    }

    /// Loads payloads for results that have none; on failure they stay empty.
    async fn load_missing(
        &self,
        kind: EntityKind,
        results: &mut [SearchResult],
    ) -> Result<(), SourceError> {
        let ids: Vec<_> = results
            .iter()
            .filter(|r| r.entity.is_none())
            .map(|r| r.id)
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        let mut loaded: HashMap<_, Entity> = self
            .ctx
            .store
            .load(kind, &ids)
            .await?
            .into_iter()
            .filter(|entity| entity.kind() == kind)
            .map(|entity| (entity.id(), entity))
            .collect();
        for result in results.iter_mut().filter(|r| r.entity.is_none()) {
            result.entity = loaded.remove(&result.id);
        }
        Ok(())
    }
}

/// Sorts by descending score, ties by ascending id, and applies the cap.
fn rank(results: &mut Vec<SearchResult>, max_results: usize) {
    results.sort_by(|a, b| b.score().total_cmp(&a.score()).then(a.id.cmp(&b.id)));
    if max_results > 0 {
        results.truncate(max_results);
    }
}
