use super::SearchContext;
use crate::error::SourceError;
use crate::model::{EntityKind, ResultSource, SearchResult};
use crate::query::{self, QueryExpr};
use crate::sources::{Criteria, MatchField};
use tracing::debug;

/// Score of an exact id, accession, short-name or symbol match.
pub const EXACT_MATCH_SCORE: f64 = 1.0;

/// Score of an exact full-name match.
pub const NAME_MATCH_SCORE: f64 = 0.95;

/// Score of an alias, product-name or pattern match.
pub const INEXACT_MATCH_SCORE: f64 = 0.9;

/// Exact-match fields per kind in precedence order.
///
/// Genes are handled by [`GeneSearcher`](super::GeneSearcher).
fn exact_fields(kind: EntityKind) -> &'static [(MatchField, f64)] {
    match kind {
        EntityKind::Experiment => &[
            (MatchField::ShortName, EXACT_MATCH_SCORE),
            (MatchField::Accession, EXACT_MATCH_SCORE),
            (MatchField::Name, NAME_MATCH_SCORE),
            (MatchField::Id, EXACT_MATCH_SCORE),
        ],
        EntityKind::Platform => &[
            (MatchField::ShortName, EXACT_MATCH_SCORE),
            (MatchField::Name, NAME_MATCH_SCORE),
        ],
        EntityKind::Probe => &[(MatchField::Name, EXACT_MATCH_SCORE)],
        EntityKind::BioSequence => &[
            (MatchField::Name, EXACT_MATCH_SCORE),
            (MatchField::Accession, EXACT_MATCH_SCORE),
        ],
        EntityKind::GeneSet | EntityKind::ExperimentSet | EntityKind::Phenotype => {
            &[(MatchField::Name, NAME_MATCH_SCORE)]
        }
        EntityKind::Publication => &[
            (MatchField::Accession, EXACT_MATCH_SCORE),
            (MatchField::Title, NAME_MATCH_SCORE),
        ],
        EntityKind::Gene | EntityKind::Characteristic => &[],
    }
}

/// Pattern-match fields per kind; all of them are consulted together.
fn inexact_fields(kind: EntityKind) -> &'static [(MatchField, f64)] {
    match kind {
        EntityKind::Experiment => &[
            (MatchField::ShortName, INEXACT_MATCH_SCORE),
            (MatchField::Name, INEXACT_MATCH_SCORE),
        ],
        EntityKind::Platform => &[
            (MatchField::AlternateName, INEXACT_MATCH_SCORE),
            (MatchField::Manufacturer, INEXACT_MATCH_SCORE),
        ],
        EntityKind::GeneSet | EntityKind::ExperimentSet | EntityKind::Phenotype => {
            &[(MatchField::Name, INEXACT_MATCH_SCORE)]
        }
        EntityKind::Publication => &[(MatchField::Title, INEXACT_MATCH_SCORE)],
        EntityKind::Gene
        | EntityKind::Probe
        | EntityKind::BioSequence
        | EntityKind::Characteristic => &[],
    }
}

/// Exact and pattern lookups against the relational store.
pub struct DatabaseSearcher<'a> {
    ctx: &'a SearchContext,
}

impl<'a> DatabaseSearcher<'a> {
    pub fn new(ctx: &'a SearchContext) -> Self {
        Self { ctx }
    }

    /// Searches `kind` using only the first non-prohibited clause of `expr`.
    ///
    /// Exact fields are tried in precedence order and the first one with hits
    /// wins. Pattern fields only run when no exact field matched.
    pub async fn search(
        &self,
        kind: EntityKind,
        expr: &QueryExpr,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let Some(text) = query::rewrite_for_exact_match(expr, false) else {
            return Ok(Vec::new());
        };

        if !query::is_wildcard(expr) {
            let exact = self.search_exact(kind, &text).await?;
            if !exact.is_empty() {
                return Ok(exact);
            }
        }

        let Some(pattern) = like_pattern(expr) else {
            return Ok(Vec::new());
        };
        let mut results = Vec::new();
        for (field, score) in inexact_fields(kind) {
            let ids = self.ctx.store.find_inexact(kind, *field, &pattern).await?;
            results.extend(ids.into_iter().map(|id| {
                SearchResult::new(kind, id, *score, ResultSource::Database)
                    .with_highlight(field.as_str(), text.clone())
            }));
        }
        debug!(target: "sift::searchers", %kind, pattern = %pattern, hits = results.len(), "Pattern search");
        Ok(results)
    }

    /// Results of the first exact field producing any hits.
    pub async fn search_exact(
        &self,
        kind: EntityKind,
        text: &str,
    ) -> Result<Vec<SearchResult>, SourceError> {
        for (field, score) in exact_fields(kind) {
            if *field == MatchField::Id && text.parse::<u64>().is_err() {
                continue;
            }
            let ids = self
                .ctx
                .store
                .find_exact(kind, &Criteria::new(*field, text))
                .await?;
            if !ids.is_empty() {
                debug!(target: "sift::searchers", %kind, field = field.as_str(), hits = ids.len(), "Exact match");
                return Ok(ids
                    .into_iter()
                    .map(|id| {
                        SearchResult::new(kind, id, *score, ResultSource::Database)
                            .with_highlight(field.as_str(), text)
                    })
                    .collect());
            }
        }
        Ok(Vec::new())
    }
}

/// SQL `LIKE` pattern for the first clause: wildcards translated when present,
/// otherwise a substring match.
pub(crate) fn like_pattern(expr: &QueryExpr) -> Option<String> {
    let pattern = query::rewrite_for_exact_match(expr, true)?;
    if query::is_wildcard(expr) {
        Some(pattern)
    } else {
        Some(format!("%{pattern}%"))
    }
}
