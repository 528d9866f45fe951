use super::SearchContext;
use crate::error::SourceError;
use crate::model::{EntityKind, ResultSource, SearchResult};
use crate::query::QueryExpr;
use crate::sources::IndexHit;
use tracing::debug;

/// Full-text index lookups.
pub struct IndexSearcher<'a> {
    ctx: &'a SearchContext,
}

impl<'a> IndexSearcher<'a> {
    pub fn new(ctx: &'a SearchContext) -> Self {
        Self { ctx }
    }

    /// Searches the index for `kind` with the full boolean expression.
    pub async fn search(
        &self,
        kind: EntityKind,
        expr: &QueryExpr,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let hits = self.ctx.index.search(kind, expr).await?;
        debug!(target: "sift::searchers", %kind, hits = hits.len(), "Index search");
        Ok(normalize(kind, hits, self.ctx.config.index_hit_penalty))
    }
}

/// Scales raw index scores into `[0, penalty]` so that index hits always rank
/// below exact database matches.
pub(crate) fn normalize(kind: EntityKind, hits: Vec<IndexHit>, penalty: f64) -> Vec<SearchResult> {
    let max = hits
        .iter()
        .map(|h| h.score)
        .filter(|s| s.is_finite())
        .fold(0.0_f64, f64::max);

    hits.into_iter()
        .map(|hit| {
            let relative = if max > 0.0 { hit.score / max } else { 0.0 };
            SearchResult::new(kind, hit.id, relative * penalty, ResultSource::Index)
                .with_highlights(hit.highlights)
        })
        .collect()
}
