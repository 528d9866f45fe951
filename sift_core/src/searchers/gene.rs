use super::database::{EXACT_MATCH_SCORE, INEXACT_MATCH_SCORE};
use super::{soften, SearchContext};
use crate::accumulator::ResultAccumulator;
use crate::error::SourceError;
use crate::model::{EntityId, EntityKind, ResultSource, SearchResult, SearchSettings};
use crate::query::{self, QueryExpr};
use crate::sources::{Criteria, MatchField};
use tracing::debug;

/// Staged gene lookup.
///
/// Database stages run in precedence order and each one only runs when every
/// earlier stage came back empty:
///
/// 1. NCBI id (numeric query) or Ensembl id
/// 2. official symbol
/// 3. official symbol pattern, subject to [`symbol_pattern`]
/// 4. alias, gene product and sequence accession
///
/// Index hits are added unless the caller asked to return on a database hit.
/// Probe and phenotype associations are consulted only when nothing else
/// matched.
pub struct GeneSearcher<'a> {
    ctx: &'a SearchContext,
}

impl<'a> GeneSearcher<'a> {
    pub fn new(ctx: &'a SearchContext) -> Self {
        Self { ctx }
    }

    pub async fn search(
        &self,
        settings: &SearchSettings,
        expr: &QueryExpr,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let Some(text) = query::rewrite_for_exact_match(expr, false) else {
            return Ok(Vec::new());
        };

        let acc = ResultAccumulator::new();
        if settings.use_database {
            acc.extend(soften(self.search_database(expr, &text).await, "gene database"));
        }

        if settings.return_on_db_hit && !acc.is_empty() {
            debug!(target: "sift::searchers", query = %text, hits = acc.len(), "Gene found in database, skipping index");
            return Ok(acc.snapshot());
        }

        if settings.use_index {
            acc.extend(soften(self.ctx.index().search(EntityKind::Gene, expr).await, "gene index"));
        }

        if acc.is_empty() && settings.use_database {
            acc.extend(soften(self.from_probes(&text).await, "genes from probes"));
        }

        if acc.is_empty() && settings.use_database {
            acc.extend(soften(self.from_phenotypes(expr, &text).await, "genes from phenotypes"));
        }

        debug!(target: "sift::searchers", query = %text, hits = acc.len(), "Gene search");
        Ok(acc.snapshot())
    }

    async fn search_database(
        &self,
        expr: &QueryExpr,
        text: &str,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let id_field = if text.parse::<u64>().is_ok() {
            MatchField::NcbiId
        } else {
            MatchField::EnsemblId
        };
        let hits = self.exact(id_field, text, EXACT_MATCH_SCORE).await?;
        if !hits.is_empty() {
            return Ok(hits);
        }

        let hits = self.exact(MatchField::OfficialSymbol, text, EXACT_MATCH_SCORE).await?;
        if !hits.is_empty() {
            return Ok(hits);
        }

        let wildcard = query::is_wildcard(expr);
        if let Some(pattern) = query::rewrite_for_exact_match(expr, true)
            .and_then(|like| symbol_pattern(text, &like, wildcard))
        {
            let ids = self
                .ctx
                .store
                .find_inexact(EntityKind::Gene, MatchField::OfficialSymbol, &pattern)
                .await?;
            if !ids.is_empty() {
                return Ok(to_results(ids, MatchField::OfficialSymbol, text, INEXACT_MATCH_SCORE));
            }
        }

        let mut hits = self.exact(MatchField::Alias, text, INEXACT_MATCH_SCORE).await?;
        hits.extend(self.exact(MatchField::GeneProduct, text, INEXACT_MATCH_SCORE).await?);
        hits.extend(self.from_sequence_accession(text).await?);
        Ok(hits)
    }

    async fn exact(
        &self,
        field: MatchField,
        text: &str,
        score: f64,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let ids = self
            .ctx
            .store
            .find_exact(EntityKind::Gene, &Criteria::new(field, text))
            .await?;
        Ok(to_results(ids, field, text, score))
    }

    async fn from_sequence_accession(&self, text: &str) -> Result<Vec<SearchResult>, SourceError> {
        let sequences = self
            .ctx
            .store
            .find_exact(EntityKind::BioSequence, &Criteria::new(MatchField::Accession, text))
            .await?;
        if sequences.is_empty() {
            return Ok(Vec::new());
        }
        let pairs = self
            .ctx
            .store
            .related(EntityKind::BioSequence, &sequences, EntityKind::Gene)
            .await?;
        Ok(pairs
            .into_iter()
            .map(|(_, gene)| {
                SearchResult::new(EntityKind::Gene, gene, INEXACT_MATCH_SCORE, ResultSource::Database)
                    .with_highlight(MatchField::Accession.as_str(), text)
            })
            .collect())
    }

    async fn from_probes(&self, text: &str) -> Result<Vec<SearchResult>, SourceError> {
        let probes = self.ctx.database().search_exact(EntityKind::Probe, text).await?;
        if probes.is_empty() {
            return Ok(Vec::new());
        }
        self.ctx.derived().follow(&probes, EntityKind::Gene).await
    }

    /// Genes associated with phenotypes matching the query, capped to bound fan-out.
    async fn from_phenotypes(
        &self,
        expr: &QueryExpr,
        text: &str,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let mut phenotypes = self
            .ctx
            .database()
            .search_exact(EntityKind::Phenotype, text)
            .await?;
        if phenotypes.is_empty() {
            phenotypes = self.ctx.database().search(EntityKind::Phenotype, expr).await?;
        }
        if phenotypes.is_empty() {
            return Ok(Vec::new());
        }

        let mut genes = self.ctx.derived().follow(&phenotypes, EntityKind::Gene).await?;
        let cap = self.ctx.config.phenotype_gene_cap;
        if genes.len() > cap {
            genes.sort_by(|a, b| b.score().total_cmp(&a.score()).then(a.id.cmp(&b.id)));
            genes.truncate(cap);
        }
        Ok(genes)
    }
}

/// Pattern for the inexact symbol stage, or `None` when the stage is skipped.
///
/// `text` is the literal query, `like` its `LIKE` rendering and `wildcard`
/// whether the query carries unescaped wildcards. Stems of two characters or
/// fewer never fan out and three-character stems only with a wildcard. Longer
/// stems without a wildcard get an implicit trailing `%`.
pub(crate) fn symbol_pattern(text: &str, like: &str, wildcard: bool) -> Option<String> {
    let stem = if wildcard {
        text.trim_end_matches('*')
    } else {
        text
    };
    match stem.chars().count() {
        0..=2 => None,
        _ if wildcard => Some(like.to_string()),
        3 => None,
        _ => Some(format!("{like}%")),
    }
}

fn to_results(ids: Vec<EntityId>, field: MatchField, text: &str, score: f64) -> Vec<SearchResult> {
    ids.into_iter()
        .map(|id| {
            SearchResult::new(EntityKind::Gene, id, score, ResultSource::Database)
                .with_highlight(field.as_str(), text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_pattern_short_stems_stay_exact() {
        assert_eq!(symbol_pattern("ab", "ab", false), None);
        assert_eq!(symbol_pattern("ab*", "ab%", true), None);
        assert_eq!(symbol_pattern("*", "%", true), None);
    }

    #[test]
    fn test_symbol_pattern_three_chars_needs_explicit_wildcard() {
        assert_eq!(symbol_pattern("grn", "grn", false), None);
        assert_eq!(symbol_pattern("grn*", "grn%", true).as_deref(), Some("grn%"));
    }

    #[test]
    fn test_symbol_pattern_long_stems_get_implicit_wildcard() {
        assert_eq!(symbol_pattern("grin", "grin", false).as_deref(), Some("grin%"));
        assert_eq!(symbol_pattern("grin*", "grin%", true).as_deref(), Some("grin%"));
        assert_eq!(
            symbol_pattern("grin_1", "grin\\_1", false).as_deref(),
            Some("grin\\_1%")
        );
    }

    #[test]
    fn test_symbol_pattern_single_char_wildcard_stays_narrow() {
        assert_eq!(symbol_pattern("grin?", "grin_", true).as_deref(), Some("grin_"));
        assert_eq!(symbol_pattern("gr?n1", "gr_n1", true).as_deref(), Some("gr_n1"));
    }

    #[test]
    fn test_symbol_pattern_literal_star_is_not_a_wildcard() {
        // `GRI\*` parses to the literal text `GRI*`.
        assert_eq!(
            symbol_pattern("GRI*", "GRI\\*", false).as_deref(),
            Some("GRI\\*%")
        );
        assert_eq!(symbol_pattern("GR*", "GR\\*", false), None);
    }

    #[test]
    fn test_to_results_tags_field() {
        let results = to_results(vec![3, 4], MatchField::Alias, "NR1", 0.9);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].highlights["alias"], "NR1");
        assert!(results.iter().all(|r| r.kind == EntityKind::Gene));
    }
}
