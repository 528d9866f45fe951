use super::{is_uri, join_highlights, soften, SearchContext};
use crate::accumulator::ResultAccumulator;
use crate::error::SourceError;
use crate::model::{Characteristic, Entity, EntityKind, ResultSource, SearchResult};
use crate::ontology::OntologyTerm;
use crate::query::{self, QueryExpr};
use crate::sources::{Annotation, AnnotationOwner};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Provenance marker for experiments matched through a sample annotation.
pub const FROM_BIOMATERIAL: &str = "(from associated BioMaterial)";

/// Provenance marker for experiments matched through a factor value.
pub const FROM_FACTOR_VALUE: &str = "(from associated FactorValue)";

/// Highlight for genes matched through Gene Ontology annotations.
pub const GO_GROUP_HIGHLIGHT: &str = "From GO group";

const DEFAULT_FIELD: &str = "characteristic";

/// Searches entities through their ontology or free-text annotations.
pub struct CharacteristicSearcher<'a> {
    ctx: &'a SearchContext,
}

impl<'a> CharacteristicSearcher<'a> {
    pub fn new(ctx: &'a SearchContext) -> Self {
        Self { ctx }
    }

    /// Resolves `expr` in DNF: terms of one clause are intersected, clauses
    /// are unioned.
    pub async fn search(
        &self,
        kinds: &BTreeSet<EntityKind>,
        expr: &QueryExpr,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let clauses = query::extract_dnf(expr);
        let acc = ResultAccumulator::new();

        for clause in &clauses {
            let per_term =
                join_all(clause.iter().map(|term| self.search_term(kinds, term))).await;

            let mut sets = Vec::with_capacity(per_term.len());
            let mut failed = false;
            for result in per_term {
                match result {
                    Ok(set) => sets.push(set),
                    Err(e) => {
                        warn!(target: "sift::searchers", error = %e, "Characteristic sub-term failed, dropping clause");
                        failed = true;
                    }
                }
            }
            if !failed {
                acc.extend(intersect(sets));
            }
        }

        debug!(target: "sift::searchers", clauses = clauses.len(), hits = acc.len(), "Characteristic search");
        Ok(acc.snapshot())
    }

    /// Entities annotated with `term`, with its ontology descendants, or with
    /// free text containing it.
    pub async fn search_term(
        &self,
        kinds: &BTreeSet<EntityKind>,
        term: &str,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let text: String = term.chars().filter(|c| *c != '*' && *c != '?').collect();
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.ctx.expander.provider();
        let seeds: Vec<OntologyTerm> = if is_uri(text) {
            soften(provider.resolve_by_uri(text).await, "resolve_by_uri")
                .into_iter()
                .collect()
        } else {
            soften(provider.find_terms_by_label(text).await, "find_terms_by_label")
        };

        let direct: HashSet<String> = seeds
            .iter()
            .filter_map(|t| t.uri().map(str::to_string))
            .collect();
        let mut uris = self.ctx.expander.closure_uris(&seeds).await;
        if is_uri(text) && !direct.contains(text) {
            uris.push(text.to_string());
        }

        let mut scored = self.by_uri(kinds, &uris, &direct).await?;
        if !is_uri(text) {
            let penalty = self.ctx.config.child_term_penalty;
            let by_value = self.ctx.characteristics.find_by_value(kinds, text).await?;
            scored.extend(by_value.into_iter().map(|a| {
                let score = if a.value.eq_ignore_ascii_case(text) {
                    1.0
                } else {
                    penalty
                };
                (a, score)
            }));
        }

        self.to_results(kinds, scored).await
    }

    /// Entities annotated with any of `uris`.
    ///
    /// Annotations on a URI in `direct` score 1.0, others the child-term penalty.
    pub async fn annotated_with(
        &self,
        kinds: &BTreeSet<EntityKind>,
        uris: &[String],
        direct: &HashSet<String>,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let scored = self.by_uri(kinds, uris, direct).await?;
        self.to_results(kinds, scored).await
    }

    /// Genes annotated with Gene Ontology terms whose label matches `text`.
    pub async fn genes_by_go_terms(&self, text: &str) -> Result<Vec<SearchResult>, SourceError> {
        let terms: Vec<OntologyTerm> = self
            .ctx
            .expander
            .provider()
            .find_terms_by_label(text)
            .await?
            .into_iter()
            .filter(|t| t.is_gene_ontology())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let uris = self.ctx.expander.closure_uris(&terms).await;
        let kinds = BTreeSet::from([EntityKind::Gene]);
        let annotations = self.ctx.characteristics.find_by_uri(&kinds, &uris).await?;
        let owners = self.ctx.characteristics.parents_of(&annotations).await?;
        let penalty = self.ctx.config.indirect_hit_penalty;

        let acc = ResultAccumulator::new();
        for annotation in &annotations {
            if let Some(AnnotationOwner::Entity {
                kind: EntityKind::Gene,
                id,
            }) = owners.get(&annotation.id)
            {
                acc.add(
                    SearchResult::new(EntityKind::Gene, *id, penalty, ResultSource::Ontology)
                        .with_highlight("go", GO_GROUP_HIGHLIGHT),
                );
            }
        }
        Ok(acc.snapshot())
    }

    async fn by_uri(
        &self,
        kinds: &BTreeSet<EntityKind>,
        uris: &[String],
        direct: &HashSet<String>,
    ) -> Result<Vec<(Annotation, f64)>, SourceError> {
        if uris.is_empty() {
            return Ok(Vec::new());
        }
        let penalty = self.ctx.config.child_term_penalty;
        let annotations = self.ctx.characteristics.find_by_uri(kinds, uris).await?;
        Ok(annotations
            .into_iter()
            .map(|a| {
                let score = match a.value_uri.as_deref() {
                    Some(uri) if direct.contains(uri) => 1.0,
                    _ => penalty,
                };
                (a, score)
            })
            .collect())
    }

    /// Maps scored annotations to results on their owners.
    async fn to_results(
        &self,
        kinds: &BTreeSet<EntityKind>,
        scored: Vec<(Annotation, f64)>,
    ) -> Result<Vec<SearchResult>, SourceError> {
        if scored.is_empty() {
            return Ok(Vec::new());
        }

        // Keep the best score per annotation.
        let mut best: HashMap<u64, (Annotation, f64)> = HashMap::new();
        for (annotation, score) in scored {
            let better = best
                .get(&annotation.id)
                .map_or(true, |(_, existing)| score > *existing);
            if better {
                best.insert(annotation.id, (annotation, score));
            }
        }

        let annotations: Vec<Annotation> = best.values().map(|(a, _)| a.clone()).collect();
        let owners = self.ctx.characteristics.parents_of(&annotations).await?;
        let indirect = self.ctx.config.indirect_hit_penalty;

        let acc = ResultAccumulator::new();
        for (annotation, score) in best.into_values() {
            let field = annotation
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_FIELD.to_string());

            if kinds.contains(&EntityKind::Characteristic) {
                acc.add(
                    SearchResult::from_entity(
                        Entity::Characteristic(Characteristic {
                            id: annotation.id,
                            category: annotation.category.clone(),
                            value: annotation.value.clone(),
                            value_uri: annotation.value_uri.clone(),
                        }),
                        score,
                        ResultSource::Characteristic,
                    )
                    .with_highlight(field.clone(), annotation.value.clone()),
                );
            }

            let Some(owner) = owners.get(&annotation.id) else {
                continue;
            };
            if !kinds.contains(&owner.result_kind()) {
                continue;
            }
            let result = match *owner {
                AnnotationOwner::Entity { kind, id } => {
                    SearchResult::new(kind, id, score, ResultSource::Characteristic)
                        .with_highlight(field, annotation.value)
                }
                AnnotationOwner::BioMaterial { experiment, .. } => SearchResult::new(
                    EntityKind::Experiment,
                    experiment,
                    score * indirect,
                    ResultSource::Characteristic,
                )
                .with_highlight(field, format!("{} {}", annotation.value, FROM_BIOMATERIAL)),
                AnnotationOwner::FactorValue { experiment, .. } => SearchResult::new(
                    EntityKind::Experiment,
                    experiment,
                    score * indirect,
                    ResultSource::Characteristic,
                )
                .with_highlight(field, format!("{} {}", annotation.value, FROM_FACTOR_VALUE)),
            };
            acc.add(result);
        }
        Ok(acc.snapshot())
    }
}

/// Keeps results present in every set.
///
/// A retained result takes the lowest score among the sets, the highlights of
/// every set (comma-joined per field, in set order) and any available payload.
pub(crate) fn intersect(sets: Vec<Vec<SearchResult>>) -> Vec<SearchResult> {
    let mut sets = sets.into_iter();
    let Some(first) = sets.next() else {
        return Vec::new();
    };

    let mut retained: Vec<SearchResult> = dedupe(first);
    for set in sets {
        let other: HashMap<_, SearchResult> = dedupe(set).into_iter().map(|r| (r.key(), r)).collect();
        retained = retained
            .into_iter()
            .filter_map(|mut result| {
                let matching = other.get(&result.key())?;
                if matching.score() < result.score() {
                    result = result.with_score(matching.score());
                }
                join_highlights(&mut result, matching);
                if result.entity.is_none() {
                    result.entity = matching.entity.clone();
                }
                Some(result)
            })
            .collect();
    }
    retained
}

fn dedupe(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let acc = ResultAccumulator::new();
    acc.extend(results);
    let mut deduped = acc.snapshot();
    deduped.sort_by_key(|r| r.key());
    deduped
}
