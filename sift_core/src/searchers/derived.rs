use super::SearchContext;
use crate::accumulator::ResultAccumulator;
use crate::error::SourceError;
use crate::model::{Entity, EntityId, EntityKind, ResultSource, SearchResult};
use crate::sources::AnnotationOwner;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Characteristic URIs of the form `http://ncbi_gene/<ncbi id>` tag entities
/// with a gene.
pub const NCBI_GENE_URI_PREFIX: &str = "http://ncbi_gene/";

/// Results inherited from related entities, scored below direct matches.
pub struct DerivedSearcher<'a> {
    ctx: &'a SearchContext,
}

impl<'a> DerivedSearcher<'a> {
    pub fn new(ctx: &'a SearchContext) -> Self {
        Self { ctx }
    }

    /// Follows store relations from `sources` to entities of `to`.
    ///
    /// Each derived result takes the best originating score times the
    /// indirect penalty and is tagged `(from associated <Kind>)`.
    pub async fn follow(
        &self,
        sources: &[SearchResult],
        to: EntityKind,
    ) -> Result<Vec<SearchResult>, SourceError> {
        let acc = ResultAccumulator::new();
        let penalty = self.ctx.config.indirect_hit_penalty;

        for (from, group) in group_by_kind(sources) {
            let ids: Vec<EntityId> = group.keys().copied().collect();
            let pairs = self.ctx.store.related(from, &ids, to).await?;
            let marker = provenance(from);
            for (from_id, to_id) in pairs {
                let Some(origin) = group.get(&from_id) else {
                    continue;
                };
                let text = match origin.highlights.values().next() {
                    Some(first) => format!("{first} {marker}"),
                    None => marker.clone(),
                };
                acc.add(
                    SearchResult::new(to, to_id, origin.score() * penalty, ResultSource::Derived)
                        .with_highlight(from.as_str(), text),
                );
            }
        }

        debug!(target: "sift::searchers", %to, sources = sources.len(), hits = acc.len(), "Derived search");
        Ok(acc.snapshot())
    }

    /// Experiments tagged with the NCBI gene URI of any gene in `genes`.
    pub async fn experiments_from_genes(
        &self,
        genes: &[SearchResult],
    ) -> Result<Vec<SearchResult>, SourceError> {
        let scores: HashMap<EntityId, f64> = genes
            .iter()
            .filter(|g| g.kind == EntityKind::Gene)
            .map(|g| (g.id, g.score()))
            .collect();
        if scores.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<EntityId> = scores.keys().copied().collect();
        let loaded = self.ctx.store.load(EntityKind::Gene, &ids).await?;

        // uri -> (originating score, symbol)
        let mut by_uri: HashMap<String, (f64, String)> = HashMap::new();
        for entity in loaded {
            if let Entity::Gene(gene) = entity {
                if let (Some(ncbi), Some(score)) = (gene.ncbi_id, scores.get(&gene.id)) {
                    by_uri.insert(
                        format!("{NCBI_GENE_URI_PREFIX}{ncbi}"),
                        (*score, gene.official_symbol),
                    );
                }
            }
        }
        if by_uri.is_empty() {
            return Ok(Vec::new());
        }

        let uris: Vec<String> = by_uri.keys().cloned().collect();
        let kinds = BTreeSet::from([EntityKind::Experiment]);
        let annotations = self.ctx.characteristics.find_by_uri(&kinds, &uris).await?;
        let owners = self.ctx.characteristics.parents_of(&annotations).await?;
        let penalty = self.ctx.config.indirect_hit_penalty;

        let acc = ResultAccumulator::new();
        for annotation in &annotations {
            let Some((score, symbol)) = annotation.value_uri.as_ref().and_then(|u| by_uri.get(u))
            else {
                continue;
            };
            let experiment = match owners.get(&annotation.id) {
                Some(AnnotationOwner::Entity {
                    kind: EntityKind::Experiment,
                    id,
                }) => *id,
                Some(AnnotationOwner::BioMaterial { experiment, .. })
                | Some(AnnotationOwner::FactorValue { experiment, .. }) => *experiment,
                _ => continue,
            };
            acc.add(
                SearchResult::new(
                    EntityKind::Experiment,
                    experiment,
                    score * penalty,
                    ResultSource::Derived,
                )
                .with_highlight("gene", format!("{symbol} {}", provenance(EntityKind::Gene))),
            );
        }
        Ok(acc.snapshot())
    }

    /// Experiments run on any platform in `platforms`, highlighted with
    /// `"<short name> - <name>"` of the platform.
    pub async fn experiments_from_platforms(
        &self,
        platforms: &[SearchResult],
    ) -> Result<Vec<SearchResult>, SourceError> {
        let scores: HashMap<EntityId, f64> = platforms
            .iter()
            .filter(|p| p.kind == EntityKind::Platform)
            .map(|p| (p.id, p.score()))
            .collect();
        if scores.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<EntityId> = scores.keys().copied().collect();
        let labels: HashMap<EntityId, String> = self
            .ctx
            .store
            .load(EntityKind::Platform, &ids)
            .await?
            .into_iter()
            .filter_map(|entity| match entity {
                Entity::Platform(p) => Some((p.id, format!("{} - {}", p.short_name, p.name))),
                _ => None,
            })
            .collect();

        let pairs = self
            .ctx
            .store
            .related(EntityKind::Platform, &ids, EntityKind::Experiment)
            .await?;
        let penalty = self.ctx.config.indirect_hit_penalty;

        let acc = ResultAccumulator::new();
        for (platform, experiment) in pairs {
            let Some(score) = scores.get(&platform) else {
                continue;
            };
            let mut result = SearchResult::new(
                EntityKind::Experiment,
                experiment,
                score * penalty,
                ResultSource::Derived,
            );
            if let Some(label) = labels.get(&platform) {
                result = result.with_highlight("platform", label.clone());
            }
            acc.add(result);
        }
        Ok(acc.snapshot())
    }
}

fn provenance(kind: EntityKind) -> String {
    let name = match kind {
        EntityKind::Gene => "Gene",
        EntityKind::Experiment => "Experiment",
        EntityKind::Platform => "Platform",
        EntityKind::Probe => "Probe",
        EntityKind::BioSequence => "BioSequence",
        EntityKind::GeneSet => "GeneSet",
        EntityKind::ExperimentSet => "ExperimentSet",
        EntityKind::Publication => "Publication",
        EntityKind::Characteristic => "Characteristic",
        EntityKind::Phenotype => "Phenotype",
    };
    format!("(from associated {name})")
}

/// Best result per id, grouped by kind.
fn group_by_kind(results: &[SearchResult]) -> HashMap<EntityKind, HashMap<EntityId, &SearchResult>> {
    let mut groups: HashMap<EntityKind, HashMap<EntityId, &SearchResult>> = HashMap::new();
    for result in results {
        let group = groups.entry(result.kind).or_default();
        let better = group
            .get(&result.id)
            .map_or(true, |existing| result.score() > existing.score());
        if better {
            group.insert(result.id, result);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_marker() {
        assert_eq!(provenance(EntityKind::BioSequence), "(from associated BioSequence)");
    }

    #[test]
    fn test_group_by_kind_keeps_best() {
        let results = vec![
            SearchResult::new(EntityKind::Gene, 1, 0.4, ResultSource::Index),
            SearchResult::new(EntityKind::Gene, 1, 0.9, ResultSource::Database),
            SearchResult::new(EntityKind::Probe, 1, 0.2, ResultSource::Database),
        ];
        let groups = group_by_kind(&results);
        assert_eq!(groups[&EntityKind::Gene][&1].score(), 0.9);
        assert_eq!(groups[&EntityKind::Probe].len(), 1);
    }
}
