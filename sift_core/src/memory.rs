//! In-memory catalog.
//!
//! Implements every source interface over data held in memory, loaded from a
//! YAML or JSON catalog file or assembled with the `with_*` builders. Used by
//! the CLI and the tests.

use crate::config::SearchConfig;
use crate::error::{ConfigError, SourceError};
use crate::model::{
    BioSequence, Entity, EntityId, EntityKind, Experiment, ExperimentSet, Gene, GeneSet,
    Phenotype, Platform, Probe, Publication, Taxon,
};
use crate::ontology::{label_from_uri, OntologyTerm};
use crate::query::QueryExpr;
use crate::service::SearchService;
use crate::sources::{
    Annotation, AnnotationOwner, CharacteristicStore, Criteria, EntityStore, FullTextIndex,
    IndexHit, MatchField, OntologyProvider,
};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const SOURCE_NAME: &str = "memory";

// ============================================================================
// Catalog file format
// ============================================================================

/// An ontology class and the URIs of its direct children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTerm {
    pub uri: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

/// An annotation together with the object it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogAnnotation {
    #[serde(flatten)]
    pub annotation: Annotation,
    pub owner: AnnotationOwner,
}

/// Serialized form of a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogData {
    pub taxa: Vec<Taxon>,
    pub genes: Vec<Gene>,
    pub experiments: Vec<Experiment>,
    pub platforms: Vec<Platform>,
    pub probes: Vec<Probe>,
    pub bio_sequences: Vec<BioSequence>,
    pub gene_sets: Vec<GeneSet>,
    pub experiment_sets: Vec<ExperimentSet>,
    pub publications: Vec<Publication>,
    pub phenotypes: Vec<Phenotype>,
    pub terms: Vec<CatalogTerm>,
    pub annotations: Vec<CatalogAnnotation>,
}

// ============================================================================
// MemoryCatalog
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    taxa: Vec<Taxon>,
    entities: BTreeMap<EntityKind, BTreeMap<EntityId, Entity>>,
    terms: BTreeMap<String, CatalogTerm>,
    annotations: Vec<CatalogAnnotation>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: CatalogData) -> Self {
        let CatalogData {
            taxa,
            genes,
            experiments,
            platforms,
            probes,
            bio_sequences,
            gene_sets,
            experiment_sets,
            publications,
            phenotypes,
            terms,
            annotations,
        } = data;

        let mut catalog = Self {
            taxa,
            ..Self::default()
        };
        let entities = genes
            .into_iter()
            .map(Entity::Gene)
            .chain(experiments.into_iter().map(Entity::Experiment))
            .chain(platforms.into_iter().map(Entity::Platform))
            .chain(probes.into_iter().map(Entity::Probe))
            .chain(bio_sequences.into_iter().map(Entity::BioSequence))
            .chain(gene_sets.into_iter().map(Entity::GeneSet))
            .chain(experiment_sets.into_iter().map(Entity::ExperimentSet))
            .chain(publications.into_iter().map(Entity::Publication))
            .chain(phenotypes.into_iter().map(Entity::Phenotype));
        for entity in entities {
            catalog.insert(entity);
        }
        for term in terms {
            catalog.terms.insert(term.uri.clone(), term);
        }
        catalog.annotations = annotations;
        catalog
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_data(serde_yaml::from_str(content)?))
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_data(serde_json::from_str(content)?))
    }

    /// Loads a catalog file; `.json` files are read as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&content)?,
            _ => Self::from_yaml_str(&content)?,
        };
        debug!(
            target: "sift::memory",
            path = %path.display(),
            entities = catalog.len(),
            terms = catalog.terms.len(),
            annotations = catalog.annotations.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    pub fn with_taxon(mut self, taxon: Taxon) -> Self {
        self.taxa.push(taxon);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.insert(entity);
        self
    }

    /// Adds an ontology term with the URIs of its direct children.
    pub fn with_term(mut self, uri: &str, label: &str, children: &[&str]) -> Self {
        self.terms.insert(
            uri.to_string(),
            CatalogTerm {
                uri: uri.to_string(),
                label: label.to_string(),
                children: children.iter().map(|c| c.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation, owner: AnnotationOwner) -> Self {
        self.annotations.push(CatalogAnnotation { annotation, owner });
        self
    }

    /// Adds or replaces an entity.
    pub fn insert(&mut self, entity: Entity) {
        self.entities
            .entry(entity.kind())
            .or_default()
            .insert(entity.id(), entity);
    }

    /// Number of entities of every kind.
    pub fn len(&self) -> usize {
        self.entities.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.annotations.is_empty()
    }

    /// A service backed by this catalog for every source.
    pub fn into_service(self, config: SearchConfig) -> SearchService {
        let catalog = Arc::new(self);
        SearchService::new(
            catalog.clone(),
            catalog.clone(),
            catalog.clone(),
            catalog,
            config,
        )
    }

    fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.get(&kind).into_iter().flat_map(BTreeMap::values)
    }

    fn entity(&self, kind: EntityKind, id: EntityId) -> Option<&Entity> {
        self.entities.get(&kind).and_then(|e| e.get(&id))
    }

    fn term(&self, uri: &str) -> OntologyTerm {
        match self.terms.get(uri) {
            Some(term) => OntologyTerm::new(&term.uri, &term.label),
            None => OntologyTerm::new(uri, label_from_uri(uri)),
        }
    }

    fn annotations_for<'a>(
        &'a self,
        kinds: &'a BTreeSet<EntityKind>,
    ) -> impl Iterator<Item = &'a CatalogAnnotation> {
        let wants_characteristics = kinds.contains(&EntityKind::Characteristic);
        self.annotations
            .iter()
            .filter(move |a| wants_characteristics || kinds.contains(&a.owner.result_kind()))
    }
}

// ============================================================================
// Entity fields
// ============================================================================

/// Values of `field` on `entity`; empty when the kind has no such field.
fn field_values(entity: &Entity, field: MatchField) -> Vec<String> {
    if field == MatchField::Id {
        return vec![entity.id().to_string()];
    }
    match (entity, field) {
        (Entity::Gene(g), MatchField::OfficialSymbol) => vec![g.official_symbol.clone()],
        (Entity::Gene(g), MatchField::Name) => vec![g.official_name.clone()],
        (Entity::Gene(g), MatchField::NcbiId) => g.ncbi_id.iter().map(u64::to_string).collect(),
        (Entity::Gene(g), MatchField::EnsemblId) => g.ensembl_id.iter().cloned().collect(),
        (Entity::Gene(g), MatchField::Alias) => g.aliases.clone(),
        (Entity::Gene(g), MatchField::GeneProduct) => g.products.clone(),
        (Entity::Experiment(e), MatchField::ShortName) => vec![e.short_name.clone()],
        (Entity::Experiment(e), MatchField::Name) => vec![e.name.clone()],
        (Entity::Experiment(e), MatchField::Accession) => e.accession.iter().cloned().collect(),
        (Entity::Platform(p), MatchField::ShortName) => vec![p.short_name.clone()],
        (Entity::Platform(p), MatchField::Name) => vec![p.name.clone()],
        (Entity::Platform(p), MatchField::AlternateName) => p.alternate_names.clone(),
        (Entity::Platform(p), MatchField::Manufacturer) => p.manufacturer.iter().cloned().collect(),
        (Entity::Probe(p), MatchField::Name) => vec![p.name.clone()],
        (Entity::BioSequence(s), MatchField::Name) => vec![s.name.clone()],
        (Entity::BioSequence(s), MatchField::Accession) => s.accession.iter().cloned().collect(),
        (Entity::GeneSet(s), MatchField::Name) => vec![s.name.clone()],
        (Entity::ExperimentSet(s), MatchField::Name) => vec![s.name.clone()],
        (Entity::Publication(p), MatchField::Title) => vec![p.title.clone()],
        (Entity::Publication(p), MatchField::Accession) => p.pubmed_id.iter().cloned().collect(),
        (Entity::Characteristic(c), MatchField::Name) => vec![c.value.clone()],
        (Entity::Phenotype(p), MatchField::Name) => vec![p.value.clone()],
        _ => Vec::new(),
    }
}

/// Every searchable text of an entity as `(field, value)` pairs.
fn text_fields(entity: &Entity) -> Vec<(&'static str, String)> {
    const FIELDS: [MatchField; 11] = [
        MatchField::ShortName,
        MatchField::Name,
        MatchField::Accession,
        MatchField::OfficialSymbol,
        MatchField::NcbiId,
        MatchField::EnsemblId,
        MatchField::Alias,
        MatchField::GeneProduct,
        MatchField::AlternateName,
        MatchField::Manufacturer,
        MatchField::Title,
    ];
    let mut fields: Vec<(&'static str, String)> = FIELDS
        .iter()
        .flat_map(|field| {
            field_values(entity, *field)
                .into_iter()
                .map(move |value| (field.as_str(), value))
        })
        .collect();
    match entity {
        Entity::Experiment(e) => fields.push(("description", e.description.clone())),
        Entity::GeneSet(s) => fields.push(("description", s.description.clone())),
        Entity::ExperimentSet(s) => fields.push(("description", s.description.clone())),
        _ => {}
    }
    fields.retain(|(_, value)| !value.is_empty());
    fields
}

/// Outgoing references of an entity.
fn links(entity: &Entity) -> Vec<(EntityKind, EntityId)> {
    let to = |kind: EntityKind, ids: &[EntityId]| ids.iter().map(move |id| (kind, *id)).collect::<Vec<_>>();
    match entity {
        Entity::Experiment(e) => to(EntityKind::Platform, &e.platforms),
        Entity::Probe(p) => {
            let mut links = to(EntityKind::Gene, &p.genes);
            links.push((EntityKind::Platform, p.platform));
            links
        }
        Entity::BioSequence(s) => to(EntityKind::Gene, &s.genes),
        Entity::Phenotype(p) => to(EntityKind::Gene, &p.genes),
        _ => Vec::new(),
    }
}

/// Compiles a SQL `LIKE` pattern into a case-insensitive anchored regex.
fn like_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    translated.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            c => translated.push_str(&regex::escape(&c.to_string())),
        }
    }
    RegexBuilder::new(&format!("^{translated}$"))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
}

// ============================================================================
// Full-text matching
// ============================================================================

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// A leaf of the query compiled for matching.
enum Matcher {
    Token(String),
    Phrase(String),
    Prefix(String),
    Pattern(Regex),
}

impl Matcher {
    fn compile(expr: &QueryExpr) -> Option<Self> {
        match expr {
            QueryExpr::Term(t) => Some(Matcher::Token(t.to_lowercase())),
            QueryExpr::Phrase(p) => Some(Matcher::Phrase(p.to_lowercase())),
            QueryExpr::Prefix(p) => Some(Matcher::Prefix(p.to_lowercase())),
            QueryExpr::Wildcard(_) => expr
                .like_text()
                .and_then(|like| like_regex(&like).ok())
                .map(Matcher::Pattern),
            _ => None,
        }
    }

    fn matches(&self, value: &str, tokens: &[String]) -> bool {
        match self {
            Matcher::Token(t) => tokens.iter().any(|tok| tok == t),
            Matcher::Phrase(p) => value.to_lowercase().contains(p.as_str()),
            Matcher::Prefix(p) => tokens.iter().any(|tok| tok.starts_with(p.as_str())),
            Matcher::Pattern(re) => tokens.iter().any(|tok| re.is_match(tok)),
        }
    }
}

/// Evaluates `expr` against an entity's fields.
///
/// Returns `None` when the entity does not match, otherwise the number of
/// matched positive leaves and the fields they matched in.
fn evaluate(expr: &QueryExpr, fields: &[(&'static str, String, Vec<String>)]) -> Option<(usize, BTreeSet<&'static str>)> {
    match expr {
        QueryExpr::Field { expr, .. } => evaluate(expr, fields),
        QueryExpr::Not(inner) => match evaluate(inner, fields) {
            Some(_) => None,
            None => Some((0, BTreeSet::new())),
        },
        QueryExpr::And(children) => {
            let mut score = 0;
            let mut matched = BTreeSet::new();
            for child in children {
                let (s, m) = evaluate(child, fields)?;
                score += s;
                matched.extend(m);
            }
            Some((score, matched))
        }
        QueryExpr::Or(children) => {
            let mut any = false;
            let mut score = 0;
            let mut matched = BTreeSet::new();
            for child in children {
                if let Some((s, m)) = evaluate(child, fields) {
                    any = true;
                    score += s;
                    matched.extend(m);
                }
            }
            any.then_some((score, matched))
        }
        leaf => {
            let matcher = Matcher::compile(leaf)?;
            let matched: BTreeSet<&'static str> = fields
                .iter()
                .filter(|(_, value, tokens)| matcher.matches(value, tokens))
                .map(|(name, _, _)| *name)
                .collect();
            (!matched.is_empty()).then_some((1, matched))
        }
    }
}

// ============================================================================
// Source implementations
// ============================================================================

#[async_trait]
impl EntityStore for MemoryCatalog {
    async fn find_exact(
        &self,
        kind: EntityKind,
        criteria: &Criteria,
    ) -> Result<Vec<EntityId>, SourceError> {
        let wanted = criteria.value.trim();
        Ok(self
            .of_kind(kind)
            .filter(|entity| {
                field_values(entity, criteria.field)
                    .iter()
                    .any(|value| value.eq_ignore_ascii_case(wanted))
            })
            .map(Entity::id)
            .collect())
    }

    async fn find_inexact(
        &self,
        kind: EntityKind,
        field: MatchField,
        pattern: &str,
    ) -> Result<Vec<EntityId>, SourceError> {
        let re = like_regex(pattern).map_err(|e| SourceError::unavailable(SOURCE_NAME, e.to_string()))?;
        Ok(self
            .of_kind(kind)
            .filter(|entity| field_values(entity, field).iter().any(|v| re.is_match(v)))
            .map(Entity::id)
            .collect())
    }

    async fn load(&self, kind: EntityKind, ids: &[EntityId]) -> Result<Vec<Entity>, SourceError> {
        if kind == EntityKind::Characteristic {
            let wanted: HashSet<EntityId> = ids.iter().copied().collect();
            return Ok(self
                .annotations
                .iter()
                .filter(|a| wanted.contains(&a.annotation.id))
                .map(|a| {
                    Entity::Characteristic(crate::model::Characteristic {
                        id: a.annotation.id,
                        category: a.annotation.category.clone(),
                        value: a.annotation.value.clone(),
                        value_uri: a.annotation.value_uri.clone(),
                    })
                })
                .collect());
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.entity(kind, *id).cloned())
            .collect())
    }

    async fn taxa(&self) -> Result<Vec<Taxon>, SourceError> {
        let mut seen = HashSet::new();
        let declared = self.taxa.iter();
        let referenced = self
            .entities
            .values()
            .flat_map(BTreeMap::values)
            .filter_map(|e| e.as_taxonomic().and_then(|t| t.taxon()));
        Ok(declared
            .chain(referenced)
            .filter(|t| seen.insert(t.id))
            .cloned()
            .collect())
    }

    async fn related(
        &self,
        from: EntityKind,
        ids: &[EntityId],
        to: EntityKind,
    ) -> Result<Vec<(EntityId, EntityId)>, SourceError> {
        let wanted: BTreeSet<EntityId> = ids.iter().copied().collect();
        let mut pairs = BTreeSet::new();

        for id in &wanted {
            if let Some(entity) = self.entity(from, *id) {
                pairs.extend(
                    links(entity)
                        .into_iter()
                        .filter(|(kind, _)| *kind == to)
                        .map(|(_, target)| (*id, target)),
                );
            }
        }
        for target in self.of_kind(to) {
            pairs.extend(
                links(target)
                    .into_iter()
                    .filter(|(kind, source)| *kind == from && wanted.contains(source))
                    .map(|(_, source)| (source, target.id())),
            );
        }
        Ok(pairs.into_iter().collect())
    }
}

#[async_trait]
impl FullTextIndex for MemoryCatalog {
    async fn search(&self, kind: EntityKind, query: &QueryExpr) -> Result<Vec<IndexHit>, SourceError> {
        let mut hits = Vec::new();
        for entity in self.of_kind(kind) {
            let fields: Vec<(&'static str, String, Vec<String>)> = text_fields(entity)
                .into_iter()
                .map(|(name, value)| {
                    let tokens = tokenize(&value);
                    (name, value, tokens)
                })
                .collect();
            let Some((score, matched)) = evaluate(query, &fields) else {
                continue;
            };
            if score == 0 {
                continue;
            }
            let mut hit = IndexHit::new(entity.id(), score as f64);
            for (name, value, _) in &fields {
                if matched.contains(name) && !hit.highlights.contains_key(*name) {
                    hit = hit.with_highlight(*name, value.clone());
                }
            }
            hits.push(hit);
        }
        Ok(hits)
    }
}

#[async_trait]
impl OntologyProvider for MemoryCatalog {
    async fn resolve_by_uri(&self, uri: &str) -> Result<Option<OntologyTerm>, SourceError> {
        Ok(self
            .terms
            .get(uri)
            .map(|term| OntologyTerm::new(&term.uri, &term.label)))
    }

    async fn children(
        &self,
        term: &OntologyTerm,
        direct_only: bool,
    ) -> Result<Vec<OntologyTerm>, SourceError> {
        let Some(uri) = term.uri() else {
            return Ok(Vec::new());
        };
        let direct = |uri: &str| -> Vec<String> {
            self.terms
                .get(uri)
                .map(|t| t.children.clone())
                .unwrap_or_default()
        };
        if direct_only {
            return Ok(direct(uri).iter().map(|c| self.term(c)).collect());
        }

        let mut seen: HashSet<String> = HashSet::from([uri.to_string()]);
        let mut queue: VecDeque<String> = VecDeque::from([uri.to_string()]);
        let mut descendants = Vec::new();
        while let Some(next) = queue.pop_front() {
            for child in direct(&next) {
                if seen.insert(child.clone()) {
                    descendants.push(self.term(&child));
                    queue.push_back(child);
                }
            }
        }
        Ok(descendants)
    }

    async fn find_terms_by_label(&self, text: &str) -> Result<Vec<OntologyTerm>, SourceError> {
        let wanted = text.trim();
        Ok(self
            .terms
            .values()
            .filter(|term| term.label.eq_ignore_ascii_case(wanted))
            .map(|term| OntologyTerm::new(&term.uri, &term.label))
            .collect())
    }
}

#[async_trait]
impl CharacteristicStore for MemoryCatalog {
    async fn find_by_uri(
        &self,
        kinds: &BTreeSet<EntityKind>,
        uris: &[String],
    ) -> Result<Vec<Annotation>, SourceError> {
        let wanted: HashSet<&str> = uris.iter().map(String::as_str).collect();
        Ok(self
            .annotations_for(kinds)
            .filter(|a| {
                a.annotation
                    .value_uri
                    .as_deref()
                    .is_some_and(|uri| wanted.contains(uri))
            })
            .map(|a| a.annotation.clone())
            .collect())
    }

    async fn find_by_value(
        &self,
        kinds: &BTreeSet<EntityKind>,
        text: &str,
    ) -> Result<Vec<Annotation>, SourceError> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .annotations_for(kinds)
            .filter(|a| a.annotation.value.to_lowercase().contains(&needle))
            .map(|a| a.annotation.clone())
            .collect())
    }

    async fn parents_of(
        &self,
        annotations: &[Annotation],
    ) -> Result<HashMap<EntityId, AnnotationOwner>, SourceError> {
        let wanted: HashSet<EntityId> = annotations.iter().map(|a| a.id).collect();
        Ok(self
            .annotations
            .iter()
            .filter(|a| wanted.contains(&a.annotation.id))
            .map(|a| (a.annotation.id, a.owner))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;

    fn gene(id: EntityId, symbol: &str) -> Entity {
        Entity::Gene(Gene {
            id,
            official_symbol: symbol.to_string(),
            official_name: String::new(),
            ncbi_id: None,
            ensembl_id: None,
            aliases: Vec::new(),
            products: Vec::new(),
            taxon: None,
        })
    }

    #[test]
    fn test_like_regex() {
        let re = like_regex("grin%").unwrap();
        assert!(re.is_match("GRIN1"));
        assert!(!re.is_match("agrin"));
        let re = like_regex("a\\_b_").unwrap();
        assert!(re.is_match("a_bc"));
        assert!(!re.is_match("axbc"));
    }

    #[tokio::test]
    async fn test_find_exact_is_case_insensitive() {
        let catalog = MemoryCatalog::new().with_entity(gene(1, "Grin1"));
        let ids = catalog
            .find_exact(EntityKind::Gene, &Criteria::new(MatchField::OfficialSymbol, "GRIN1"))
            .await
            .unwrap();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_related_follows_links_both_ways() {
        let catalog = MemoryCatalog::new()
            .with_entity(gene(1, "Grin1"))
            .with_entity(Entity::BioSequence(BioSequence {
                id: 7,
                name: "NM_008169".to_string(),
                accession: None,
                genes: vec![1],
                taxon: None,
            }));
        let forward = catalog
            .related(EntityKind::BioSequence, &[7], EntityKind::Gene)
            .await
            .unwrap();
        assert_eq!(forward, vec![(7, 1)]);
        let backward = catalog
            .related(EntityKind::Gene, &[1], EntityKind::BioSequence)
            .await
            .unwrap();
        assert_eq!(backward, vec![(1, 7)]);
    }

    #[tokio::test]
    async fn test_index_evaluates_boolean_query() {
        let catalog = MemoryCatalog::new()
            .with_entity(gene(1, "Grin1"))
            .with_entity(gene(2, "Grin2a"));
        let hits = catalog
            .search(EntityKind::Gene, &parse("grin* -grin2a").unwrap())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].highlights["officialSymbol"], "Grin1");
    }

    #[tokio::test]
    async fn test_children_transitive_handles_cycles() {
        let catalog = MemoryCatalog::new()
            .with_term("http://x/A", "a", &["http://x/B"])
            .with_term("http://x/B", "b", &["http://x/A", "http://x/C"]);
        let a = OntologyTerm::new("http://x/A", "a");
        let all = catalog.children(&a, false).await.unwrap();
        let uris: Vec<_> = all.iter().filter_map(|t| t.uri()).collect();
        assert_eq!(uris, vec!["http://x/B", "http://x/C"]);
        assert_eq!(all[1].label, "C");
    }

    #[test]
    fn test_catalog_from_yaml() {
        let yaml = r#"
taxa:
  - id: 1
    scientific_name: Mus musculus
    common_name: mouse
genes:
  - id: 10
    official_symbol: Grin1
    ncbi_id: 14810
annotations:
  - id: 100
    value: hippocampus
    value_uri: http://purl.obolibrary.org/obo/UBERON_0002421
    owner:
      type: bio_material
      id: 5
      experiment: 20
"#;
        let catalog = MemoryCatalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.annotations.len(), 1);
        assert_eq!(
            catalog.annotations[0].owner,
            AnnotationOwner::BioMaterial { id: 5, experiment: 20 }
        );
    }
}
