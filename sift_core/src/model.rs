//! Domain model shared by every searcher.
//!
//! Entity kinds form a closed enum so that dispatch over kinds (accumulation,
//! bucketing, taxon capability) is checked exhaustively at compile time.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Identifier of an entity within its kind.
pub type EntityId = u64;

// ============================================================================
// Default Values
// ============================================================================

/// Default number of results kept per entity kind.
pub const DEFAULT_MAX_RESULTS: usize = 500;

// ============================================================================
// EntityKind
// ============================================================================

/// The searchable domain types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Gene,
    Experiment,
    Platform,
    Probe,
    BioSequence,
    GeneSet,
    ExperimentSet,
    Publication,
    Characteristic,
    Phenotype,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Gene,
        EntityKind::Experiment,
        EntityKind::Platform,
        EntityKind::Probe,
        EntityKind::BioSequence,
        EntityKind::GeneSet,
        EntityKind::ExperimentSet,
        EntityKind::Publication,
        EntityKind::Characteristic,
        EntityKind::Phenotype,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Gene => "gene",
            EntityKind::Experiment => "experiment",
            EntityKind::Platform => "platform",
            EntityKind::Probe => "probe",
            EntityKind::BioSequence => "bio_sequence",
            EntityKind::GeneSet => "gene_set",
            EntityKind::ExperimentSet => "experiment_set",
            EntityKind::Publication => "publication",
            EntityKind::Characteristic => "characteristic",
            EntityKind::Phenotype => "phenotype",
        }
    }

    /// Whether entities of this kind implement [`Taxonomic`].
    pub fn has_taxon(&self) -> bool {
        match self {
            EntityKind::Gene
            | EntityKind::Experiment
            | EntityKind::Platform
            | EntityKind::Probe
            | EntityKind::BioSequence
            | EntityKind::GeneSet
            | EntityKind::ExperimentSet => true,
            EntityKind::Publication | EntityKind::Characteristic | EntityKind::Phenotype => false,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no entity kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown entity kind: {0}")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().replace('_', "") == normalized)
            .ok_or_else(|| UnknownEntityKind(s.to_string()))
    }
}

// ============================================================================
// Taxon
// ============================================================================

/// An organism. Two taxa are equal iff their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxon {
    pub id: u64,
    pub scientific_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
}

impl Taxon {
    pub fn new(id: u64, scientific_name: impl Into<String>) -> Self {
        Self {
            id,
            scientific_name: scientific_name.into(),
            common_name: None,
        }
    }

    pub fn with_common_name(mut self, name: impl Into<String>) -> Self {
        self.common_name = Some(name.into());
        self
    }
}

impl PartialEq for Taxon {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Taxon {}

impl Hash for Taxon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Capability of entities that belong to an organism.
pub trait Taxonomic {
    fn taxon(&self) -> Option<&Taxon>;
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub id: EntityId,
    pub official_symbol: String,
    #[serde(default)]
    pub official_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ncbi_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensembl_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Names of the gene products.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: EntityId,
    pub short_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: EntityId,
    pub short_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,
}

/// A design element (probe set) on a platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub id: EntityId,
    pub name: String,
    pub platform: EntityId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genes: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioSequence {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,
    /// Genes whose products align to this sequence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genes: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneSet {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSet {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubmed_id: Option<String>,
}

/// An ontology-term or free-text annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristic {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_uri: Option<String>,
}

/// A phenotype association linking a phenotype term to genes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    pub id: EntityId,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genes: Vec<EntityId>,
}

macro_rules! impl_taxonomic {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Taxonomic for $ty {
                fn taxon(&self) -> Option<&Taxon> {
                    self.taxon.as_ref()
                }
            }
        )+
    };
}

impl_taxonomic!(Gene, Experiment, Platform, Probe, BioSequence, GeneSet, ExperimentSet);

/// A fully loaded entity of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Gene(Gene),
    Experiment(Experiment),
    Platform(Platform),
    Probe(Probe),
    BioSequence(BioSequence),
    GeneSet(GeneSet),
    ExperimentSet(ExperimentSet),
    Publication(Publication),
    Characteristic(Characteristic),
    Phenotype(Phenotype),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Gene(_) => EntityKind::Gene,
            Entity::Experiment(_) => EntityKind::Experiment,
            Entity::Platform(_) => EntityKind::Platform,
            Entity::Probe(_) => EntityKind::Probe,
            Entity::BioSequence(_) => EntityKind::BioSequence,
            Entity::GeneSet(_) => EntityKind::GeneSet,
            Entity::ExperimentSet(_) => EntityKind::ExperimentSet,
            Entity::Publication(_) => EntityKind::Publication,
            Entity::Characteristic(_) => EntityKind::Characteristic,
            Entity::Phenotype(_) => EntityKind::Phenotype,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Entity::Gene(e) => e.id,
            Entity::Experiment(e) => e.id,
            Entity::Platform(e) => e.id,
            Entity::Probe(e) => e.id,
            Entity::BioSequence(e) => e.id,
            Entity::GeneSet(e) => e.id,
            Entity::ExperimentSet(e) => e.id,
            Entity::Publication(e) => e.id,
            Entity::Characteristic(e) => e.id,
            Entity::Phenotype(e) => e.id,
        }
    }

    /// Short human-readable label.
    pub fn label(&self) -> &str {
        match self {
            Entity::Gene(e) => &e.official_symbol,
            Entity::Experiment(e) => &e.short_name,
            Entity::Platform(e) => &e.short_name,
            Entity::Probe(e) => &e.name,
            Entity::BioSequence(e) => &e.name,
            Entity::GeneSet(e) => &e.name,
            Entity::ExperimentSet(e) => &e.name,
            Entity::Publication(e) => &e.title,
            Entity::Characteristic(e) => &e.value,
            Entity::Phenotype(e) => &e.value,
        }
    }

    /// The taxon capability, when this kind has one.
    pub fn as_taxonomic(&self) -> Option<&dyn Taxonomic> {
        match self {
            Entity::Gene(e) => Some(e),
            Entity::Experiment(e) => Some(e),
            Entity::Platform(e) => Some(e),
            Entity::Probe(e) => Some(e),
            Entity::BioSequence(e) => Some(e),
            Entity::GeneSet(e) => Some(e),
            Entity::ExperimentSet(e) => Some(e),
            Entity::Publication(_) | Entity::Characteristic(_) | Entity::Phenotype(_) => None,
        }
    }
}

// ============================================================================
// SearchSettings
// ============================================================================

/// How much latency a request tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// No deadline beyond the natural timeouts of the stores.
    Fast,
    /// Bounded by the configured deadline.
    #[default]
    Balanced,
    /// Bounded by the (longer) accurate deadline.
    Accurate,
}

/// Per-request search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    pub query: String,

    /// Explicit ontology term to resolve instead of free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon: Option<Taxon>,

    /// Entity kinds to search for (default: all)
    #[serde(default = "default_kinds")]
    pub kinds: BTreeSet<EntityKind>,

    #[serde(default = "default_true")]
    pub use_database: bool,

    #[serde(default = "default_true")]
    pub use_index: bool,

    #[serde(default = "default_true")]
    pub use_characteristics: bool,

    /// Include genes annotated with matching Gene Ontology terms.
    #[serde(default)]
    pub use_go: bool,

    /// Maximum results per kind; 0 means unbounded.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default)]
    pub mode: SearchMode,

    /// Hydrate full entities into the returned results.
    #[serde(default = "default_true")]
    pub fill_results: bool,

    /// Skip the gene index search as soon as the database finds a gene.
    #[serde(default)]
    pub return_on_db_hit: bool,

    /// Drop results of kinds that carry no taxon when a taxon is set.
    #[serde(default)]
    pub strict_taxon_filter: bool,
}

fn default_true() -> bool {
    true
}

fn default_kinds() -> BTreeSet<EntityKind> {
    EntityKind::ALL.into_iter().collect()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl SearchSettings {
    /// Settings searching every kind in every source.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            term_uri: None,
            taxon: None,
            kinds: default_kinds(),
            use_database: true,
            use_index: true,
            use_characteristics: true,
            use_go: false,
            max_results: DEFAULT_MAX_RESULTS,
            mode: SearchMode::default(),
            fill_results: true,
            return_on_db_hit: false,
            strict_taxon_filter: false,
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_term_uri(mut self, uri: impl Into<String>) -> Self {
        self.term_uri = Some(uri.into());
        self
    }

    pub fn with_taxon(mut self, taxon: Taxon) -> Self {
        self.taxon = Some(taxon);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sources(mut self, database: bool, index: bool, characteristics: bool) -> Self {
        self.use_database = database;
        self.use_index = index;
        self.use_characteristics = characteristics;
        self
    }

    pub fn with_go(mut self, use_go: bool) -> Self {
        self.use_go = use_go;
        self
    }

    pub fn with_fill_results(mut self, fill: bool) -> Self {
        self.fill_results = fill;
        self
    }

    pub fn with_return_on_db_hit(mut self, value: bool) -> Self {
        self.return_on_db_hit = value;
        self
    }

    pub fn with_strict_taxon_filter(mut self, value: bool) -> Self {
        self.strict_taxon_filter = value;
        self
    }

    pub fn includes(&self, kind: EntityKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Whether `count` results already satisfy the per-kind cap.
    pub fn is_saturated(&self, count: usize) -> bool {
        self.max_results > 0 && count >= self.max_results
    }
}

// ============================================================================
// SearchResult
// ============================================================================

/// Which retrieval path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Database,
    Index,
    Characteristic,
    Ontology,
    Derived,
}

impl ResultSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSource::Database => "database",
            ResultSource::Index => "index",
            ResultSource::Characteristic => "characteristic",
            ResultSource::Ontology => "ontology",
            ResultSource::Derived => "derived",
        }
    }
}

/// One matched entity.
///
/// Equality and hashing consider only `(kind, id)`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub kind: EntityKind,
    pub id: EntityId,
    score: f64,
    pub source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub highlights: BTreeMap<String, String>,
}

impl SearchResult {
    pub fn new(kind: EntityKind, id: EntityId, score: f64, source: ResultSource) -> Self {
        Self {
            kind,
            id,
            score: clamp_score(score),
            source,
            entity: None,
            highlights: BTreeMap::new(),
        }
    }

    pub fn from_entity(entity: Entity, score: f64, source: ResultSource) -> Self {
        let mut result = Self::new(entity.kind(), entity.id(), score, source);
        result.entity = Some(entity);
        result
    }

    pub fn with_highlight(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.highlights.insert(field.into(), text.into());
        self
    }

    pub fn with_highlights(mut self, highlights: BTreeMap<String, String>) -> Self {
        self.highlights.extend(highlights);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// The same result with its score multiplied by `factor`.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.score = clamp_score(self.score * factor);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = clamp_score(score);
        self
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn key(&self) -> (EntityKind, EntityId) {
        (self.kind, self.id)
    }
}

impl PartialEq for SearchResult {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SearchResult {}

impl Hash for SearchResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() && score > 0.0 {
        score
    } else {
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse() -> Taxon {
        Taxon::new(2, "Mus musculus").with_common_name("mouse")
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert_eq!("BioSequence".parse::<EntityKind>().unwrap(), EntityKind::BioSequence);
        assert_eq!("gene-set".parse::<EntityKind>().unwrap(), EntityKind::GeneSet);
        assert!("dataset".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_taxon_equality_by_id() {
        let a = Taxon::new(2, "Mus musculus");
        let b = Taxon::new(2, "mouse (renamed)");
        assert_eq!(a, b);
        assert_ne!(a, Taxon::new(1, "Homo sapiens"));
    }

    #[test]
    fn test_taxonomic_capability_matches_kind() {
        let gene = Entity::Gene(Gene {
            id: 1,
            official_symbol: "Grin1".to_string(),
            official_name: String::new(),
            ncbi_id: None,
            ensembl_id: None,
            aliases: Vec::new(),
            products: Vec::new(),
            taxon: Some(mouse()),
        });
        let publication = Entity::Publication(Publication {
            id: 1,
            title: "A paper".to_string(),
            pubmed_id: None,
        });

        assert_eq!(
            gene.as_taxonomic().and_then(|t| t.taxon()).map(|t| t.id),
            Some(2)
        );
        assert!(publication.as_taxonomic().is_none());
        assert_eq!(gene.kind().has_taxon(), gene.as_taxonomic().is_some());
        assert_eq!(
            publication.kind().has_taxon(),
            publication.as_taxonomic().is_some()
        );
    }

    #[test]
    fn test_score_is_never_negative() {
        let result = SearchResult::new(EntityKind::Gene, 1, -3.0, ResultSource::Index);
        assert_eq!(result.score(), 0.0);
        let result = SearchResult::new(EntityKind::Gene, 1, f64::NAN, ResultSource::Index);
        assert_eq!(result.score(), 0.0);
        let result = SearchResult::new(EntityKind::Gene, 1, 1.0, ResultSource::Index).scaled(0.8);
        assert!((result.score() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_result_identity_is_kind_and_id() {
        let a = SearchResult::new(EntityKind::Gene, 7, 1.0, ResultSource::Database);
        let b = SearchResult::new(EntityKind::Gene, 7, 0.2, ResultSource::Index)
            .with_highlight("name", "x");
        let c = SearchResult::new(EntityKind::Probe, 7, 1.0, ResultSource::Database);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = SearchSettings::new("hippocampus");
        assert_eq!(settings.kinds.len(), EntityKind::ALL.len());
        assert!(settings.use_database && settings.use_index && settings.use_characteristics);
        assert!(!settings.use_go);
        assert_eq!(settings.mode, SearchMode::Balanced);
        assert!(settings.is_saturated(DEFAULT_MAX_RESULTS));
        assert!(!settings.is_saturated(DEFAULT_MAX_RESULTS - 1));
        assert!(!settings.with_max_results(0).is_saturated(usize::MAX));
    }

    #[test]
    fn test_settings_yaml_defaults() {
        let settings: SearchSettings = serde_yaml::from_str("query: brain\n").unwrap();
        assert_eq!(settings.query, "brain");
        assert_eq!(settings.max_results, DEFAULT_MAX_RESULTS);
        assert!(settings.fill_results);
        assert!(settings.includes(EntityKind::Phenotype));
    }
}
