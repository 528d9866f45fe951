//! Interfaces of the external collaborators consumed by the search core.
//!
//! Every call may block on I/O and may fail; failures are reported as
//! [`SourceError`] and never abort a search.

use crate::error::SourceError;
use crate::model::{Entity, EntityId, EntityKind, Taxon};
use crate::ontology::OntologyTerm;
use crate::query::QueryExpr;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ============================================================================
// EntityStore
// ============================================================================

/// Fields the relational store can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Id,
    ShortName,
    Name,
    Accession,
    OfficialSymbol,
    NcbiId,
    EnsemblId,
    Alias,
    GeneProduct,
    AlternateName,
    Manufacturer,
    Title,
}

impl MatchField {
    /// Name used as the highlight key for matches on this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Id => "id",
            MatchField::ShortName => "shortName",
            MatchField::Name => "name",
            MatchField::Accession => "accession",
            MatchField::OfficialSymbol => "officialSymbol",
            MatchField::NcbiId => "ncbiId",
            MatchField::EnsemblId => "ensemblId",
            MatchField::Alias => "alias",
            MatchField::GeneProduct => "geneProduct",
            MatchField::AlternateName => "alternateName",
            MatchField::Manufacturer => "manufacturer",
            MatchField::Title => "title",
        }
    }
}

/// An exact-match criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    pub field: MatchField,
    pub value: String,
}

impl Criteria {
    pub fn new(field: MatchField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Relational persistence of domain entities.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Ids of entities whose `criteria.field` equals the value (case-insensitive).
    async fn find_exact(
        &self,
        kind: EntityKind,
        criteria: &Criteria,
    ) -> Result<Vec<EntityId>, SourceError>;

    /// Ids of entities whose `field` matches a SQL `LIKE` pattern (`%`, `_`, `\` escapes).
    async fn find_inexact(
        &self,
        kind: EntityKind,
        field: MatchField,
        pattern: &str,
    ) -> Result<Vec<EntityId>, SourceError>;

    /// Loads entities by id; unknown or inaccessible ids are omitted.
    async fn load(&self, kind: EntityKind, ids: &[EntityId]) -> Result<Vec<Entity>, SourceError>;

    /// Every known taxon.
    async fn taxa(&self) -> Result<Vec<Taxon>, SourceError>;

    /// `(from_id, to_id)` pairs linking entities of `from` to entities of `to`.
    async fn related(
        &self,
        from: EntityKind,
        ids: &[EntityId],
        to: EntityKind,
    ) -> Result<Vec<(EntityId, EntityId)>, SourceError>;

    /// Taxon of an entity whose kind carries one.
    fn taxon_of(&self, entity: &Entity) -> Option<Taxon> {
        entity.as_taxonomic().and_then(|t| t.taxon()).cloned()
    }
}

// ============================================================================
// FullTextIndex
// ============================================================================

/// One full-text hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: EntityId,
    pub score: f64,
    #[serde(default)]
    pub highlights: BTreeMap<String, String>,
}

impl IndexHit {
    pub fn new(id: EntityId, score: f64) -> Self {
        Self {
            id,
            score,
            highlights: BTreeMap::new(),
        }
    }

    pub fn with_highlight(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.highlights.insert(field.into(), text.into());
        self
    }
}

#[async_trait]
pub trait FullTextIndex: Send + Sync {
    async fn search(&self, kind: EntityKind, query: &QueryExpr) -> Result<Vec<IndexHit>, SourceError>;
}

// ============================================================================
// OntologyProvider
// ============================================================================

#[async_trait]
pub trait OntologyProvider: Send + Sync {
    async fn resolve_by_uri(&self, uri: &str) -> Result<Option<OntologyTerm>, SourceError>;

    /// Children of `term`; all descendants unless `direct_only`.
    async fn children(
        &self,
        term: &OntologyTerm,
        direct_only: bool,
    ) -> Result<Vec<OntologyTerm>, SourceError>;

    async fn find_terms_by_label(&self, text: &str) -> Result<Vec<OntologyTerm>, SourceError>;
}

// ============================================================================
// CharacteristicStore
// ============================================================================

/// An annotation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_uri: Option<String>,
}

/// The object an annotation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationOwner {
    /// Attached directly to a searchable entity.
    Entity { kind: EntityKind, id: EntityId },
    /// Attached to a sample of an experiment.
    BioMaterial { id: EntityId, experiment: EntityId },
    /// Attached to an experimental factor level of an experiment.
    FactorValue { id: EntityId, experiment: EntityId },
}

impl AnnotationOwner {
    /// The entity kind a search would report for this owner.
    pub fn result_kind(&self) -> EntityKind {
        match self {
            AnnotationOwner::Entity { kind, .. } => *kind,
            AnnotationOwner::BioMaterial { .. } | AnnotationOwner::FactorValue { .. } => {
                EntityKind::Experiment
            }
        }
    }
}

#[async_trait]
pub trait CharacteristicStore: Send + Sync {
    /// Annotations whose value URI is one of `uris` and whose owner reports one of `kinds`.
    async fn find_by_uri(
        &self,
        kinds: &BTreeSet<EntityKind>,
        uris: &[String],
    ) -> Result<Vec<Annotation>, SourceError>;

    /// Annotations whose free-text value contains `text` (case-insensitive).
    async fn find_by_value(
        &self,
        kinds: &BTreeSet<EntityKind>,
        text: &str,
    ) -> Result<Vec<Annotation>, SourceError>;

    /// Owner of each annotation, keyed by annotation id.
    async fn parents_of(
        &self,
        annotations: &[Annotation],
    ) -> Result<HashMap<EntityId, AnnotationOwner>, SourceError>;
}
