// src/lib.rs
//! Federated entity search.
//!
//! A query is resolved against an exact-match relational store, a full-text
//! index and an ontology annotation store. Matches are merged per entity,
//! ranked, filtered by taxon and capped per entity kind. Any single source may
//! fail or time out without failing the search.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod ontology;
pub mod query;
pub mod searchers;
pub mod service;
pub mod sources;

pub use accumulator::ResultAccumulator;
pub use config::{ConfigStore, SearchConfig};
pub use error::{ConfigError, SearchError, SourceError};
pub use memory::MemoryCatalog;
pub use model::{
    Entity, EntityId, EntityKind, ResultSource, SearchMode, SearchResult, SearchSettings, Taxon,
    Taxonomic,
};
pub use ontology::{ChildTermCache, OntologyTerm, OntologyTermExpander};
pub use service::{SearchResponse, SearchService};
pub use sources::{CharacteristicStore, EntityStore, FullTextIndex, OntologyProvider};
