//! Retrieval strategies.
//!
//! Each searcher turns a parsed query into scored [`SearchResult`]s from one
//! kind of source. Searchers return `Err` only for failures of the source
//! itself; the orchestrator logs those and carries on without the step.

mod characteristic;
mod database;
mod derived;
mod gene;
mod index;

pub use characteristic::{CharacteristicSearcher, FROM_BIOMATERIAL, FROM_FACTOR_VALUE, GO_GROUP_HIGHLIGHT};
pub use database::DatabaseSearcher;
pub use derived::{DerivedSearcher, NCBI_GENE_URI_PREFIX};
pub use gene::GeneSearcher;
pub use index::IndexSearcher;

use crate::config::SearchConfig;
use crate::error::SourceError;
use crate::model::SearchResult;
use crate::ontology::OntologyTermExpander;
use crate::sources::{CharacteristicStore, EntityStore, FullTextIndex};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

static URI_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://").unwrap());

/// Whether `text` starts with a URI scheme such as `http://`.
pub fn is_uri(text: &str) -> bool {
    URI_SCHEME.is_match(text.trim())
}

/// Collaborators and tuning shared by all searchers of one service.
#[derive(Clone)]
pub struct SearchContext {
    pub store: Arc<dyn EntityStore>,
    pub index: Arc<dyn FullTextIndex>,
    pub characteristics: Arc<dyn CharacteristicStore>,
    pub expander: OntologyTermExpander,
    pub config: Arc<SearchConfig>,
}

impl SearchContext {
    pub fn database(&self) -> DatabaseSearcher<'_> {
        DatabaseSearcher::new(self)
    }

    pub fn index(&self) -> IndexSearcher<'_> {
        IndexSearcher::new(self)
    }

    pub fn characteristic(&self) -> CharacteristicSearcher<'_> {
        CharacteristicSearcher::new(self)
    }

    pub fn gene(&self) -> GeneSearcher<'_> {
        GeneSearcher::new(self)
    }

    pub fn derived(&self) -> DerivedSearcher<'_> {
        DerivedSearcher::new(self)
    }
}

/// Unwraps a sub-query result, logging a failure and substituting the default.
pub(crate) fn soften<T: Default>(result: Result<T, SourceError>, what: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(target: "sift::searchers", step = what, code = e.code_str(), error = %e, "Source call failed");
            T::default()
        }
    }
}

/// Merges highlight maps into `target`, comma-joining values of shared fields.
pub(crate) fn join_highlights(target: &mut SearchResult, other: &SearchResult) {
    for (field, text) in &other.highlights {
        match target.highlights.get_mut(field) {
            Some(existing) if existing != text => {
                existing.push_str(", ");
                existing.push_str(text);
            }
            Some(_) => {}
            None => {
                target.highlights.insert(field.clone(), text.clone());
            }
        }
    }
}
