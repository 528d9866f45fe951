//! Ontology term expansion.
//!
//! Terms come from an external [`OntologyProvider`](crate::sources::OntologyProvider);
//! this module only walks their child relation, caching each term's direct
//! children by URI.

mod cache;
mod expander;

pub use cache::ChildTermCache;
pub use expander::OntologyTermExpander;

use serde::{Deserialize, Serialize};

/// An ontology class as seen by the search core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OntologyTerm {
    /// Absent for anonymous or non-class resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub label: String,
}

impl OntologyTerm {
    pub fn new(uri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            label: label.into(),
        }
    }

    pub fn anonymous(label: impl Into<String>) -> Self {
        Self {
            uri: None,
            label: label.into(),
        }
    }

    /// The URI, if present and not blank.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }

    /// Whether this is a Gene Ontology term.
    pub fn is_gene_ontology(&self) -> bool {
        self.uri().is_some_and(|uri| uri.contains("/GO_"))
    }
}

/// Derives a compact label such as `UBERON:0000955` from a term URI.
///
/// Uses the fragment when present, otherwise the last path segment, and
/// replaces the first `_` with `:`.
pub fn label_from_uri(uri: &str) -> String {
    let local = match url::Url::parse(uri) {
        Ok(parsed) => match parsed.fragment().filter(|f| !f.is_empty()) {
            Some(fragment) => fragment.to_string(),
            None => parsed
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                .map(str::to_string)
                .unwrap_or_else(|| uri.to_string()),
        },
        Err(_) => uri
            .rsplit(['/', '#'])
            .find(|s| !s.is_empty())
            .unwrap_or(uri)
            .to_string(),
    };
    local.replacen('_', ":", 1).to_uppercase()
}
