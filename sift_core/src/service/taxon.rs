//! Taxon inference from free-text queries.

use crate::model::Taxon;
use crate::sources::EntityStore;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Lowercased organism names mapped to their taxon.
///
/// Full scientific and common names are registered first; single words of
/// multi-word names are added afterwards and never shadow a full name.
pub(crate) fn taxon_names(taxa: &[Taxon]) -> HashMap<String, Taxon> {
    let mut names = HashMap::new();
    for taxon in taxa {
        for name in full_names(taxon) {
            names.insert(name, taxon.clone());
        }
    }
    for taxon in taxa {
        for name in full_names(taxon) {
            for word in name.split_whitespace() {
                names.entry(word.to_string()).or_insert_with(|| taxon.clone());
            }
        }
    }
    names
}

fn full_names(taxon: &Taxon) -> impl Iterator<Item = String> + '_ {
    std::iter::once(&taxon.scientific_name)
        .chain(taxon.common_name.as_ref())
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
}

/// First of the leading `max_terms` query words that names a taxon.
pub(crate) fn match_taxon(
    names: &HashMap<String, Taxon>,
    query: &str,
    max_terms: usize,
) -> Option<Taxon> {
    let cleaned = query.to_lowercase().replace('"', "");
    cleaned
        .split_whitespace()
        .take(max_terms)
        .find_map(|word| names.get(word).cloned())
}

/// Infers the taxon a query is about, if any of its words names one.
pub(crate) async fn infer_taxon(
    store: &dyn EntityStore,
    query: &str,
    max_terms: usize,
) -> Option<Taxon> {
    if max_terms == 0 || query.trim().is_empty() {
        return None;
    }
    let taxa = match store.taxa().await {
        Ok(taxa) => taxa,
        Err(e) => {
            warn!(target: "sift::service", code = e.code_str(), error = %e, "Could not load taxa for inference");
            return None;
        }
    };
    let taxon = match_taxon(&taxon_names(&taxa), query, max_terms);
    if let Some(taxon) = &taxon {
        debug!(target: "sift::service", taxon = %taxon.scientific_name, "Inferred taxon from query");
    }
    taxon
}
