//! Engine configuration.
//!
//! Every value has a sensible default; a config file only needs the keys it
//! wants to change.

use crate::error::ConfigError;
use crate::model::SearchMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Deadline for BALANCED searches in milliseconds
pub const DEFAULT_DEADLINE_MS: u64 = 30_000;

/// Deadline for ACCURATE searches in milliseconds
pub const DEFAULT_ACCURATE_DEADLINE_MS: u64 = 60_000;

/// Parent terms kept in the child-term cache
pub const DEFAULT_CHILD_CACHE_CAPACITY: usize = 10_000;

/// Multiplier applied to normalized full-text scores
pub const DEFAULT_INDEX_HIT_PENALTY: f64 = 0.9;

/// Multiplier applied to results reached through an associated object
pub const DEFAULT_INDIRECT_HIT_PENALTY: f64 = 0.8;

/// Multiplier applied to annotations matched only through a descendant term
pub const DEFAULT_CHILD_TERM_PENALTY: f64 = 0.9;

/// Maximum genes derived from phenotype associations
pub const DEFAULT_PHENOTYPE_GENE_CAP: usize = 100;

/// Query words inspected when inferring a taxon
pub const DEFAULT_MAX_TERMS_FOR_TAXON_INFERENCE: usize = 4;

// ============================================================================
// SearchConfig
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    #[serde(default = "default_accurate_deadline_ms")]
    pub accurate_deadline_ms: u64,

    #[serde(default = "default_child_cache_capacity")]
    pub child_cache_capacity: usize,

    #[serde(default = "default_index_hit_penalty")]
    pub index_hit_penalty: f64,

    #[serde(default = "default_indirect_hit_penalty")]
    pub indirect_hit_penalty: f64,

    #[serde(default = "default_child_term_penalty")]
    pub child_term_penalty: f64,

    #[serde(default = "default_phenotype_gene_cap")]
    pub phenotype_gene_cap: usize,

    #[serde(default = "default_max_terms_for_taxon_inference")]
    pub max_terms_for_taxon_inference: usize,
}

fn default_deadline_ms() -> u64 {
    DEFAULT_DEADLINE_MS
}

fn default_accurate_deadline_ms() -> u64 {
    DEFAULT_ACCURATE_DEADLINE_MS
}

fn default_child_cache_capacity() -> usize {
    DEFAULT_CHILD_CACHE_CAPACITY
}

fn default_index_hit_penalty() -> f64 {
    DEFAULT_INDEX_HIT_PENALTY
}

fn default_indirect_hit_penalty() -> f64 {
    DEFAULT_INDIRECT_HIT_PENALTY
}

fn default_child_term_penalty() -> f64 {
    DEFAULT_CHILD_TERM_PENALTY
}

fn default_phenotype_gene_cap() -> usize {
    DEFAULT_PHENOTYPE_GENE_CAP
}

fn default_max_terms_for_taxon_inference() -> usize {
    DEFAULT_MAX_TERMS_FOR_TAXON_INFERENCE
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            deadline_ms: DEFAULT_DEADLINE_MS,
            accurate_deadline_ms: DEFAULT_ACCURATE_DEADLINE_MS,
            child_cache_capacity: DEFAULT_CHILD_CACHE_CAPACITY,
            index_hit_penalty: DEFAULT_INDEX_HIT_PENALTY,
            indirect_hit_penalty: DEFAULT_INDIRECT_HIT_PENALTY,
            child_term_penalty: DEFAULT_CHILD_TERM_PENALTY,
            phenotype_gene_cap: DEFAULT_PHENOTYPE_GENE_CAP,
            max_terms_for_taxon_inference: DEFAULT_MAX_TERMS_FOR_TAXON_INFERENCE,
        }
    }
}

impl SearchConfig {
    /// Deadline for a request in `mode`; `None` for FAST.
    pub fn deadline_for(&self, mode: SearchMode) -> Option<Duration> {
        match mode {
            SearchMode::Fast => None,
            SearchMode::Balanced => Some(Duration::from_millis(self.deadline_ms)),
            SearchMode::Accurate => Some(Duration::from_millis(self.accurate_deadline_ms)),
        }
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

/// YAML-backed configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store at the default location (`<config dir>/sift/config.yaml`).
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("sift").join("config.yaml"),
        }
    }

    /// Create a store at a custom path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the configuration; a missing file yields the defaults.
    pub fn load(&self) -> Result<SearchConfig, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(SearchConfig::default()),
            Ok(content) => Ok(serde_yaml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SearchConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, config: &SearchConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(config)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.index_hit_penalty, 0.9);
        assert_eq!(config.indirect_hit_penalty, 0.8);
        assert_eq!(config.phenotype_gene_cap, 100);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: SearchConfig = serde_yaml::from_str("deadline_ms: 250\n").unwrap();
        assert_eq!(config.deadline_ms, 250);
        assert_eq!(config.child_cache_capacity, DEFAULT_CHILD_CACHE_CAPACITY);
    }

    #[test]
    fn test_deadline_for_mode() {
        let config = SearchConfig::default();
        assert_eq!(config.deadline_for(SearchMode::Fast), None);
        assert_eq!(
            config.deadline_for(SearchMode::Balanced),
            Some(Duration::from_millis(DEFAULT_DEADLINE_MS))
        );
        assert_eq!(
            config.deadline_for(SearchMode::Accurate),
            Some(Duration::from_millis(DEFAULT_ACCURATE_DEADLINE_MS))
        );
    }

    #[test]
    fn test_store_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("missing.yaml"));
        assert!(!store.exists());
        assert_eq!(store.load().unwrap(), SearchConfig::default());
    }

    #[test]
    fn test_store_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("config.yaml"));
        let config = SearchConfig {
            deadline_ms: 5,
            ..SearchConfig::default()
        };
        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "deadline_ms: [not a number").unwrap();
        assert!(ConfigStore::new(path).load().is_err());
    }
}
