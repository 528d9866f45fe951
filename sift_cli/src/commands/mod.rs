pub mod config;
pub mod kinds;
pub mod search;

use crate::cli::Cli;
use sift_core::ConfigStore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Search failed: {0}")]
    Search(#[from] sift_core::SearchError),

    #[error("Configuration error: {0}")]
    Config(#[from] sift_core::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// The config store selected by `--config`, or the default location.
pub fn config_store(cli: &Cli) -> ConfigStore {
    match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::new_default(),
    }
}
