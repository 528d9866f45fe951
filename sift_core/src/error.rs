use crate::query::QueryParseError;

/// Errors that abort a search request.
///
/// Only a query that cannot be parsed even after escaping surfaces here; every
/// source failure degrades into a smaller result set instead.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Query could not be parsed: '{original}' (escaped retry '{escaped}' also failed: {message})")]
    QueryParse {
        original: String,
        escaped: String,
        message: String,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl SearchError {
    pub(crate) fn query_parse(original: &str, escaped: &str, err: &QueryParseError) -> Self {
        SearchError::QueryParse {
            original: original.to_string(),
            escaped: escaped.to_string(),
            message: err.to_string(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            SearchError::QueryParse { .. } => "query_parse",
            SearchError::InvalidSettings(_) => "invalid_settings",
        }
    }
}

/// Errors raised by an external collaborator (store, index, ontology).
///
/// These are logged and swallowed by the searchers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Source '{source_name}' unavailable: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },

    #[error("Source '{source_name}' timed out after {elapsed_ms}ms")]
    Timeout { source_name: String, elapsed_ms: u64 },

    #[error("Ontology error: {0}")]
    Ontology(String),
}

impl SourceError {
    pub fn unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Unavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            SourceError::Unavailable { .. } => "unavailable",
            SourceError::Timeout { .. } => "timeout",
            SourceError::Ontology(_) => "ontology",
        }
    }
}

/// Errors from configuration and catalog files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_codes() {
        assert_eq!(SourceError::unavailable("index", "down").code_str(), "unavailable");
        let timeout = SourceError::Timeout {
            source_name: "index".to_string(),
            elapsed_ms: 50,
        };
        assert_eq!(timeout.code_str(), "timeout");
        assert!(timeout.to_string().contains("50ms"));
    }

    #[test]
    fn test_query_parse_message_carries_both_variants() {
        let err = SearchError::QueryParse {
            original: "C++".to_string(),
            escaped: "C\\+\\+".to_string(),
            message: "boom".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("'C++'"));
        assert!(text.contains("C\\+\\+"));
        assert_eq!(err.code_str(), "query_parse");
    }
}
