//! Query syntax errors.

/// A query string that could not be tokenized or parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at position {position} in '{input}'")]
pub struct QueryParseError {
    pub message: String,
    /// Byte offset into `input` where the problem was found.
    pub position: usize,
    pub input: String,
}

impl QueryParseError {
    pub fn new(message: impl Into<String>, position: usize, input: &str) -> Self {
        Self {
            message: message.into(),
            position,
            input: input.to_string(),
        }
    }

    /// Multi-line rendering with a caret under the failing position.
    pub fn format_with_context(&self) -> String {
        let caret_offset = self.input[..self.position.min(self.input.len())]
            .chars()
            .count();
        format!(
            "query syntax error: {}\n  {}\n  {}^",
            self.message,
            self.input,
            " ".repeat(caret_offset)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_points_at_position() {
        let err = QueryParseError::new("unexpected ')'", 4, "abc )");
        let rendered = err.format_with_context();
        assert!(rendered.ends_with("    ^"));
        assert!(err.to_string().contains("position 4"));
    }
}
