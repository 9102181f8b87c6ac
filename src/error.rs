//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the query engine.
///
/// Per-shard fetch and cache I/O failures are deliberately not represented
/// here: they degrade a scan (skipped shard, cold cache) instead of failing
/// it, and are logged at the site.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The query could not be parsed or compiled into a matcher
    #[error("invalid query: {0}")]
    QuerySyntax(String),

    /// The corpus manifest could not be fetched or decoded
    #[error("corpus metadata unavailable: {0}")]
    CorpusMeta(String),

    /// The cache directory could not be opened
    #[error("cache error: {0}")]
    Cache(String),
}

impl From<regex::Error> for EngineError {
    fn from(e: regex::Error) -> Self {
        EngineError::QuerySyntax(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_syntax_display() {
        let err = EngineError::QuerySyntax("empty query".to_string());
        assert_eq!(err.to_string(), "invalid query: empty query");
    }

    #[test]
    fn test_from_regex_error() {
        let bad = regex::Regex::new("(unclosed").unwrap_err();
        let err: EngineError = bad.into();
        assert!(matches!(err, EngineError::QuerySyntax(_)));
    }
}
