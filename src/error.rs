use thiserror::Error;

/// Main error type for relgraph
#[derive(Error, Debug)]
pub enum RelgraphError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding errors (annotated corpus, annotator payloads)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decoding errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A mention or token is missing a required field; the sentence is rejected
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A relation candidate references a node that does not exist
    #[error("Missing endpoint: {subject} -> {object}")]
    MissingEndpoint { subject: String, object: String },

    /// A per-sentence worker panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Convenient Result type using RelgraphError
pub type Result<T> = std::result::Result<T, RelgraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RelgraphError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_missing_endpoint_display() {
        let err = RelgraphError::MissingEndpoint {
            subject: "character:Naruto".to_string(),
            object: "group:Akatsuki".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing endpoint: character:Naruto -> group:Akatsuki"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RelgraphError = io_err.into();
        assert!(matches!(err, RelgraphError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RelgraphError = json_err.into();
        assert!(matches!(err, RelgraphError::Json(_)));
    }
}
