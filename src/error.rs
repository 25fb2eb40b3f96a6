use thiserror::Error;

/// Joint tracker error types
///
/// Per-frame filtering and transform composition never fail; these cover
/// construction, configuration and recording I/O.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid joint hierarchy: {0}")]
    InvalidHierarchy(String),

    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed recording at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[source] serde_json::Error),

    #[error("Filter worker panicked")]
    WorkerPanicked,
}

/// Result type for joint tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = TrackerError::InvalidHierarchy("HipLeft has two parents".to_string());
        assert!(err.to_string().contains("two parents"));

        let err = TrackerError::UnknownJoint("Tail".to_string());
        assert_eq!(err.to_string(), "Unknown joint: Tail");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = TrackerError::Parse { line: 7, source };
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.jsonl");
        let err: TrackerError = io.into();
        assert!(matches!(err, TrackerError::Io(_)));
    }
}
