use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid style configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Live surface error: {0}")]
    Surface(String),

    #[error("PDF writer error: {0}")]
    Writer(String),

    #[error("{0} produced an empty PDF")]
    EmptyOutput(&'static str),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Export worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Convenience type alias for Results with [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn error_display() {
        let err = Error::InvalidConfig("font size must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid style configuration: font size must be positive"
        );

        let err = Error::EmptyOutput("static writer");
        assert_eq!(err.to_string(), "static writer produced an empty PDF");

        assert_eq!(Error::Cancelled.to_string(), "Export cancelled");
    }
}
