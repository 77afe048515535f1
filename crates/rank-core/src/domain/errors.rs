use thiserror::Error;

/// Every failure the ranking pipeline can surface. All of them end the current
/// run: no partial model is persisted and no partial ranking is written.
#[derive(Error, Debug)]
pub enum RankError {
    /// A referenced column is absent from the dataset.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A numeric column holds values that do not coerce to a number.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Not enough rows for balancing or cross-validation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A learner could not be fitted.
    #[error("Fit error: {0}")]
    Fit(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Frame(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RankError::Schema("missing column 'srch_id'".to_string());
        assert_eq!(err.to_string(), "Schema error: missing column 'srch_id'");

        let err = RankError::InsufficientData("2 rows < 3 folds".to_string());
        assert!(err.to_string().starts_with("Insufficient data"));
    }

    #[test]
    fn test_io_conversion() {
        fn open_missing() -> Result<()> {
            std::fs::File::open("/definitely/not/here.csv")?;
            Ok(())
        }
        assert!(matches!(open_missing(), Err(RankError::Io(_))));
    }
}
