use thiserror::Error;

pub type SurveyResult<T> = Result<T, SurveyError>;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the append-only recorders. Storage is an external
/// collaborator, so this stays engine-agnostic.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage connection failed: {0}")]
    Connection(String),
}
