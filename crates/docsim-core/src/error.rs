use thiserror::Error;

/// Canonical result for core and the crates layered on it.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation failures. None of these are transient: the caller has to fix
/// the scenario definition and run again.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Statistics error: {0}")]
    Statistics(String),

    #[error("Shard key error: {0}")]
    ShardKey(String),

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("Join key error: {0}")]
    JoinKey(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid operator parameter: {0}")]
    Parameter(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
