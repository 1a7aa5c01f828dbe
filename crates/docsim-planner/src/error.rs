use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlanError>;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Sim(#[from] docsim_core::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("malformed query '{query}': {reason}")]
    Malformed { query: String, reason: String },
}

impl PlanError {
    pub(crate) fn malformed(query: &str, reason: impl Into<String>) -> Self {
        PlanError::Malformed {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}
