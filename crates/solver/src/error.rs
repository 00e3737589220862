use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("catalog error: {0}")]
    Catalog(#[from] craftplan_core::CoreError),
    #[error("no rotation can guarantee success within the step budget")]
    Infeasible,
    #[error("io error: {0}")]
    Io(String),
    #[error("serialize error: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for SolverError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for SolverError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value.to_string())
    }
}
