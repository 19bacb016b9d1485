use thiserror::Error;

pub type NoodlResult<T> = Result<T, NoodlError>;

#[derive(Error, Debug)]
pub enum NoodlError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Invalid blueprint: {reason}")]
    InvalidBlueprint { reason: String },

    #[error("Component '{id}' not found")]
    ComponentNotFound { id: String },

    #[error("Page '{id}' not found")]
    PageNotFound { id: String },

    #[error("Component '{id}' is not a list (found '{kind}')")]
    NotAList { id: String, kind: String },
}

/// Failure reasons reported in a list operation's result object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error("listObject is not initialized")]
    Uninitialized,

    #[error("Index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No data object matched")]
    NoMatch,
}
