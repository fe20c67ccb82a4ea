//! Error types for filterform-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterFormError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate node id: {0}")]
    DuplicateId(String),
}

pub type Result<T> = std::result::Result<T, FilterFormError>;
