use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid lock mode: {0} (expected `shared` or `unique`)")]
    InvalidMode(String),
}
