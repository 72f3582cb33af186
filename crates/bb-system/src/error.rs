use thiserror::Error;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("action already exists: {0}")]
    DuplicateAction(String),

    #[error("action not found: {0}")]
    UnknownAction(String),

    #[error("store error: {0}")]
    Store(#[from] bb_memory::StoreError),

    #[error("action error: {0}")]
    Action(#[from] bb_action::ActionError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SystemResult<T> = Result<T, SystemError>;
