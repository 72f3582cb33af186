//! Error types for view operations.

use bb_memory::StoreError;
use bb_types::{Mode, Words};
use thiserror::Error;

use crate::view::ViewStatus;

/// Violations of the acquire/release protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    /// The operation needs an acquisition in a different mode (or none exists).
    #[error("operation requires a {required} acquisition, view is {status}")]
    WrongMode { required: Mode, status: ViewStatus },

    /// `acquire` was called while the view already holds a lock set.
    #[error("view already {status}")]
    DoubleAcquire { status: ViewStatus },

    /// `release` does not match the current acquisition.
    #[error("cannot release {mode} {words}: view is {status}")]
    ReleaseWithoutAcquire {
        mode: Mode,
        words: Words,
        status: ViewStatus,
    },
}

/// Errors returned to callers of a [`View`](crate::View).
#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    /// The stored payload does not decode as the requested type.
    #[error("cannot decode value at {words}: {reason}")]
    Decode { words: Words, reason: String },

    /// The value cannot be represented in the payload encoding.
    #[error("cannot encode value for {words}: {reason}")]
    Encode { words: Words, reason: String },
}

/// Convenience type alias for view operations.
pub type ViewResult<T> = Result<T, ViewError>;
