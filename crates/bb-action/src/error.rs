use std::io;
use std::path::PathBuf;

/// Errors produced by the action subsystem.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The loader has no worker under this library and name.
    #[error("worker {name} not found in library {library}")]
    UnknownWorker { library: String, name: String },

    /// The worker path has no usable file stem.
    #[error("invalid worker path: {0}")]
    InvalidPath(PathBuf),

    /// A worker with this library and name is already registered.
    #[error("worker {name} already registered in library {library}")]
    DuplicateWorker { library: String, name: String },

    /// The consecutive-failure threshold was exceeded.
    #[error("action {name} failed after {failures} consecutive errors")]
    Supervision { name: String, failures: usize },

    /// The background thread could not be started.
    #[error("failed to spawn task for action {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Convenience alias used throughout the action crate.
pub type ActionResult<T> = std::result::Result<T, ActionError>;
