//! Supervised workers for the blackboard.
//!
//! An [`Action`] binds a worker callable to a [`bb_view::View`] and runs it
//! on a background thread under a retry policy: failures back off and are
//! counted, and too many in a row park the action in
//! [`ActionStatus::Failed`] until it is explicitly run again.
//!
//! Workers are resolved by `(path, name)` through a [`Loader`]; the
//! [`Registry`] is the static implementation.

pub mod action;
pub mod config;
pub mod error;
pub mod registry;

pub use action::{Action, ActionReport, ActionStatus};
pub use config::SupervisorConfig;
pub use error::{ActionError, ActionResult};
pub use registry::{library_of, Loader, Registry, Worker};
