//! Blackboard orchestration.
//!
//! [`System`] owns the single [`bb_memory::Memory`] store and the named
//! roster of [`bb_action::Action`]s. It restores both from data files at
//! start-up and writes them back at shutdown.

pub mod config;
pub mod error;
pub mod roster;
pub mod system;

pub use config::SystemConfig;
pub use error::{SystemError, SystemResult};
pub use roster::ActionRecord;
pub use system::System;
