//! Capability views over the blackboard store.
//!
//! A [`View`] is the only way workers touch the store. It enforces the
//! acquire/release protocol (no re-entrant acquisition, reads only under a
//! shared hold, writes only under a unique hold) and converts between typed
//! values and opaque payloads.
//!
//! # Modules
//!
//! - [`view`] — [`View`] and its [`ViewStatus`] state machine
//! - [`lock`] — [`Lock`], the scope-bound acquisition guard
//! - [`query`] — [`slot`]/[`entry`] and the variadic [`Fetch`]/[`Assign`] traits
//! - [`codec`] — JSON payload encoding
//! - [`error`] — [`LockError`] and [`ViewError`]

pub mod codec;
pub mod error;
pub mod lock;
pub mod query;
pub mod view;

pub use error::{LockError, ViewError, ViewResult};
pub use lock::Lock;
pub use query::{entry, slot, Assign, Entry, Fetch, Slot};
pub use view::{View, ViewStatus};
