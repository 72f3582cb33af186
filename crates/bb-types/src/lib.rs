//! Foundation types for the blackboard.
//!
//! Every other blackboard crate depends on `bb-types`.
//!
//! # Key Types
//!
//! - [`Word`] — an opaque string tag classifying Objects
//! - [`Words`] — a canonical (sorted, deduplicated) set of words; its
//!   iteration order is the global Node lock order
//! - [`ObjectId`] — process-unique identifier of an Object cell
//! - [`Mode`] — shared or unique Node lock mode

pub mod error;
pub mod mode;
pub mod object;
pub mod words;

pub use error::TypeError;
pub use mode::Mode;
pub use object::ObjectId;
pub use words::{Word, Words};
