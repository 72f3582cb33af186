//! Tag-indexed concurrent object store for the blackboard.
//!
//! Callers address a data cell by an unordered set of string tags ("words")
//! rather than by a single key. Every word owns a [`Node`]: the set of Objects
//! it classifies plus a reader/writer lock. A word set resolves to the Objects
//! present in all of its Nodes.
//!
//! # Resolution
//!
//! - 0 matches: not-found on read, a fresh [`Object`] tagged by every word on
//!   write.
//! - 1 match: read or replace it in place.
//! - 2+ matches: [`StoreError::Ambiguous`], for reads and writes alike.
//!
//! # Locking
//!
//! There is no global lock over Objects. A [`Held`] set locks the Nodes of a
//! word set in ascending word order and unlocks them in reverse on drop;
//! because the order is global, concurrent multi-word acquisitions cannot
//! deadlock. Shared holds on a Node coexist; a unique hold excludes all others.
//!
//! # Design Rules
//!
//! 1. Objects are replaced whole, never partially updated.
//! 2. Objects are never collected automatically; removing a Node only drops
//!    that Node's references.
//! 3. Nodes are created by unique acquisitions or explicit registration,
//!    never by reads.
//! 4. Separate acquisitions are independent critical sections; there is no
//!    snapshot isolation across calls.

pub mod error;
pub mod held;
pub mod memory;
pub mod node;
pub mod object;
pub mod persist;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use held::Held;
pub use memory::Memory;
pub use node::{Node, NodeLock};
pub use object::{Object, Payload};
pub use persist::NodeRecord;
pub use traits::Store;
