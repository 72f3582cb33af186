use bb_types::{Mode, Word, Words};

use crate::error::StoreResult;
use crate::held::Held;
use crate::object::Payload;

/// Tag-indexed object store consumed by views.
///
/// All implementations must satisfy these invariants:
/// - A word set resolves to the Objects tagged by every word in it
///   (set intersection). Zero matches is not-found for reads and creates a
///   fresh Object on writes; two or more matches is always an ambiguity
///   error, never silently resolved.
/// - After a successful `write`, exactly one Object is present in every
///   Node named by the word set.
/// - `acquire` locks Nodes in ascending word order and the returned [`Held`]
///   releases them in reverse order.
/// - Store errors are never retried internally; they go to the caller.
pub trait Store: Send + Sync {
    /// Lock the Nodes named by `words` in `mode`.
    ///
    /// In [`Mode::Unique`] Nodes that do not exist yet are created. In
    /// [`Mode::Shared`] an unknown word is an error.
    fn acquire(&self, mode: Mode, words: &Words) -> StoreResult<Held>;

    /// Resolve `words` against the held Nodes and return the payload.
    fn read(&self, held: &Held, words: &Words) -> StoreResult<Payload>;

    /// Resolve `words` against the held Nodes and store `payload`, creating
    /// a new Object when nothing matches. `held` must be unique.
    fn write(&self, held: &Held, words: &Words, payload: Payload) -> StoreResult<()>;

    /// Register a Node for `word`. Fails if it already exists.
    fn append_node(&self, word: &str) -> StoreResult<()>;

    /// Remove the Node for `word`. Objects it shares with other Nodes stay
    /// reachable through them.
    fn remove_node(&self, word: &str) -> StoreResult<()>;

    /// Returns `true` if a Node exists for `word`.
    fn contains(&self, word: &str) -> bool;

    /// All registered words, sorted.
    fn words(&self) -> Vec<Word>;

    /// Read `words` in a single shared critical section.
    fn get(&self, words: &Words) -> StoreResult<Payload> {
        let held = self.acquire(Mode::Shared, words)?;
        self.read(&held, words)
    }

    /// Write `words` in a single unique critical section.
    fn set(&self, words: &Words, payload: Payload) -> StoreResult<()> {
        let held = self.acquire(Mode::Unique, words)?;
        self.write(&held, words, payload)
    }
}
