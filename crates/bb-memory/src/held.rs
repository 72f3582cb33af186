use std::fmt;
use std::sync::Arc;

use bb_types::{Mode, Words};
use tracing::trace;

use crate::error::{StoreError, StoreResult};
use crate::node::Node;

/// A set of Node locks held together in one mode.
///
/// Nodes are locked in ascending word order, which is a single global order,
/// so no two `Held` acquisitions can wait on each other in a cycle. They are
/// unlocked in reverse order when the `Held` is dropped, on every exit path.
pub struct Held {
    mode: Mode,
    words: Words,
    nodes: Vec<Arc<Node>>,
}

impl Held {
    /// Lock `nodes` in `mode`, blocking until every lock is held.
    ///
    /// The nodes are sorted by word and deduplicated first; callers may pass
    /// them in any order.
    pub fn lock(mode: Mode, mut nodes: Vec<Arc<Node>>) -> StoreResult<Self> {
        if nodes.is_empty() {
            return Err(StoreError::EmptyWordSet);
        }
        nodes.sort_by(|a, b| a.word().cmp(b.word()));
        nodes.dedup_by(|a, b| a.word() == b.word());

        for node in &nodes {
            trace!(word = node.word(), %mode, "locking node");
            node.lock().lock(mode);
        }

        let words = nodes.iter().map(|n| n.word().to_string()).collect();
        Ok(Self { mode, words, nodes })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The held words in canonical order.
    pub fn words(&self) -> &Words {
        &self.words
    }

    /// The held Node for `word`.
    pub fn node(&self, word: &str) -> StoreResult<&Arc<Node>> {
        self.nodes
            .binary_search_by(|n| n.word().cmp(word))
            .map(|index| &self.nodes[index])
            .map_err(|_| StoreError::NotHeld {
                word: word.to_string(),
                held: self.words.clone(),
            })
    }

    /// The held Nodes for every word in `words`, in canonical order.
    pub fn nodes_for(&self, words: &Words) -> StoreResult<Vec<&Arc<Node>>> {
        if words.is_empty() {
            return Err(StoreError::EmptyWordSet);
        }
        words.iter().map(|word| self.node(word)).collect()
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        for node in self.nodes.iter().rev() {
            trace!(word = node.word(), mode = %self.mode, "unlocking node");
            node.lock().unlock(self.mode);
        }
    }
}

impl fmt::Debug for Held {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Held")
            .field("mode", &self.mode)
            .field("words", &self.words)
            .finish()
    }
}
