use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bb_types::{Mode, Word, Words};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::held::Held;
use crate::node::Node;
use crate::object::{Object, Payload};
use crate::persist::{self, NodeRecord};
use crate::traits::Store;

/// The blackboard store: a mapping from word to [`Node`].
///
/// The word map has its own lock, taken only long enough to look up or
/// register Nodes; it is never held while a Node lock is awaited. All
/// Object access is guarded by the per-Node locks of a [`Held`] set.
pub struct Memory {
    nodes: RwLock<HashMap<Word, Arc<Node>>>,
}

impl Memory {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store with a Node pre-registered for each word.
    pub fn with_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Word>,
    {
        let nodes = words
            .into_iter()
            .map(|w| {
                let word = w.into();
                (word.clone(), Arc::new(Node::new(word)))
            })
            .collect();
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Load a store whose Nodes are pre-registered from a node-list file.
    ///
    /// A missing file yields an empty store.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let records: Vec<NodeRecord> = persist::read_records(path)?;
        info!(path = %path.display(), count = records.len(), "loaded node list");
        Ok(Self::with_words(records.into_iter().map(|r| r.word)))
    }

    /// Save the current word list, sorted, to a node-list file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let records: Vec<NodeRecord> = self
            .words()
            .into_iter()
            .map(|word| NodeRecord { word })
            .collect();
        persist::write_records(path, &records)?;
        info!(path = %path.display(), count = records.len(), "saved node list");
        Ok(())
    }

    fn map(&self) -> RwLockReadGuard<'_, HashMap<Word, Arc<Node>>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn map_mut(&self) -> RwLockWriteGuard<'_, HashMap<Word, Arc<Node>>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of registered Nodes.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// The Node registered for `word`, if any.
    pub fn node(&self, word: &str) -> Option<Arc<Node>> {
        self.map().get(word).cloned()
    }

    /// Number of Objects currently tagged by `word`.
    pub fn object_count(&self, word: &str) -> StoreResult<usize> {
        self.node(word)
            .map(|n| n.len())
            .ok_or_else(|| StoreError::UnknownWord(word.to_string()))
    }

    /// Look up the Nodes for `words`, creating missing ones when `create`.
    fn nodes_for(&self, words: &Words, create: bool) -> StoreResult<Vec<Arc<Node>>> {
        if words.is_empty() {
            return Err(StoreError::EmptyWordSet);
        }

        {
            let map = self.map();
            let found: Vec<Arc<Node>> = words.iter().filter_map(|w| map.get(w).cloned()).collect();
            if found.len() == words.len() {
                return Ok(found);
            }
            if !create {
                let missing = words
                    .iter()
                    .find(|w| !map.contains_key(*w))
                    .unwrap_or_default();
                return Err(StoreError::UnknownWord(missing.to_string()));
            }
        }

        let mut map = self.map_mut();
        Ok(words
            .iter()
            .map(|word| {
                Arc::clone(map.entry(word.to_string()).or_insert_with(|| {
                    debug!(word, "node created");
                    Arc::new(Node::new(word))
                }))
            })
            .collect())
    }
}

/// The Objects tagged by every word in `words`.
///
/// Iterates the smallest of the named Nodes and keeps the Objects present in
/// all the others.
fn intersect(held: &Held, words: &Words) -> StoreResult<Vec<Arc<Object>>> {
    let nodes = held.nodes_for(words)?;
    let Some(pivot) = nodes.iter().min_by_key(|n| n.len()) else {
        return Err(StoreError::EmptyWordSet);
    };

    Ok(pivot
        .objects()
        .into_iter()
        .filter(|object| {
            nodes
                .iter()
                .filter(|n| n.word() != pivot.word())
                .all(|n| n.contains(object.id()))
        })
        .collect())
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for Memory {
    fn acquire(&self, mode: Mode, words: &Words) -> StoreResult<Held> {
        let nodes = self.nodes_for(words, mode == Mode::Unique)?;
        let held = Held::lock(mode, nodes)?;
        debug!(%mode, %words, "acquired");
        Ok(held)
    }

    fn read(&self, held: &Held, words: &Words) -> StoreResult<Payload> {
        let mut matches = intersect(held, words)?;
        match matches.len() {
            0 => Err(StoreError::NotFound {
                words: words.clone(),
            }),
            1 => Ok(matches.remove(0).read()),
            candidates => Err(StoreError::Ambiguous {
                words: words.clone(),
                candidates,
            }),
        }
    }

    fn write(&self, held: &Held, words: &Words, payload: Payload) -> StoreResult<()> {
        if held.mode() != Mode::Unique {
            return Err(StoreError::ReadOnly {
                words: words.clone(),
            });
        }

        let mut matches = intersect(held, words)?;
        match matches.len() {
            0 => {
                let object = Arc::new(Object::new(payload));
                for node in held.nodes_for(words)? {
                    node.insert(Arc::clone(&object))?;
                }
                debug!(id = %object.id(), %words, "object created");
                Ok(())
            }
            1 => {
                matches.remove(0).replace(payload);
                Ok(())
            }
            candidates => Err(StoreError::Ambiguous {
                words: words.clone(),
                candidates,
            }),
        }
    }

    fn append_node(&self, word: &str) -> StoreResult<()> {
        let mut map = self.map_mut();
        if map.contains_key(word) {
            return Err(StoreError::DuplicateNode(word.to_string()));
        }
        map.insert(word.to_string(), Arc::new(Node::new(word)));
        debug!(word, "node appended");
        Ok(())
    }

    fn remove_node(&self, word: &str) -> StoreResult<()> {
        self.map_mut()
            .remove(word)
            .map(|_| debug!(word, "node removed"))
            .ok_or_else(|| StoreError::UnknownWord(word.to_string()))
    }

    fn contains(&self, word: &str) -> bool {
        self.map().contains_key(word)
    }

    fn words(&self) -> Vec<Word> {
        let mut words: Vec<Word> = self.map().keys().cloned().collect();
        words.sort();
        words
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("node_count", &self.len())
            .finish()
    }
}
