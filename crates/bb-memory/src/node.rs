use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};

use bb_types::{Mode, ObjectId, Word};

use crate::error::{StoreError, StoreResult};
use crate::object::Object;

#[derive(Debug, Default)]
struct GateState {
    readers: usize,
    writer: bool,
    waiting_writers: usize,
}

/// Reader/writer lock guarding one Node.
///
/// Unlike `std::sync::RwLock`, locking and unlocking are explicit calls rather
/// than scoped guards, so one owner can hold the locks of several Nodes at once
/// and release them in a chosen order. Waiting writers block new readers, so a
/// steady stream of `get` traffic cannot starve a `set`.
///
/// Every `lock_*` must be paired with exactly one matching `unlock_*`;
/// [`Held`](crate::Held) is the only caller in this crate.
#[derive(Default)]
pub struct NodeLock {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl NodeLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the lock is held in `mode`.
    pub fn lock(&self, mode: Mode) {
        match mode {
            Mode::Shared => self.lock_shared(),
            Mode::Unique => self.lock_unique(),
        }
    }

    /// Release a hold previously taken in `mode`.
    pub fn unlock(&self, mode: Mode) {
        match mode {
            Mode::Shared => self.unlock_shared(),
            Mode::Unique => self.unlock_unique(),
        }
    }

    pub fn lock_shared(&self) {
        let mut state = self.state();
        while state.writer || state.waiting_writers > 0 {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.readers += 1;
    }

    pub fn lock_unique(&self) {
        let mut state = self.state();
        state.waiting_writers += 1;
        while state.writer || state.readers > 0 {
            state = self
                .cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.waiting_writers -= 1;
        state.writer = true;
    }

    pub fn unlock_shared(&self) {
        let mut state = self.state();
        debug_assert!(state.readers > 0, "unlock_shared without a shared hold");
        state.readers = state.readers.saturating_sub(1);
        if state.readers == 0 {
            self.cond.notify_all();
        }
    }

    pub fn unlock_unique(&self) {
        let mut state = self.state();
        debug_assert!(state.writer, "unlock_unique without a unique hold");
        state.writer = false;
        self.cond.notify_all();
    }

    /// Try to take the lock in `mode` without blocking.
    pub fn try_lock(&self, mode: Mode) -> bool {
        let mut state = self.state();
        match mode {
            Mode::Shared if !state.writer && state.waiting_writers == 0 => {
                state.readers += 1;
                true
            }
            Mode::Unique if !state.writer && state.readers == 0 => {
                state.writer = true;
                true
            }
            _ => false,
        }
    }

    /// Number of current shared holders.
    pub fn readers(&self) -> usize {
        self.state().readers
    }

    /// Returns `true` while a unique holder exists.
    pub fn is_unique(&self) -> bool {
        self.state().writer
    }
}

impl fmt::Debug for NodeLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("NodeLock")
            .field("readers", &state.readers)
            .field("writer", &state.writer)
            .field("waiting_writers", &state.waiting_writers)
            .finish()
    }
}

/// The set of Objects classified by one word.
///
/// Membership is only changed while the Node's [`NodeLock`] is held uniquely,
/// and only read while it is held in either mode. The membership map's own
/// `RwLock` is therefore never contended; it is held for single operations.
pub struct Node {
    word: Word,
    objects: RwLock<BTreeMap<ObjectId, Arc<Object>>>,
    lock: NodeLock,
}

impl Node {
    pub fn new(word: impl Into<Word>) -> Self {
        Self {
            word: word.into(),
            objects: RwLock::new(BTreeMap::new()),
            lock: NodeLock::new(),
        }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// The Node's reader/writer lock. Acquired by the caller, never by the
    /// Node itself.
    pub fn lock(&self) -> &NodeLock {
        &self.lock
    }

    /// Add an Object to this Node.
    pub fn insert(&self, object: Arc<Object>) -> StoreResult<()> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        let id = object.id();
        if objects.contains_key(&id) {
            return Err(StoreError::DuplicateObject {
                word: self.word.clone(),
                id,
            });
        }
        objects.insert(id, object);
        Ok(())
    }

    /// Remove an Object from this Node, returning it.
    pub fn remove(&self, id: ObjectId) -> StoreResult<Arc<Object>> {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or_else(|| StoreError::ObjectNotInNode {
                word: self.word.clone(),
                id,
            })
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Number of Objects currently tagged by this word.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the Objects tagged by this word, ordered by id.
    pub fn objects(&self) -> Vec<Arc<Object>> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("word", &self.word)
            .field("objects", &self.len())
            .field("lock", &self.lock)
            .finish()
    }
}
