use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bb_memory::{Held, Store};
use bb_types::{Mode, Words};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::codec;
use crate::error::{LockError, ViewResult};
use crate::lock::Lock;
use crate::query::{Assign, Fetch};

/// Acquisition state of a [`View`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewStatus {
    Released,
    AcquiredShared,
    AcquiredUnique,
}

impl ViewStatus {
    fn of(mode: Mode) -> Self {
        match mode {
            Mode::Shared => Self::AcquiredShared,
            Mode::Unique => Self::AcquiredUnique,
        }
    }
}

impl fmt::Display for ViewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Released => "released",
            Self::AcquiredShared => "acquired shared",
            Self::AcquiredUnique => "acquired unique",
        })
    }
}

/// A capability handle bound to one store.
///
/// A view moves through `Released -> AcquiredShared -> Released` or
/// `Released -> AcquiredUnique -> Released`. Acquisition is not re-entrant:
/// acquiring again before releasing is [`LockError::DoubleAcquire`]. While
/// acquired shared only [`read`](Self::read) is allowed; while acquired
/// unique only [`write`](Self::write).
///
/// Most callers use the one-shot [`get`](Self::get) / [`set`](Self::set),
/// which lock the union of all words involved, do the work, and release.
pub struct View {
    id: Uuid,
    store: Arc<dyn Store>,
    held: Mutex<Option<Held>>,
}

impl View {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            id: Uuid::now_v7(),
            store,
            held: Mutex::new(None),
        }
    }

    /// Identifier used in log records.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The store this view is bound to.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn slot(&self) -> MutexGuard<'_, Option<Held>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status_of(held: &Option<Held>) -> ViewStatus {
        held.as_ref()
            .map_or(ViewStatus::Released, |h| ViewStatus::of(h.mode()))
    }

    pub fn status(&self) -> ViewStatus {
        Self::status_of(&self.slot())
    }

    /// Lock the Nodes of `words` in `mode`.
    ///
    /// Blocks until every Node lock is held. Unique acquisitions create
    /// missing Nodes; shared acquisitions of unknown words fail.
    pub fn acquire(&self, mode: Mode, words: &Words) -> ViewResult<()> {
        let status = self.status();
        if status != ViewStatus::Released {
            return Err(LockError::DoubleAcquire { status }.into());
        }

        // The slot is not held while waiting for Node locks.
        let held = self.store.acquire(mode, words)?;

        let mut slot = self.slot();
        if slot.is_some() {
            let status = Self::status_of(&slot);
            drop(slot);
            drop(held);
            return Err(LockError::DoubleAcquire { status }.into());
        }
        *slot = Some(held);
        debug!(view = %self.id, %mode, %words, "view acquired");
        Ok(())
    }

    /// Release the acquisition made with the same `mode` and `words`.
    pub fn release(&self, mode: Mode, words: &Words) -> ViewResult<()> {
        let mut slot = self.slot();
        let matches = slot
            .as_ref()
            .is_some_and(|h| h.mode() == mode && h.words() == words);
        if !matches {
            return Err(LockError::ReleaseWithoutAcquire {
                mode,
                words: words.clone(),
                status: Self::status_of(&slot),
            }
            .into());
        }
        let held = slot.take();
        drop(slot);
        drop(held);
        debug!(view = %self.id, %mode, %words, "view released");
        Ok(())
    }

    /// Acquire and return a guard that releases on drop.
    pub fn lock(&self, mode: Mode, words: impl Into<Words>) -> ViewResult<Lock<'_>> {
        let words = words.into();
        self.acquire(mode, &words)?;
        Ok(Lock::new(self, mode, words))
    }

    fn with_held<R>(
        &self,
        required: Mode,
        f: impl FnOnce(&Held) -> ViewResult<R>,
    ) -> ViewResult<R> {
        let slot = self.slot();
        match slot.as_ref() {
            Some(held) if held.mode() == required => f(held),
            _ => Err(LockError::WrongMode {
                required,
                status: Self::status_of(&slot),
            }
            .into()),
        }
    }

    /// Read a typed value inside a shared acquisition.
    pub fn read<T: DeserializeOwned>(&self, words: impl Into<Words>) -> ViewResult<T> {
        let words = words.into();
        let payload = self.with_held(Mode::Shared, |held| Ok(self.store.read(held, &words)?))?;
        trace!(view = %self.id, %words, "read");
        codec::decode(&words, &payload)
    }

    /// Write a typed value inside a unique acquisition.
    pub fn write<T: Serialize + ?Sized>(&self, words: impl Into<Words>, value: &T) -> ViewResult<()> {
        let words = words.into();
        let payload = codec::encode(&words, value)?;
        self.with_held(Mode::Unique, |held| Ok(self.store.write(held, &words, payload)?))?;
        trace!(view = %self.id, %words, "write");
        Ok(())
    }

    /// Read one or more typed slots in a single shared critical section.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use bb_memory::Memory;
    /// use bb_types::words;
    /// use bb_view::{entry, slot, View};
    ///
    /// let view = View::new(Arc::new(Memory::new()));
    /// view.set((
    ///     entry(words!["GAZP", "total", "ask"], 100),
    ///     entry(words!["GAZP", "total", "bid"], 50),
    /// )).unwrap();
    ///
    /// let (ask, bid): (i64, i64) = view
    ///     .get((slot(words!["GAZP", "total", "ask"]), slot(words!["GAZP", "total", "bid"])))
    ///     .unwrap();
    /// assert_eq!((ask, bid), (100, 50));
    /// ```
    pub fn get<Q: Fetch>(&self, query: Q) -> ViewResult<Q::Output> {
        let mut union = Words::new();
        query.collect_words(&mut union);
        let lock = self.lock(Mode::Shared, union)?;
        let output = query.fetch(self)?;
        lock.release()?;
        Ok(output)
    }

    /// Write one or more typed entries in a single unique critical section.
    pub fn set<A: Assign>(&self, assignment: A) -> ViewResult<()> {
        let mut union = Words::new();
        assignment.collect_words(&mut union);
        let lock = self.lock(Mode::Unique, union)?;
        assignment.assign(self)?;
        lock.release()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewError;
    use crate::query::{entry, slot};
    use bb_memory::{Memory, StoreError};
    use bb_types::words;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn view() -> View {
        View::new(Arc::new(Memory::new()))
    }

    fn views(n: usize) -> (Arc<Memory>, Vec<Arc<View>>) {
        let memory = Arc::new(Memory::new());
        let views = (0..n)
            .map(|_| Arc::new(View::new(memory.clone() as Arc<dyn Store>)))
            .collect();
        (memory, views)
    }

    // -----------------------------------------------------------------------
    // Typed get/set
    // -----------------------------------------------------------------------

    #[test]
    fn probability_scenario() {
        let view = view();
        let ws = words!["GAZP", "M1", "probability", "BO"];
        view.set(entry(ws.clone(), 0.8_f64)).unwrap();
        let p: f64 = view.get(slot(ws)).unwrap();
        assert_eq!(p, 0.8);
    }

    #[test]
    fn ask_bid_scenario() {
        let view = view();
        view.set((
            entry(words!["GAZP", "total", "ask"], 100_i64),
            entry(words!["GAZP", "total", "bid"], 50_i64),
        ))
        .unwrap();

        let ask: i64 = view.get(slot(words!["GAZP", "total", "ask"])).unwrap();
        assert_eq!(ask, 100);

        let err = view.get(slot::<i64>(words!["GAZP", "total"])).unwrap_err();
        assert!(matches!(
            err,
            ViewError::Store(StoreError::Ambiguous { candidates: 2, .. })
        ));
        assert_eq!(view.status(), ViewStatus::Released);
    }

    #[test]
    fn heterogeneous_tuple() {
        let view = view();
        view.set((
            entry(words!["name"], "GAZP".to_string()),
            entry(words!["lot"], 10_u32),
            entry(words!["open"], true),
        ))
        .unwrap();
        let (name, lot, open): (String, u32, bool) = view
            .get((slot(words!["name"]), slot(words!["lot"]), slot(words!["open"])))
            .unwrap();
        assert_eq!(name, "GAZP");
        assert_eq!(lot, 10);
        assert!(open);
    }

    #[test]
    fn vec_of_slots() {
        let view = view();
        let entries: Vec<_> = ["BO", "BC", "SO"]
            .iter()
            .enumerate()
            .map(|(i, key)| entry(words!["GAZP", "M1", *key], i as f64 / 10.0))
            .collect();
        view.set(entries).unwrap();

        let slots: Vec<_> = ["BO", "BC", "SO"]
            .iter()
            .map(|key| slot::<f64>(words!["GAZP", "M1", *key]))
            .collect();
        assert_eq!(view.get(slots).unwrap(), vec![0.0, 0.1, 0.2]);
    }

    #[test]
    fn decode_mismatch() {
        let view = view();
        view.set(entry(words!["p"], "text")).unwrap();
        let err = view.get(slot::<f64>(words!["p"])).unwrap_err();
        assert!(matches!(err, ViewError::Decode { .. }));
        assert_eq!(view.status(), ViewStatus::Released);
    }

    #[test]
    fn get_unknown_word() {
        let view = view();
        let err = view.get(slot::<f64>(words!["nothing"])).unwrap_err();
        assert!(matches!(err, ViewError::Store(StoreError::UnknownWord(_))));
        assert_eq!(view.status(), ViewStatus::Released);
    }

    // -----------------------------------------------------------------------
    // Protocol
    // -----------------------------------------------------------------------

    #[test]
    fn double_acquire_is_rejected() {
        let view = view();
        let ws = words!["a"];
        view.acquire(Mode::Unique, &ws).unwrap();
        let err = view.acquire(Mode::Shared, &ws).unwrap_err();
        assert!(matches!(
            err,
            ViewError::Lock(LockError::DoubleAcquire {
                status: ViewStatus::AcquiredUnique
            })
        ));
        view.release(Mode::Unique, &ws).unwrap();
        assert_eq!(view.status(), ViewStatus::Released);
    }

    #[test]
    fn double_acquire_while_shared_is_rejected() {
        let view = view();
        let ws = words!["a"];
        view.set(entry(ws.clone(), 1_u8)).unwrap();

        view.acquire(Mode::Shared, &ws).unwrap();
        for mode in [Mode::Shared, Mode::Unique] {
            let err = view.acquire(mode, &ws).unwrap_err();
            assert!(matches!(
                err,
                ViewError::Lock(LockError::DoubleAcquire {
                    status: ViewStatus::AcquiredShared
                })
            ));
        }
        assert_eq!(view.status(), ViewStatus::AcquiredShared);
        view.release(Mode::Shared, &ws).unwrap();
        assert_eq!(view.status(), ViewStatus::Released);
    }

    #[test]
    fn release_without_acquire() {
        let view = view();
        let err = view.release(Mode::Shared, &words!["a"]).unwrap_err();
        assert!(matches!(
            err,
            ViewError::Lock(LockError::ReleaseWithoutAcquire { .. })
        ));
    }

    #[test]
    fn release_in_other_mode_is_rejected() {
        let view = view();
        let ws = words!["a"];
        view.acquire(Mode::Unique, &ws).unwrap();
        assert!(view.release(Mode::Shared, &ws).is_err());
        assert!(view.release(Mode::Unique, &words!["b"]).is_err());
        view.release(Mode::Unique, &ws).unwrap();
    }

    #[test]
    fn wrong_mode_operations() {
        let view = view();
        let ws = words!["a"];

        let err = view.read::<i64>(&ws).unwrap_err();
        assert!(matches!(
            err,
            ViewError::Lock(LockError::WrongMode {
                required: Mode::Shared,
                status: ViewStatus::Released
            })
        ));

        {
            let lock = view.lock(Mode::Unique, &ws).unwrap();
            lock.write(&ws, &1_i64).unwrap();
            let err = lock.read::<i64>(&ws).unwrap_err();
            assert!(matches!(err, ViewError::Lock(LockError::WrongMode { .. })));
        }
        {
            let lock = view.lock(Mode::Shared, &ws).unwrap();
            assert_eq!(lock.read::<i64>(&ws).unwrap(), 1);
            let err = lock.write(&ws, &2_i64).unwrap_err();
            assert!(matches!(
                err,
                ViewError::Lock(LockError::WrongMode {
                    required: Mode::Unique,
                    status: ViewStatus::AcquiredShared
                })
            ));
        }
    }

    #[test]
    fn lock_drop_releases_nodes() {
        let (memory, views) = views(1);
        let ws = words!["a", "b"];
        {
            let _lock = views[0].lock(Mode::Unique, &ws).unwrap();
            assert!(memory.node("a").unwrap().lock().is_unique());
        }
        assert_eq!(views[0].status(), ViewStatus::Released);
        assert!(!memory.node("a").unwrap().lock().is_unique());
        assert!(!memory.node("b").unwrap().lock().is_unique());
    }

    #[test]
    fn failed_fetch_releases_nodes() {
        let (memory, views) = views(1);
        memory.append_node("empty").unwrap();
        let err = views[0].get(slot::<i64>(words!["empty"])).unwrap_err();
        assert!(matches!(err, ViewError::Store(StoreError::NotFound { .. })));
        assert_eq!(memory.node("empty").unwrap().lock().readers(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn opposite_word_orders_never_deadlock() {
        let (_memory, views) = views(2);
        let orders = [words!["b", "a"], words!["a", "b"]];
        let handles: Vec<_> = views
            .into_iter()
            .zip(orders)
            .map(|(view, ws)| {
                thread::spawn(move || {
                    for n in 0..500_u32 {
                        view.set(entry(ws.clone(), n)).unwrap();
                        let _: u32 = view.get(slot(ws.clone())).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker should not panic");
        }
    }

    #[test]
    fn disjoint_reads_do_not_block() {
        let (_memory, views) = views(2);
        views[0].set(entry(words!["x"], 1_i32)).unwrap();
        views[0].set(entry(words!["y"], 2_i32)).unwrap();

        let _held = views[0].lock(Mode::Unique, words!["x"]).unwrap();
        let other = Arc::clone(&views[1]);
        let reader = thread::spawn(move || other.get(slot::<i32>(words!["y"])).unwrap());
        assert_eq!(reader.join().expect("reader should not panic"), 2);
    }

    #[test]
    fn writers_sharing_a_word_serialize() {
        let (_memory, views) = views(2);
        let lock = views[0].lock(Mode::Unique, words!["a", "shared"]).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let writer = {
            let view = Arc::clone(&views[1]);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                view.set(entry(words!["b", "shared"], 1_u8)).unwrap();
                done.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));
        lock.release().unwrap();
        writer.join().expect("writer should not panic");
        assert!(done.load(Ordering::SeqCst));
    }
}
