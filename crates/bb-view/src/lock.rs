use std::fmt;

use bb_types::{Mode, Words};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::ViewResult;
use crate::view::View;

/// Scope-bound acquisition of a [`View`].
///
/// Created by [`View::lock`]. The acquisition is released exactly once:
/// explicitly through [`Lock::release`], or otherwise when the guard is
/// dropped, including during unwinding and early returns.
#[must_use = "dropping a Lock releases it immediately"]
pub struct Lock<'v> {
    view: &'v View,
    mode: Mode,
    words: Words,
    active: bool,
}

impl<'v> Lock<'v> {
    pub(crate) fn new(view: &'v View, mode: Mode, words: Words) -> Self {
        Self {
            view,
            mode,
            words,
            active: true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The locked words in canonical order.
    pub fn words(&self) -> &Words {
        &self.words
    }

    pub fn read<T: DeserializeOwned>(&self, words: impl Into<Words>) -> ViewResult<T> {
        self.view.read(words)
    }

    pub fn write<T: Serialize + ?Sized>(&self, words: impl Into<Words>, value: &T) -> ViewResult<()> {
        self.view.write(words, value)
    }

    /// Release now, reporting any protocol error.
    pub fn release(mut self) -> ViewResult<()> {
        self.active = false;
        self.view.release(self.mode, &self.words)
    }
}

impl Drop for Lock<'_> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(e) = self.view.release(self.mode, &self.words) {
            warn!(view = %self.view.id(), error = %e, "lock release failed");
        }
    }
}

impl fmt::Debug for Lock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lock")
            .field("view", &self.view.id())
            .field("mode", &self.mode)
            .field("words", &self.words)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ViewStatus;
    use bb_memory::Memory;
    use bb_types::words;
    use std::sync::Arc;

    #[test]
    fn explicit_release() {
        let view = View::new(Arc::new(Memory::new()));
        let lock = view.lock(Mode::Unique, words!["a"]).unwrap();
        assert_eq!(lock.mode(), Mode::Unique);
        lock.write(words!["a"], &5_u8).unwrap();
        lock.release().unwrap();
        assert_eq!(view.status(), ViewStatus::Released);
    }

    #[test]
    fn release_on_early_return() {
        fn work(view: &View) -> ViewResult<u8> {
            let lock = view.lock(Mode::Shared, words!["a"])?;
            // Fails with NotFound while the lock is live.
            lock.read::<u8>(words!["a"])
        }

        let memory = Arc::new(Memory::with_words(["a"]));
        let view = View::new(memory.clone());
        assert!(work(&view).is_err());
        assert_eq!(view.status(), ViewStatus::Released);
        assert_eq!(memory.node("a").unwrap().lock().readers(), 0);
    }

    #[test]
    fn release_on_panic() {
        let memory = Arc::new(Memory::new());
        let view = View::new(memory.clone());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lock = view.lock(Mode::Unique, words!["a"]).unwrap();
            panic!("worker blew up");
        }));
        assert!(result.is_err());
        assert_eq!(view.status(), ViewStatus::Released);
        assert!(!memory.node("a").unwrap().lock().is_unique());
    }

    #[test]
    fn words_are_canonical() {
        let view = View::new(Arc::new(Memory::new()));
        let lock = view.lock(Mode::Unique, words!["b", "a", "b"]).unwrap();
        assert_eq!(lock.words().to_vec(), vec!["a", "b"]);
    }
}
