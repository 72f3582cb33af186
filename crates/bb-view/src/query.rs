//! Variadic typed access.
//!
//! A single [`View::get`] or [`View::set`] call may address several word sets
//! at once. Each is described by a [`Slot`] (read) or an [`Entry`] (write);
//! tuples of up to eight, and vectors, of these are accepted. The union of
//! all their words is locked once for the whole call.

use std::fmt;
use std::marker::PhantomData;

use bb_types::Words;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ViewResult;
use crate::view::View;

/// Something that can be read through a shared acquisition.
pub trait Fetch {
    type Output;

    /// Add every word this query touches to `union`.
    fn collect_words(&self, union: &mut Words);

    /// Read the values. Called while `union` is held shared.
    fn fetch(&self, view: &View) -> ViewResult<Self::Output>;
}

/// Something that can be written through a unique acquisition.
pub trait Assign {
    /// Add every word this assignment touches to `union`.
    fn collect_words(&self, union: &mut Words);

    /// Write the values. Called while `union` is held unique.
    fn assign(&self, view: &View) -> ViewResult<()>;
}

/// A typed read target.
pub struct Slot<T> {
    words: Words,
    _marker: PhantomData<fn() -> T>,
}

/// Read the value at `words` as `T`.
pub fn slot<T>(words: impl Into<Words>) -> Slot<T> {
    Slot {
        words: words.into(),
        _marker: PhantomData,
    }
}

impl<T> Slot<T> {
    pub fn words(&self) -> &Words {
        &self.words
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("words", &self.words)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> Fetch for Slot<T> {
    type Output = T;

    fn collect_words(&self, union: &mut Words) {
        union.extend_from(&self.words);
    }

    fn fetch(&self, view: &View) -> ViewResult<T> {
        view.read(&self.words)
    }
}

/// A typed write: store `value` at `words`.
#[derive(Clone, Debug)]
pub struct Entry<T> {
    words: Words,
    value: T,
}

pub fn entry<T>(words: impl Into<Words>, value: T) -> Entry<T> {
    Entry {
        words: words.into(),
        value,
    }
}

impl<T> Entry<T> {
    pub fn words(&self) -> &Words {
        &self.words
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T: Serialize> Assign for Entry<T> {
    fn collect_words(&self, union: &mut Words) {
        union.extend_from(&self.words);
    }

    fn assign(&self, view: &View) -> ViewResult<()> {
        view.write(&self.words, &self.value)
    }
}

impl<F: Fetch> Fetch for Vec<F> {
    type Output = Vec<F::Output>;

    fn collect_words(&self, union: &mut Words) {
        for item in self {
            item.collect_words(union);
        }
    }

    fn fetch(&self, view: &View) -> ViewResult<Self::Output> {
        self.iter().map(|item| item.fetch(view)).collect()
    }
}

impl<A: Assign> Assign for Vec<A> {
    fn collect_words(&self, union: &mut Words) {
        for item in self {
            item.collect_words(union);
        }
    }

    fn assign(&self, view: &View) -> ViewResult<()> {
        self.iter().try_for_each(|item| item.assign(view))
    }
}

macro_rules! tuple_impls {
    ($($name:ident),+) => {
        impl<$($name: Fetch),+> Fetch for ($($name,)+) {
            type Output = ($($name::Output,)+);

            #[allow(non_snake_case)]
            fn collect_words(&self, union: &mut Words) {
                let ($($name,)+) = self;
                $($name.collect_words(union);)+
            }

            #[allow(non_snake_case)]
            fn fetch(&self, view: &View) -> ViewResult<Self::Output> {
                let ($($name,)+) = self;
                Ok(($($name.fetch(view)?,)+))
            }
        }

        impl<$($name: Assign),+> Assign for ($($name,)+) {
            #[allow(non_snake_case)]
            fn collect_words(&self, union: &mut Words) {
                let ($($name,)+) = self;
                $($name.collect_words(union);)+
            }

            #[allow(non_snake_case)]
            fn assign(&self, view: &View) -> ViewResult<()> {
                let ($($name,)+) = self;
                $($name.assign(view)?;)+
                Ok(())
            }
        }
    };
}

tuple_impls!(A);
tuple_impls!(A, B);
tuple_impls!(A, B, C);
tuple_impls!(A, B, C, D);
tuple_impls!(A, B, C, D, E);
tuple_impls!(A, B, C, D, E, F);
tuple_impls!(A, B, C, D, E, F, G);
tuple_impls!(A, B, C, D, E, F, G, H);
