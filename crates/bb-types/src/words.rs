use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque string tag. Identity is by value.
pub type Word = String;

/// A canonical, unordered set of words.
///
/// Words are kept in ascending lexical (byte) order with duplicates removed.
/// Two `Words` built from the same tags in any order compare equal, and
/// iteration always yields the canonical sequence. That sequence is the global
/// lock order used when several Nodes are acquired together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Words(BTreeSet<Word>);

impl Words {
    /// Create an empty word set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// A word set holding exactly one word.
    pub fn single(word: impl Into<Word>) -> Self {
        let mut set = BTreeSet::new();
        set.insert(word.into());
        Self(set)
    }

    /// Insert a word. Returns `false` if it was already present.
    pub fn insert(&mut self, word: impl Into<Word>) -> bool {
        self.0.insert(word.into())
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no words.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    /// Iterate words in canonical (ascending) order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.0.iter().map(String::as_str)
    }

    /// The union of two word sets.
    pub fn union(&self, other: &Words) -> Words {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Merge every word of `other` into `self`.
    pub fn extend_from(&mut self, other: &Words) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Returns `true` if every word of `self` is also in `other`.
    pub fn is_subset(&self, other: &Words) -> bool {
        self.0.is_subset(&other.0)
    }

    /// The words of `self` missing from `other`, in canonical order.
    pub fn difference<'a>(&'a self, other: &'a Words) -> impl Iterator<Item = &'a str> {
        self.0.difference(&other.0).map(String::as_str)
    }

    /// Owned canonical sequence.
    pub fn to_vec(&self) -> Vec<Word> {
        self.0.iter().cloned().collect()
    }
}

impl fmt::Display for Words {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, word) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(word)?;
        }
        f.write_str("}")
    }
}

impl<S: Into<Word>> FromIterator<S> for Words {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<Word>> Extend<S> for Words {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl<S: Into<Word>, const N: usize> From<[S; N]> for Words {
    fn from(words: [S; N]) -> Self {
        words.into_iter().collect()
    }
}

impl<S: Into<Word>> From<Vec<S>> for Words {
    fn from(words: Vec<S>) -> Self {
        words.into_iter().collect()
    }
}

impl<S: Into<Word> + Clone> From<&[S]> for Words {
    fn from(words: &[S]) -> Self {
        words.iter().cloned().collect()
    }
}

impl From<&Words> for Words {
    fn from(words: &Words) -> Self {
        words.clone()
    }
}

impl IntoIterator for Words {
    type Item = Word;
    type IntoIter = btree_set::IntoIter<Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Words {
    type Item = &'a Word;
    type IntoIter = btree_set::Iter<'a, Word>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`Words`] set from string-like expressions.
///
/// ```rust
/// use bb_types::words;
///
/// let set = words!["GAZP", "M1", "probability", "BO"];
/// assert_eq!(set.len(), 4);
/// assert_eq!(set.to_vec()[0], "BO");
/// ```
#[macro_export]
macro_rules! words {
    () => {
        $crate::Words::new()
    };
    ($($word:expr),+ $(,)?) => {
        <$crate::Words as ::std::iter::FromIterator<::std::string::String>>::from_iter([
            $(::std::string::String::from($word)),+
        ])
    };
}
