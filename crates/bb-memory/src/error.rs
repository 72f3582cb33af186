use bb_types::{ObjectId, Word, Words};

/// Errors from blackboard store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A get/set/acquire was issued with no words at all.
    #[error("empty word set")]
    EmptyWordSet,

    /// No Object is tagged by every word of the set.
    #[error("object not found for {words}")]
    NotFound { words: Words },

    /// More than one Object is tagged by every word of the set.
    #[error("ambiguous object choice for {words}: {candidates} candidates")]
    Ambiguous { words: Words, candidates: usize },

    /// `append_node` was called for a word that already has a Node.
    #[error("node already exists: {0}")]
    DuplicateNode(Word),

    /// The word has no Node and the operation does not create one.
    #[error("unknown word: {0}")]
    UnknownWord(Word),

    /// The Object is already a member of the Node.
    #[error("object {id} already present in node {word}")]
    DuplicateObject { word: Word, id: ObjectId },

    /// The Object is not a member of the Node.
    #[error("object {id} not present in node {word}")]
    ObjectNotInNode { word: Word, id: ObjectId },

    /// The word is not covered by the currently held lock set.
    #[error("word {word} is not held (held: {held})")]
    NotHeld { word: Word, held: Words },

    /// A write was attempted through a shared lock set.
    #[error("cannot write {words} through a shared lock")]
    ReadOnly { words: Words },

    /// Serialization or deserialization failure of persisted records.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while loading or saving persisted records.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
