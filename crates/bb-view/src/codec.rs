//! Payload encoding for typed access.
//!
//! Values are stored as JSON text. Any `Serialize + DeserializeOwned` type
//! whose JSON form reads back to the same value is supported; non-finite
//! floats are not (JSON has no representation for them).

use bb_memory::Payload;
use bb_types::Words;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ViewError, ViewResult};

pub fn encode<T: Serialize + ?Sized>(words: &Words, value: &T) -> ViewResult<Payload> {
    serde_json::to_vec(value).map_err(|e| ViewError::Encode {
        words: words.clone(),
        reason: e.to_string(),
    })
}

pub fn decode<T: DeserializeOwned>(words: &Words, payload: &[u8]) -> ViewResult<T> {
    serde_json::from_slice(payload).map_err(|e| ViewError::Decode {
        words: words.clone(),
        reason: e.to_string(),
    })
}
