use std::fmt;
use std::sync::{PoisonError, RwLock};

use bb_types::ObjectId;

/// Opaque serialized payload held by an [`Object`].
pub type Payload = Vec<u8>;

/// A single mutable payload cell.
///
/// An Object is shared (via `Arc`) by every Node whose word currently tags it.
/// Its payload is only ever replaced as a whole. Callers are expected to hold
/// the guarding Node lock(s) for the duration of a read or replace; the inner
/// cell lock exists for memory safety and is uncontended under that protocol.
pub struct Object {
    id: ObjectId,
    payload: RwLock<Payload>,
}

impl Object {
    /// Create a new Object with a freshly allocated id.
    pub fn new(payload: Payload) -> Self {
        Self {
            id: ObjectId::next(),
            payload: RwLock::new(payload),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// A copy of the current payload.
    pub fn read(&self) -> Payload {
        self.payload
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole payload.
    pub fn replace(&self, payload: Payload) {
        *self
            .payload
            .write()
            .unwrap_or_else(PoisonError::into_inner) = payload;
    }

    /// Size of the current payload in bytes.
    pub fn size(&self) -> usize {
        self.payload
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_initial_payload() {
        let obj = Object::new(b"0.8".to_vec());
        assert_eq!(obj.read(), b"0.8");
        assert_eq!(obj.size(), 3);
    }

    #[test]
    fn replace_is_whole_payload() {
        let obj = Object::new(b"100".to_vec());
        obj.replace(b"7".to_vec());
        assert_eq!(obj.read(), b"7");
    }

    #[test]
    fn ids_are_distinct() {
        let a = Object::new(vec![]);
        let b = Object::new(vec![]);
        assert_ne!(a.id(), b.id());
    }
}
