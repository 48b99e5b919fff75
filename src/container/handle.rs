//! Shared, closable container handle.

use std::sync::Arc;

use parking_lot::RwLock;

use super::ContainerReader;
use crate::util::{Error, Result};

/// A container reader shared between a document and its tables.
///
/// Closing empties the slot for every clone; later reads fail with
/// [`Error::Closed`].
#[derive(Clone)]
pub struct SharedContainer {
    slot: Arc<RwLock<Option<Box<dyn ContainerReader>>>>,
}

impl SharedContainer {
    /// Wrap an open reader.
    pub fn new(reader: Box<dyn ContainerReader>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(reader))),
        }
    }

    /// Run `f` against the open reader.
    pub fn with<R>(&self, f: impl FnOnce(&dyn ContainerReader) -> Result<R>) -> Result<R> {
        let guard = self.slot.read();
        match guard.as_deref() {
            Some(reader) => f(reader),
            None => Err(Error::Closed),
        }
    }

    /// Release the reader. Returns false if it was already released.
    pub fn close(&self) -> bool {
        self.slot.write().take().is_some()
    }

    /// Check if the reader was released.
    pub fn is_closed(&self) -> bool {
        self.slot.read().is_none()
    }
}

impl std::fmt::Debug for SharedContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.slot.read();
        match guard.as_deref() {
            Some(reader) => write!(f, "SharedContainer({})", reader.path().display()),
            None => write!(f, "SharedContainer(closed)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{MemoryContainer, MemoryNode};

    #[test]
    fn test_close_is_shared_and_idempotent() {
        let handle = SharedContainer::new(Box::new(MemoryContainer::new("m", MemoryNode::group("/"))));
        let clone = handle.clone();
        assert!(handle.with(|r| Ok(r.path().to_path_buf())).is_ok());

        assert!(handle.close());
        assert!(!handle.close());
        assert!(clone.is_closed());
        assert!(matches!(clone.with(|_| Ok(())), Err(Error::Closed)));
    }
}
