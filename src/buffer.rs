use std::{ops::Deref, sync::Arc};

/// Immutable, shared byte region backing in-memory sources.
///
/// Cloning is cheap (reference count bump); the bytes are never mutated after
/// construction, so any number of readers may hold the same buffer across
/// threads without synchronization.
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Arc<[u8]>,
}

impl Buffer {
    /// Deep-copy `bytes` so the caller may free its memory immediately.
    pub fn copy_from(bytes: &[u8]) -> Self {
        Self {
            data: Arc::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of handles (factory plus live readers) sharing this buffer.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            data: Arc::from(bytes),
        }
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
