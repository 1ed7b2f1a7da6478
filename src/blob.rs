//! Transient revocable byte handles.
//!
//! Every piece of binary pixel data exposed for display or download (frame previews, the
//! finished artifact) lives in a [`BlobStore`] entry and is revoked exactly once at
//! removal, clear, or supersession time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identifier of one blob in a [`BlobStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlobId(u64);

#[derive(Debug, Default)]
struct BlobStoreInner {
    next: u64,
    blobs: HashMap<u64, Arc<Vec<u8>>>,
}

/// Registry of transient byte buffers with explicit revocation.
///
/// Handles are cheap to clone; all clones see the same registry. `revoke` returns `true`
/// only the first time a given id is revoked, so double-revocation is observable.
#[derive(Clone, Debug, Default)]
pub struct BlobStore {
    inner: Arc<Mutex<BlobStoreInner>>,
}

impl BlobStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register owned bytes and return their handle id.
    pub fn insert(&self, bytes: Vec<u8>) -> BlobId {
        self.insert_shared(Arc::new(bytes))
    }

    /// Register already-shared bytes without copying them.
    pub fn insert_shared(&self, bytes: Arc<Vec<u8>>) -> BlobId {
        let mut inner = self.lock();
        let id = inner.next;
        inner.next += 1;
        inner.blobs.insert(id, bytes);
        BlobId(id)
    }

    /// Resolve a handle to its bytes, or `None` once revoked.
    pub fn get(&self, id: BlobId) -> Option<Arc<Vec<u8>>> {
        self.lock().blobs.get(&id.0).cloned()
    }

    /// Release a handle. Returns `true` on the first revocation, `false` afterwards.
    pub fn revoke(&self, id: BlobId) -> bool {
        self.lock().blobs.remove(&id.0).is_some()
    }

    /// Number of live (unrevoked) blobs.
    pub fn len(&self) -> usize {
        self.lock().blobs.len()
    }

    /// Return `true` when no blob is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BlobStoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
