//! Ordered, identity-stable collection of uploaded source images.

use std::collections::HashMap;
use std::sync::Arc;

use crate::blob::{BlobId, BlobStore};
use crate::foundation::core::FrameId;
use crate::foundation::error::{GifforgeError, GifforgeResult};
use crate::frames::decode;
use crate::settings::GifSettings;

/// Per-file upload cap (10 MiB), matching the upload widget's advertised limit.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// One uploaded source image: stable identity, encoded bytes, and a revocable preview
/// handle for the display layer.
#[derive(Clone, Debug)]
struct FrameItem {
    id: FrameId,
    source: Arc<Vec<u8>>,
    preview: BlobId,
}

/// Value copy of one frame entry inside a [`FrameSnapshot`].
#[derive(Clone, Debug)]
pub struct SnapshotFrame {
    /// Identity of the frame at snapshot time.
    pub id: FrameId,
    /// Encoded source bytes (shared, never copied).
    pub source: Arc<Vec<u8>>,
}

/// Immutable copy of `(ordered frames, settings)` captured when a generation request is
/// accepted.
///
/// Not live: later mutation of the store or settings has no effect on an already-taken
/// snapshot, so an in-flight encode can never observe concurrent edits.
#[derive(Clone, Debug)]
pub struct FrameSnapshot {
    frames: Vec<SnapshotFrame>,
    settings: GifSettings,
}

impl FrameSnapshot {
    /// Build a snapshot from explicit parts, for frame producers other than
    /// [`FrameStore`].
    pub fn from_parts(frames: Vec<SnapshotFrame>, settings: GifSettings) -> Self {
        Self { frames, settings }
    }

    /// Frames in presentation order.
    pub fn frames(&self) -> &[SnapshotFrame] {
        &self.frames
    }

    /// Settings captured with the snapshot.
    pub fn settings(&self) -> &GifSettings {
        &self.settings
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Return `true` when the snapshot holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Ordered collection of uploaded frames with transient-resource cleanup.
///
/// Owns every [`FrameItem`] exclusively. Identity is stable across reordering; only the
/// sequence position changes. Dropping the store revokes every outstanding preview.
#[derive(Debug, Default)]
pub struct FrameStore {
    items: Vec<FrameItem>,
    next_id: u64,
    blobs: BlobStore,
}

impl FrameStore {
    /// Create an empty store with its own blob registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store backed by an existing blob registry (shared with the display layer).
    pub fn with_blob_store(blobs: BlobStore) -> Self {
        Self {
            items: Vec::new(),
            next_id: 0,
            blobs,
        }
    }

    /// Accept one uploaded file and append it at the end of the sequence.
    ///
    /// The bytes must probe as an accepted image format and stay under
    /// [`MAX_UPLOAD_BYTES`]; rejected uploads leave the store unchanged. A fresh preview
    /// blob is registered for the new entry.
    pub fn append(&mut self, bytes: Vec<u8>) -> GifforgeResult<FrameId> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(GifforgeError::decode_failure(format!(
                "upload is {} bytes, over the {MAX_UPLOAD_BYTES} byte cap",
                bytes.len()
            )));
        }
        decode::probe_format(&bytes)?;

        let id = FrameId(self.next_id);
        self.next_id += 1;

        let source = Arc::new(bytes);
        let preview = self.blobs.insert_shared(source.clone());
        self.items.push(FrameItem {
            id,
            source,
            preview,
        });
        Ok(id)
    }

    /// Remove the entry with `id` and revoke its preview exactly once.
    ///
    /// Removing an unknown id is a no-op, so UI-driven removal stays idempotent under
    /// double-invocation.
    pub fn remove(&mut self, id: FrameId) {
        if let Some(pos) = self.items.iter().position(|it| it.id == id) {
            let item = self.items.remove(pos);
            self.blobs.revoke(item.preview);
        }
    }

    /// Replace the sequence order with `order`.
    ///
    /// `order` must be a permutation of the current id set; any mismatch is an
    /// [`GifforgeError::InvalidState`] and nothing is mutated.
    pub fn reorder(&mut self, order: &[FrameId]) -> GifforgeResult<()> {
        if order.len() != self.items.len() {
            return Err(GifforgeError::invalid_state(format!(
                "reorder names {} frames, store holds {}",
                order.len(),
                self.items.len()
            )));
        }
        let current: std::collections::HashSet<FrameId> =
            self.items.iter().map(|it| it.id).collect();
        let requested: std::collections::HashSet<FrameId> = order.iter().copied().collect();
        if requested.len() != order.len() || requested != current {
            return Err(GifforgeError::invalid_state(
                "reorder must name every existing frame id exactly once",
            ));
        }

        let mut by_id: HashMap<FrameId, FrameItem> =
            self.items.drain(..).map(|it| (it.id, it)).collect();
        for id in order {
            if let Some(item) = by_id.remove(id) {
                self.items.push(item);
            }
        }
        Ok(())
    }

    /// Capture a value copy of the current order plus `settings`.
    pub fn snapshot(&self, settings: &GifSettings) -> FrameSnapshot {
        FrameSnapshot {
            frames: self
                .items
                .iter()
                .map(|it| SnapshotFrame {
                    id: it.id,
                    source: it.source.clone(),
                })
                .collect(),
            settings: settings.clone(),
        }
    }

    /// Current frame ids in presentation order.
    pub fn ids(&self) -> Vec<FrameId> {
        self.items.iter().map(|it| it.id).collect()
    }

    /// Resolve the preview bytes for a frame, or `None` for unknown ids.
    pub fn preview(&self, id: FrameId) -> Option<Arc<Vec<u8>>> {
        self.items
            .iter()
            .find(|it| it.id == id)
            .and_then(|it| self.blobs.get(it.preview))
    }

    /// Decoded dimensions of the first frame, used to default the output geometry.
    pub fn first_dimensions(&self) -> Option<(u32, u32)> {
        let first = self.items.first()?;
        decode::decode_image(&first.source)
            .ok()
            .map(|d| (d.width, d.height))
    }

    /// Shared blob registry backing the previews.
    pub fn blob_store(&self) -> &BlobStore {
        &self.blobs
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return `true` when the store holds no frames.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Drop for FrameStore {
    fn drop(&mut self) {
        for item in &self.items {
            self.blobs.revoke(item.preview);
        }
    }
}
