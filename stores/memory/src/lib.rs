use bytes::Bytes;
use carport_core::{BlockStore, ContentId, StoreError, StoreResult};
use dashmap::DashMap;

/// In-memory content-addressed block store.
///
/// Backs publish sessions: all tree state is process-memory only and is
/// lost on crash before finalize, so nothing here ever touches disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: DashMap<ContentId, Bytes>,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    pub fn new() -> Self {
        Self {
            blocks: DashMap::new(),
        }
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[async_trait::async_trait]
impl BlockStore for MemoryStore {
    /// Stores the bytes under their content id. Idempotent: storing the
    /// same bytes twice is a no-op.
    async fn put(&self, bytes: Bytes) -> StoreResult<ContentId> {
        let id = ContentId::from_data(&bytes);
        self.blocks.insert(id, bytes);
        Ok(id)
    }

    /// Returns the bytes stored under the given id.
    async fn get(&self, id: ContentId) -> StoreResult<Bytes> {
        let block = self.blocks.get(&id).ok_or(StoreError::NotFound)?;
        Ok(block.value().clone())
    }

    /// Checks whether a block exists under the given id.
    async fn contains(&self, id: ContentId) -> StoreResult<bool> {
        Ok(self.blocks.contains_key(&id))
    }

    /// Deletes the block stored under the given id.
    async fn delete(&self, id: ContentId) -> StoreResult<()> {
        self.blocks.remove(&id).ok_or(StoreError::NotFound)?;
        Ok(())
    }
}
