use async_trait::async_trait;
use bytes::Bytes;

use crate::ContentId;

pub type StoreResult<T, E = StoreError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Content-addressed block storage.
///
/// Blocks are keyed by the [`ContentId`] of their bytes, so `put` is
/// idempotent and `get` doubles as an existence probe: a missing id yields
/// [`StoreError::NotFound`]. Implementations must be safe to share across
/// tasks.
#[async_trait]
pub trait BlockStore: std::fmt::Debug + Send + Sync + 'static {
    /// Stores `bytes` and returns the id they are now addressable under.
    async fn put(&self, bytes: Bytes) -> StoreResult<ContentId>;

    /// Returns the bytes stored under `id`.
    async fn get(&self, id: ContentId) -> StoreResult<Bytes>;

    /// Checks whether a block exists under `id`.
    async fn contains(&self, id: ContentId) -> StoreResult<bool>;

    /// Deletes the block stored under `id`.
    async fn delete(&self, id: ContentId) -> StoreResult<()>;
}
