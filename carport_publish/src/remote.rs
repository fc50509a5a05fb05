use async_trait::async_trait;
use bytes::Bytes;
use carport_core::ContentId;

use crate::error::PublishResult;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

/// Remote archive service consumed by the publish pipeline.
///
/// Storage is idempotent by content, so retrying a failed publish may
/// re-store archives without harm. The pipeline never retries on its
/// own; retry policy belongs to the caller.
#[async_trait]
pub trait RemoteStore: std::fmt::Debug + Send + Sync + 'static {
    /// Stores a single archive, returning its external identifier.
    async fn store_archive(&self, archive: Bytes) -> PublishResult<String>;

    /// Binds a set of archive identifiers plus a root identifier into one
    /// published, externally addressable unit.
    async fn bind_upload(&self, root: ContentId, archive_ids: &[String]) -> PublishResult<()>;
}
