//! Per-campaign publish sessions.
//!
//! A session owns the current root directory node, the backing content
//! store, and the archive ids accumulated so far. All mutation goes
//! through the session mutex: concurrent `add_file` calls for the same
//! campaign serialize behind it, and `finalize` holds it across its
//! archive uploads, so the root reference is never read and replaced
//! non-atomically.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use carport_core::{BlockStore, ContentId, StoreError};
use tokio::sync::Mutex;

use crate::archive::Archive;
use crate::error::{PublishError, PublishResult};
use crate::node::DirNode;
use crate::remote::RemoteStore;
use crate::tree::{add_file_at_path, split_segments};

#[derive(Debug)]
pub struct PublishSession {
    campaign_id: String,
    store: Arc<dyn BlockStore>,
    state: Mutex<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    root: DirNode,
    archive_ids: Vec<String>,
    /// Set once `finalize` has bound the upload. A bound session only
    /// stays registered for the moment until the registry drops it; any
    /// operation racing that window is refused.
    finalized: bool,
}

impl PublishSession {
    pub(crate) fn new(campaign_id: String, store: Arc<dyn BlockStore>) -> Self {
        Self {
            campaign_id,
            store,
            state: Mutex::new(SessionState {
                root: DirNode::new(),
                archive_ids: Vec::new(),
                finalized: false,
            }),
        }
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// Id of the current root node.
    pub async fn root_id(&self) -> PublishResult<ContentId> {
        self.state.lock().await.root.id()
    }

    /// Archive ids accumulated so far, in append order.
    pub async fn archive_ids(&self) -> Vec<String> {
        self.state.lock().await.archive_ids.clone()
    }

    /// Records `archive_id` and grafts a file link for `filename` at
    /// `dir_path` (slash-separated, empty segments discarded) into the
    /// shared tree, replacing the root.
    ///
    /// Fully serialized per session; additions apply in the order calls
    /// acquire the session lock.
    pub async fn add_file(
        &self,
        dir_path: &str,
        filename: &str,
        file_id: ContentId,
        archive_id: String,
    ) -> PublishResult<()> {
        let mut state = self.state.lock().await;
        if state.finalized {
            return Err(PublishError::SessionFinalizing(self.campaign_id.clone()));
        }

        state.archive_ids.push(archive_id);

        let segments = split_segments(dir_path);
        let new_root = add_file_at_path(
            &*self.store,
            state.root.clone(),
            &segments,
            filename,
            file_id,
        )
        .await?;
        state.root = new_root;

        tracing::debug!(
            campaign_id = %self.campaign_id,
            dir_path,
            filename,
            file_id = %file_id.fmt_short(),
            "added file to publish session"
        );
        Ok(())
    }

    /// Archives the whole tree depth-first, one archive per directory
    /// level, then binds the accumulated archive set under the root id.
    ///
    /// On failure the session state is left intact so a retry can reuse
    /// it; archives already stored are not rolled back (storage is
    /// idempotent by content). On success the session refuses further
    /// operations and should be removed from its registry.
    pub async fn finalize(&self, remote: &dyn RemoteStore) -> PublishResult<ContentId> {
        let mut state = self.state.lock().await;
        if state.finalized {
            return Err(PublishError::SessionFinalizing(self.campaign_id.clone()));
        }

        let root = state.root.clone();
        let root_id = finalize_node(&*self.store, remote, root, &mut state.archive_ids).await?;

        remote.bind_upload(root_id, &state.archive_ids).await?;
        state.finalized = true;

        tracing::debug!(
            campaign_id = %self.campaign_id,
            root = %root_id.fmt_short(),
            archives = state.archive_ids.len(),
            "publish session finalized"
        );
        Ok(root_id)
    }
}

/// Post-order traversal: rewrite children first, then rebuild, store,
/// and archive this node. Returns the node's post-serialization id.
///
/// Whether a link is a directory is decided by store lookup: a target
/// present in the content store is a directory to recurse into, a
/// missing one is a file reference passed through unchanged.
fn finalize_node<'a>(
    store: &'a dyn BlockStore,
    remote: &'a dyn RemoteStore,
    node: DirNode,
    archive_ids: &'a mut Vec<String>,
) -> Pin<Box<dyn Future<Output = PublishResult<ContentId>> + Send + 'a>> {
    Box::pin(async move {
        let mut node = node;
        for link in node.links.values_mut() {
            match store.get(link.target_id()).await {
                Ok(bytes) => {
                    let child = DirNode::from_bytes(&bytes)?;
                    let new_id = finalize_node(store, remote, child, &mut *archive_ids).await?;
                    link.target = new_id.into();
                    link.is_dir = true;
                }
                Err(StoreError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }

        let id = store.put(node.to_bytes()?).await?;
        let archive = Archive::build(store, id).await?;
        let archive_id = remote.store_archive(archive.to_bytes()?).await?;
        archive_ids.push(archive_id);
        Ok(id)
    })
}
