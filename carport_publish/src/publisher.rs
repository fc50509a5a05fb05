//! Driver surface consumed by storage sessions.
//!
//! A [`Publisher`] wires a [`SessionRegistry`] to a [`RemoteStore`];
//! a [`SessionHandle`] is the per-campaign view through which files are
//! saved and the campaign is finally published. Handles never cache a
//! session: they re-fetch it from the registry on every operation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use carport_core::ContentId;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::archive::Archive;
use crate::error::{PublishError, PublishResult};
use crate::registry::SessionRegistry;
use crate::remote::RemoteStore;

/// Applied to `save_file` and `finalize` when the caller passes no
/// explicit timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// URI scheme of published locators.
pub const LOCATOR_SCHEME: &str = "car";

#[derive(Debug, Clone)]
pub struct Publisher {
    registry: Arc<SessionRegistry>,
    remote: Arc<dyn RemoteStore>,
}

impl Publisher {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_registry(remote, Arc::new(SessionRegistry::new()))
    }

    pub fn with_registry(remote: Arc<dyn RemoteStore>, registry: Arc<SessionRegistry>) -> Self {
        Self { registry, remote }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Opens a handle for one publish campaign. The underlying session is
    /// created lazily on the first file save.
    pub fn session(&self, campaign_id: &str) -> SessionHandle {
        SessionHandle {
            campaign_id: campaign_id.to_string(),
            registry: self.registry.clone(),
            remote: self.remote.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    campaign_id: String,
    registry: Arc<SessionRegistry>,
    remote: Arc<dyn RemoteStore>,
}

impl SessionHandle {
    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// Reads `reader` to the end, packs it into a single-file archive,
    /// stores that archive remotely, and grafts the file into the
    /// campaign tree at `dir_path`/`name`. Returns the file's content id.
    pub async fn save_file<R>(
        &self,
        dir_path: &str,
        name: &str,
        reader: R,
        timeout: Option<Duration>,
    ) -> PublishResult<ContentId>
    where
        R: AsyncRead + Send + Unpin,
    {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        tokio::time::timeout(timeout, self.save_file_inner(dir_path, name, reader))
            .await
            .map_err(|_| PublishError::Timeout(timeout))?
    }

    async fn save_file_inner<R>(
        &self,
        dir_path: &str,
        name: &str,
        mut reader: R,
    ) -> PublishResult<ContentId>
    where
        R: AsyncRead + Send + Unpin,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;

        let archive = Archive::single_file(Bytes::from(data));
        let file_id = archive.root_id();
        let archive_id = self.remote.store_archive(archive.to_bytes()?).await?;

        let session = self.registry.get_or_create(&self.campaign_id);
        session.add_file(dir_path, name, file_id, archive_id).await?;
        Ok(file_id)
    }

    /// Publishes the campaign tree and returns its locator
    /// (`car://<root-id>`). Only on success is the session dropped from
    /// the registry; a failed finalize leaves it in place so a retry can
    /// reuse the accumulated state.
    pub async fn finalize(&self, timeout: Option<Duration>) -> PublishResult<String> {
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        tokio::time::timeout(timeout, self.finalize_inner())
            .await
            .map_err(|_| PublishError::Timeout(timeout))?
    }

    async fn finalize_inner(&self) -> PublishResult<String> {
        let session = self.registry.get_or_create(&self.campaign_id);
        let root_id = session.finalize(&*self.remote).await?;
        self.registry.remove(&self.campaign_id);
        Ok(format!("{LOCATOR_SCHEME}://{root_id}"))
    }
}
