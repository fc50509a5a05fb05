//! Remote store backed by an external command-line client.
//!
//! Archives are written to a temp file and handed to the client as
//! `<binary> store add <path>`; a finished tree is bound with
//! `<binary> upload add <root> <archive-id>...`. The delegation proof is
//! passed through the environment, never on the command line.

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use carport_core::ContentId;
use tokio::process::Command;

use crate::error::{PublishError, PublishResult};
use crate::remote::RemoteStore;

const PROOF_ENV_VAR: &str = "CARPORT_DELEGATION_PROOF";

#[derive(Debug, Clone)]
pub struct CliRemoteConfig {
    /// Name or path of the client binary.
    pub binary: String,
    /// Delegation proof authorizing uploads, passed via the environment.
    pub delegation_proof: String,
}

#[derive(Debug)]
pub struct CliRemote {
    config: CliRemoteConfig,
}

impl CliRemote {
    pub fn new(config: CliRemoteConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> PublishResult<Command> {
        if self.config.delegation_proof.is_empty() {
            return Err(PublishError::Remote(anyhow!(
                "delegation proof not configured"
            )));
        }
        let mut cmd = Command::new(&self.config.binary);
        cmd.env(PROOF_ENV_VAR, &self.config.delegation_proof);
        // caller timeouts cancel the future; take the child down with it
        cmd.kill_on_drop(true);
        Ok(cmd)
    }

    async fn run(&self, mut cmd: Command) -> PublishResult<String> {
        let output = cmd
            .output()
            .await
            .map_err(|err| PublishError::Remote(anyhow!("spawning {}: {err}", self.config.binary)))?;
        if !output.status.success() {
            return Err(PublishError::Remote(anyhow!(
                "{} exited with {}: {}",
                self.config.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl RemoteStore for CliRemote {
    async fn store_archive(&self, archive: Bytes) -> PublishResult<String> {
        // temp file is removed on drop, on every exit path including
        // cancellation
        let file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(file.path(), &archive).await?;

        let mut cmd = self.command()?;
        cmd.arg("store").arg("add").arg(file.path());
        let archive_id = self.run(cmd).await?;
        if archive_id.is_empty() {
            return Err(PublishError::Remote(anyhow!(
                "{} returned no archive id",
                self.config.binary
            )));
        }
        tracing::debug!(%archive_id, "stored archive via cli remote");
        Ok(archive_id)
    }

    async fn bind_upload(&self, root: ContentId, archive_ids: &[String]) -> PublishResult<()> {
        let mut cmd = self.command()?;
        cmd.arg("upload").arg("add").arg(root.to_base32());
        for id in archive_ids {
            cmd.arg(id);
        }
        self.run(cmd).await?;
        tracing::debug!(root = %root.fmt_short(), archives = archive_ids.len(), "bound upload");
        Ok(())
    }
}
