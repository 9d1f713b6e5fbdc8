//! Operation executor
//!
//! Every [`FtpClient`] method opens its own session, performs one remote
//! action, disconnects and returns. Sessions are never shared or reused.
//!
//! # Failure handling
//!
//! Any failure (connect, transport primitive, staged-file I/O) aborts the
//! operation and comes back as an [`FtpError`] whose message embeds the
//! cause. Disconnect is attempted whether or not the action succeeded; if it
//! fails, the failure is logged and never replaces the action's own result.
//!
//! # Staged files
//!
//! `upload` removes its staged file once the push has finished, successful or
//! not. `download` keeps its staged file and returns the path as
//! [`DownloadedFile::file_path`]; callers that do not need it should delete
//! it. A failed download removes whatever it had partially written.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{ClientSettings, ConfigError, ConnectionProfile};
use crate::entry::DirectoryEntry;
use crate::error::{FtpError, Operation, Result, TransportError};
use crate::staging::{StagePurpose, StagingArea};
use crate::transport::{Connector, RemoteSession, SftpConnector};

/// Result of [`FtpClient::download`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedFile {
    /// Local staged copy of the remote file
    pub file_path: PathBuf,
    /// Full file content as text
    pub content: String,
}

/// Connection-scoped remote file client.
#[derive(Debug)]
pub struct FtpClient<C = SftpConnector> {
    profile: ConnectionProfile,
    connector: C,
    staging: StagingArea,
}

impl FtpClient<SftpConnector> {
    /// SFTP client with default settings; staging lives under the system
    /// temp directory.
    pub fn new(profile: ConnectionProfile) -> std::result::Result<Self, ConfigError> {
        Self::with_settings(profile, ClientSettings::default())
    }

    pub fn with_settings(
        profile: ConnectionProfile,
        settings: ClientSettings,
    ) -> std::result::Result<Self, ConfigError> {
        let staging_root = settings
            .staging_dir
            .clone()
            .unwrap_or_else(StagingArea::default_root);
        let connector = SftpConnector::new(settings.connect_timeout(), settings.host_key_policy);
        Self::with_connector(profile, connector, staging_root)
    }
}

impl<C: Connector> FtpClient<C> {
    /// Client over any [`Connector`]. The staging directory is created here
    /// if it does not exist yet.
    pub fn with_connector(
        profile: ConnectionProfile,
        connector: C,
        staging_root: impl Into<PathBuf>,
    ) -> std::result::Result<Self, ConfigError> {
        let staging = StagingArea::new(staging_root)?;
        Ok(Self {
            profile,
            connector,
            staging,
        })
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// List `remote_path` in server order. An empty directory gives an empty
    /// vec.
    pub async fn list(&self, remote_path: &str) -> Result<Vec<DirectoryEntry>> {
        let operation = Operation::List;
        let mut session = self.open(operation).await?;
        let outcome = session.list(remote_path).await;
        let records = self.release(session, operation, outcome).await?;

        debug!("Listed {} entries in {}", records.len(), remote_path);
        Ok(records.into_iter().map(DirectoryEntry::from).collect())
    }

    /// Fetch `remote_path` into the staging area and read it as text.
    pub async fn download(&self, remote_path: &str) -> Result<DownloadedFile> {
        let operation = Operation::Download;
        let mut session = self.open(operation).await?;

        let staged = self.staging.stage_path(StagePurpose::Download, remote_path);
        let outcome = self.fetch(&mut session, remote_path, &staged).await;
        if outcome.is_err() {
            self.staging.discard(&staged).await;
        }

        let content = self.release(session, operation, outcome).await?;
        info!("Downloaded {} to {:?}", remote_path, staged);
        Ok(DownloadedFile {
            file_path: staged,
            content,
        })
    }

    /// Write `content` to `remote_path`, creating or truncating it.
    pub async fn upload(&self, remote_path: &str, content: &str) -> Result<bool> {
        let operation = Operation::Upload;
        let mut session = self.open(operation).await?;

        let staged = self.staging.stage_path(StagePurpose::Upload, remote_path);
        let outcome = self.push(&mut session, &staged, remote_path, content).await;
        self.staging.discard(&staged).await;

        let bytes = self.release(session, operation, outcome).await?;
        info!("Uploaded {} bytes to {}", bytes, remote_path);
        Ok(true)
    }

    pub async fn create_directory(&self, remote_path: &str) -> Result<bool> {
        let operation = Operation::CreateDirectory;
        let mut session = self.open(operation).await?;
        let outcome = session.mkdir(remote_path).await;
        self.release(session, operation, outcome).await?;

        info!("Created directory {}", remote_path);
        Ok(true)
    }

    pub async fn delete_file(&self, remote_path: &str) -> Result<bool> {
        let operation = Operation::DeleteFile;
        let mut session = self.open(operation).await?;
        let outcome = session.remove(remote_path).await;
        self.release(session, operation, outcome).await?;

        info!("Deleted file {}", remote_path);
        Ok(true)
    }

    /// Remove an empty remote directory.
    pub async fn delete_directory(&self, remote_path: &str) -> Result<bool> {
        let operation = Operation::DeleteDirectory;
        let mut session = self.open(operation).await?;
        let outcome = session.rmdir(remote_path).await;
        self.release(session, operation, outcome).await?;

        info!("Deleted directory {}", remote_path);
        Ok(true)
    }

    async fn open(&self, operation: Operation) -> Result<C::Session> {
        debug!("Opening session to {} ({})", self.profile.address(), operation);
        self.connector
            .connect(&self.profile)
            .await
            .map_err(|e| self.failed(operation, e))
    }

    /// Disconnect `session`, then surface `outcome`. A disconnect failure is
    /// logged and dropped in favour of whatever `outcome` holds.
    async fn release<T>(
        &self,
        mut session: C::Session,
        operation: Operation,
        outcome: std::result::Result<T, TransportError>,
    ) -> Result<T> {
        if let Err(e) = session.disconnect().await {
            warn!(
                "Disconnect from {} after {} failed: {}",
                self.profile.address(),
                operation,
                e
            );
        }
        outcome.map_err(|e| self.failed(operation, e))
    }

    fn failed(&self, operation: Operation, source: TransportError) -> FtpError {
        let err = FtpError::new(operation, source);
        error!("{} on {}", err, self.profile.address());
        err
    }

    async fn fetch(
        &self,
        session: &mut C::Session,
        remote_path: &str,
        staged: &Path,
    ) -> std::result::Result<String, TransportError> {
        session.get(remote_path, staged).await?;
        Ok(self.staging.read_text(staged).await?)
    }

    async fn push(
        &self,
        session: &mut C::Session,
        staged: &Path,
        remote_path: &str,
        content: &str,
    ) -> std::result::Result<u64, TransportError> {
        self.staging.write(staged, content).await?;
        session.put(staged, remote_path).await
    }
}
