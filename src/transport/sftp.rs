//! SFTP transport over russh
//!
//! Opens a TCP connection, runs the SSH handshake, authenticates with the
//! profile's password and starts the `sftp` subsystem on a fresh channel.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::keys::{HashAlg, PublicKey};
use russh::Disconnect;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::FileAttributes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{Connector, RemoteSession};
use crate::config::{ConnectionProfile, HostKeyPolicy};
use crate::entry::{
    RemoteRecord, DIRECTORY_MARKER, FILE_MARKER, SYMLINK_MARKER, UNKNOWN_MARKER,
};
use crate::error::TransportError;

/// Connects to SFTP servers with russh.
#[derive(Debug, Clone, Default)]
pub struct SftpConnector {
    connect_timeout: Option<Duration>,
    host_key_policy: HostKeyPolicy,
}

impl SftpConnector {
    pub fn new(connect_timeout: Option<Duration>, host_key_policy: HostKeyPolicy) -> Self {
        Self {
            connect_timeout,
            host_key_policy,
        }
    }

    async fn handshake(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<Handle<ClientHandler>, TransportError> {
        let handler = ClientHandler {
            host: profile.host().to_string(),
            port: profile.port(),
            policy: self.host_key_policy.clone(),
        };
        let connect = client::connect(
            Arc::new(client::Config::default()),
            (profile.host(), profile.port()),
            handler,
        );

        let result = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| TransportError::Timeout("Connection timed out".to_string()))?,
            None => connect.await,
        };

        result.map_err(|e| {
            if e.is_connect_failure() {
                e
            } else {
                TransportError::ConnectionFailed(e.to_string())
            }
        })
    }

    async fn authenticate(
        handle: &mut Handle<ClientHandler>,
        profile: &ConnectionProfile,
    ) -> Result<(), TransportError> {
        let result = handle
            .authenticate_password(profile.user(), profile.password())
            .await
            .map_err(|e| TransportError::AuthenticationFailed(e.to_string()))?;

        if !result.success() {
            return Err(TransportError::AuthenticationFailed(
                "Authentication rejected by server".to_string(),
            ));
        }
        Ok(())
    }

    async fn open_sftp(handle: &Handle<ClientHandler>) -> Result<RusshSftpSession, TransportError> {
        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("Failed to open channel: {}", e)))?;

        channel.request_subsystem(true, "sftp").await.map_err(|e| {
            TransportError::ConnectionFailed(format!("Failed to request SFTP subsystem: {}", e))
        })?;

        RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("SFTP subsystem unavailable: {}", e)))
    }
}

#[async_trait]
impl Connector for SftpConnector {
    type Session = SftpSessionHandle;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Session, TransportError> {
        info!("Connecting to SFTP server at {}", profile.address());
        if profile.secure() {
            debug!("'secure' flag set; SFTP is always encrypted, nothing to change");
        }

        let mut handle = self.handshake(profile).await?;
        debug!("SSH handshake completed");

        let sftp = match Self::authenticate(&mut handle, profile).await {
            Ok(()) => Self::open_sftp(&handle).await,
            Err(e) => Err(e),
        };

        match sftp {
            Ok(sftp) => {
                info!("SFTP session open for {}@{}", profile.user(), profile.address());
                Ok(SftpSessionHandle {
                    handle,
                    sftp,
                    address: profile.address(),
                })
            }
            Err(e) => {
                // Authenticated or not, the TCP connection is already up
                if let Err(close_err) = handle
                    .disconnect(Disconnect::ByApplication, "", "en")
                    .await
                {
                    debug!("Disconnect after failed setup: {}", close_err);
                }
                Err(e)
            }
        }
    }
}

fn kind_marker(metadata: &FileAttributes) -> char {
    if metadata.is_dir() {
        DIRECTORY_MARKER
    } else if metadata.is_symlink() {
        SYMLINK_MARKER
    } else if metadata.is_regular() {
        FILE_MARKER
    } else {
        UNKNOWN_MARKER
    }
}

/// An open SFTP session and the SSH connection carrying it.
pub struct SftpSessionHandle {
    handle: Handle<ClientHandler>,
    sftp: RusshSftpSession,
    address: String,
}

#[async_trait]
impl RemoteSession for SftpSessionHandle {
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteRecord>, TransportError> {
        debug!("Listing directory: {}", path);

        let read_dir = self.sftp.read_dir(path).await?;

        let mut records = Vec::new();
        for entry in read_dir {
            let name = entry.file_name();
            if name == "." || name == ".." {
                continue;
            }
            let metadata = entry.metadata();
            records.push(RemoteRecord {
                name,
                kind_marker: kind_marker(&metadata),
                size: metadata.size,
                mtime: metadata.mtime,
            });
        }

        debug!("Listed {} entries in {}", records.len(), path);
        Ok(records)
    }

    async fn get(&mut self, remote: &str, local: &Path) -> Result<u64, TransportError> {
        debug!("Downloading {} -> {:?}", remote, local);

        let mut remote_file = self.sftp.open(remote).await?;
        let mut local_file = tokio::fs::File::create(local).await?;

        let copied = tokio::io::copy(&mut remote_file, &mut local_file).await?;
        local_file.flush().await?;

        debug!("Downloaded {} bytes from {}", copied, remote);
        Ok(copied)
    }

    async fn put(&mut self, local: &Path, remote: &str) -> Result<u64, TransportError> {
        debug!("Uploading {:?} -> {}", local, remote);

        let mut local_file = tokio::fs::File::open(local).await?;
        let mut remote_file = self.sftp.create(remote).await?;

        let copied = tokio::io::copy(&mut local_file, &mut remote_file).await?;
        remote_file.flush().await?;
        remote_file.shutdown().await?;

        debug!("Uploaded {} bytes to {}", copied, remote);
        Ok(copied)
    }

    async fn mkdir(&mut self, path: &str) -> Result<(), TransportError> {
        debug!("Creating directory: {}", path);
        Ok(self.sftp.create_dir(path).await?)
    }

    async fn rmdir(&mut self, path: &str) -> Result<(), TransportError> {
        debug!("Removing directory: {}", path);
        Ok(self.sftp.remove_dir(path).await?)
    }

    async fn remove(&mut self, path: &str) -> Result<(), TransportError> {
        debug!("Removing file: {}", path);
        Ok(self.sftp.remove_file(path).await?)
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        debug!("Disconnecting from {}", self.address);
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

/// russh callbacks: host key checking only.
pub struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl client::Handler for ClientHandler {
    type Error = TransportError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256);

        match &self.policy {
            HostKeyPolicy::AcceptAny => {
                debug!(
                    "Accepting host key for {}:{} ({})",
                    self.host, self.port, fingerprint
                );
                Ok(true)
            }
            HostKeyPolicy::KnownHosts(path) => {
                match russh::keys::check_known_hosts_path(
                    &self.host,
                    self.port,
                    server_public_key,
                    path,
                ) {
                    Ok(true) => {
                        info!("Host key verified for {}:{}", self.host, self.port);
                        Ok(true)
                    }
                    Ok(false) => {
                        warn!(
                            "Unknown host key for {}:{} ({}), rejecting",
                            self.host, self.port, fingerprint
                        );
                        Err(TransportError::HostKeyRejected(format!(
                            "{}:{} is not in {:?} (fingerprint: {})",
                            self.host, self.port, path, fingerprint
                        )))
                    }
                    Err(e) => {
                        warn!(
                            "Host key check failed for {}:{}: {}",
                            self.host, self.port, e
                        );
                        Err(TransportError::HostKeyRejected(format!(
                            "{}:{}: {}",
                            self.host, self.port, e
                        )))
                    }
                }
            }
        }
    }
}
