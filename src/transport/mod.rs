//! Session transport
//!
//! [`Connector`] opens one authenticated [`RemoteSession`] per call; the
//! client drives exactly one primitive on it and then disconnects.
//! [`SftpConnector`] is the russh/russh-sftp implementation.

use std::path::Path;

use async_trait::async_trait;

use crate::config::ConnectionProfile;
use crate::entry::RemoteRecord;
use crate::error::TransportError;

#[cfg(test)]
pub(crate) mod memory;
mod sftp;

pub use sftp::{SftpConnector, SftpSessionHandle};

/// Establishes sessions from a [`ConnectionProfile`].
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: RemoteSession;

    /// Connect and authenticate. Fails with a connect-class
    /// [`TransportError`] (see [`TransportError::is_connect_failure`]).
    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Session, TransportError>;
}

/// One authenticated connection to the file server.
#[async_trait]
pub trait RemoteSession: Send {
    /// Entries of `path` in the order the server returns them.
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteRecord>, TransportError>;

    /// Fetch `remote` into the local file `local`. Returns bytes copied.
    async fn get(&mut self, remote: &str, local: &Path) -> Result<u64, TransportError>;

    /// Push the local file `local` to `remote`. Returns bytes copied.
    async fn put(&mut self, local: &Path, remote: &str) -> Result<u64, TransportError>;

    async fn mkdir(&mut self, path: &str) -> Result<(), TransportError>;

    async fn rmdir(&mut self, path: &str) -> Result<(), TransportError>;

    async fn remove(&mut self, path: &str) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
