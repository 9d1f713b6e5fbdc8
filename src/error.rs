//! Error types
//!
//! Sessions report [`TransportError`]. Every client operation folds that into
//! an [`FtpError`], which renders as `Failed to <operation>: <cause>` and keeps
//! the cause as its source.

use std::fmt;

use thiserror::Error;

/// Failure reported by the session transport or the staging area.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Host key verification failed: {0}")]
    HostKeyRejected(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("No such file: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("SFTP protocol error: {0}")]
    Protocol(String),

    #[error("SSH error: {0}")]
    Ssh(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Disconnected")]
    Disconnected,
}

impl TransportError {
    /// True for failures raised while establishing a session.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed(_)
                | TransportError::AuthenticationFailed(_)
                | TransportError::HostKeyRejected(_)
                | TransportError::Timeout(_)
        )
    }
}

impl From<russh::Error> for TransportError {
    fn from(err: russh::Error) -> Self {
        TransportError::Ssh(err.to_string())
    }
}

impl From<russh_sftp::client::error::Error> for TransportError {
    fn from(err: russh_sftp::client::error::Error) -> Self {
        let err_str = err.to_string();
        if err_str.contains("No such file") || err_str.contains("not found") {
            TransportError::NotFound(err_str)
        } else if err_str.contains("Permission denied") {
            TransportError::PermissionDenied(err_str)
        } else {
            TransportError::Protocol(err_str)
        }
    }
}

/// The remote action a client call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Download,
    Upload,
    CreateDirectory,
    DeleteFile,
    DeleteDirectory,
}

impl Operation {
    fn is_transfer(self) -> bool {
        matches!(self, Operation::Download | Operation::Upload)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::List => "list directory",
            Operation::Download => "download file",
            Operation::Upload => "upload file",
            Operation::CreateDirectory => "create directory",
            Operation::DeleteFile => "delete file",
            Operation::DeleteDirectory => "delete directory",
        };
        f.write_str(label)
    }
}

/// Coarse failure class of an [`FtpError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Transfer,
    Operation,
}

/// Normalized error returned by every [`FtpClient`](crate::FtpClient) method.
#[derive(Error, Debug)]
pub enum FtpError {
    /// Authentication, network or handshake failure while connecting.
    #[error("Failed to {operation}: {source}")]
    Connection {
        operation: Operation,
        source: TransportError,
    },

    /// Download or upload failure, including local staged-file I/O.
    #[error("Failed to {operation}: {source}")]
    Transfer {
        operation: Operation,
        source: TransportError,
    },

    /// Listing or mutation failure after the session was established.
    #[error("Failed to {operation}: {source}")]
    Operation {
        operation: Operation,
        source: TransportError,
    },
}

impl FtpError {
    /// Classify `source` for `operation`. Connect-time failures are always
    /// [`ErrorKind::Connection`], whatever the operation.
    pub fn new(operation: Operation, source: TransportError) -> Self {
        if source.is_connect_failure() {
            FtpError::Connection { operation, source }
        } else if operation.is_transfer() {
            FtpError::Transfer { operation, source }
        } else {
            FtpError::Operation { operation, source }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FtpError::Connection { .. } => ErrorKind::Connection,
            FtpError::Transfer { .. } => ErrorKind::Transfer,
            FtpError::Operation { .. } => ErrorKind::Operation,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            FtpError::Connection { operation, .. }
            | FtpError::Transfer { operation, .. }
            | FtpError::Operation { operation, .. } => *operation,
        }
    }

    /// The underlying transport failure.
    pub fn cause(&self) -> &TransportError {
        match self {
            FtpError::Connection { source, .. }
            | FtpError::Transfer { source, .. }
            | FtpError::Operation { source, .. } => source,
        }
    }
}

// Callers that forward errors over JSON only see the message
impl serde::Serialize for FtpError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FtpError>;
