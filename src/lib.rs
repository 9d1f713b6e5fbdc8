//! oxide-ftp - connection-scoped SFTP client
//!
//! Each [`FtpClient`] call opens a fresh SSH/SFTP session, performs exactly
//! one remote operation (list, download, upload, mkdir, delete), disconnects,
//! and returns either the result or a normalized [`FtpError`].
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use oxide_ftp::{ConnectionProfile, FtpClient};
//!
//! let profile = ConnectionProfile::new("files.example.com", 22, "bob", "secret", false)?;
//! let client = FtpClient::new(profile)?;
//!
//! client.upload("/home/bob/hello.txt", "hi there").await?;
//! for entry in client.list("/home/bob").await? {
//!     println!("{} {:?} {}", entry.name, entry.kind, entry.size);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod logging;
pub mod staging;
pub mod transport;

pub use client::{DownloadedFile, FtpClient};
pub use config::{ClientSettings, ConfigError, ConnectionProfile, HostKeyPolicy};
pub use entry::{DirectoryEntry, EntryKind};
pub use error::{ErrorKind, FtpError, Operation, TransportError};
pub use logging::init_logging;
pub use transport::{Connector, RemoteSession, SftpConnector};
