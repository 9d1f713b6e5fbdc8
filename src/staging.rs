//! Staging area
//!
//! SFTP transfers in this crate move whole files between a local path and a
//! remote path, so in-memory content is materialized under a scratch
//! directory first. Staged names carry a millisecond timestamp plus a random
//! token so concurrent calls on one client never pick the same file.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Subdirectory of the system temp dir used when no staging dir is configured
pub const STAGING_DIR_NAME: &str = "oxide-ftp-staging";

/// Fallback base name for remote paths such as `/` that have none
const UNNAMED: &str = "unnamed";

/// Which transfer a staged file belongs to; becomes the file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePurpose {
    Download,
    Upload,
}

impl StagePurpose {
    fn prefix(self) -> &'static str {
        match self {
            StagePurpose::Download => "download",
            StagePurpose::Upload => "upload",
        }
    }
}

/// Process-local scratch directory shared by every transfer of a client.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Use `root` as the staging directory, creating it if absent.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        debug!("Staging area ready at {:?}", root);
        Ok(Self { root })
    }

    /// `<temp dir>/oxide-ftp-staging`
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join(STAGING_DIR_NAME)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh staged file path for `remote_path`, e.g.
    /// `download-1700000000000-3f9a1c2e-report.txt`.
    pub fn stage_path(&self, purpose: StagePurpose, remote_path: &str) -> PathBuf {
        let token = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        self.root.join(format!(
            "{}-{}-{}",
            purpose.prefix(),
            token,
            remote_basename(remote_path)
        ))
    }

    /// Write `content` to a staged file.
    pub async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        tokio::fs::write(path, content.as_bytes()).await
    }

    /// Read a staged file as text; invalid UTF-8 is replaced, not rejected.
    pub async fn read_text(&self, path: &Path) -> io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    /// Remove a staged file. Failures are logged and otherwise ignored.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed staged file {:?}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged file {:?}: {}", path, e),
        }
    }
}

/// Last component of a `/`-separated remote path, ignoring trailing slashes.
pub fn remote_basename(remote_path: &str) -> &str {
    remote_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(UNNAMED)
}
