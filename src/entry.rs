//! Directory entries
//!
//! Maps the records a session lists into [`DirectoryEntry`] values. Nothing
//! here touches the network.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// `ls -l` style type markers
pub const FILE_MARKER: char = '-';
pub const DIRECTORY_MARKER: char = 'd';
pub const SYMLINK_MARKER: char = 'l';
pub const UNKNOWN_MARKER: char = '?';

/// One listing record as the transport reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub name: String,
    /// Type marker: `-` file, `d` directory, anything else is passed through
    pub kind_marker: char,
    pub size: Option<u64>,
    /// Modification time, seconds since the Unix epoch
    pub mtime: Option<u32>,
}

/// Kind of a remote filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Other,
}

/// Protocol-agnostic description of one remote filesystem object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    /// ISO-8601 (`2023-11-14T22:13:20.000Z`), or empty when unknown
    pub modified_date: String,
}

impl From<RemoteRecord> for DirectoryEntry {
    fn from(record: RemoteRecord) -> Self {
        Self {
            kind: classify(record.kind_marker),
            size: record.size.unwrap_or(0),
            modified_date: format_mtime(record.mtime),
            name: record.name,
        }
    }
}

/// Exact three-way classification; unrecognised markers become `Other`.
pub fn classify(marker: char) -> EntryKind {
    match marker {
        FILE_MARKER => EntryKind::File,
        DIRECTORY_MARKER => EntryKind::Directory,
        _ => EntryKind::Other,
    }
}

/// Epoch seconds to an ISO-8601 UTC string with millisecond precision.
///
/// A missing or zero timestamp yields an empty string.
pub fn format_mtime(mtime: Option<u32>) -> String {
    mtime
        .filter(|secs| *secs != 0)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(i64::from(secs), 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
