//! In-memory transport for tests
//!
//! Behaves like a small SFTP server: a tree of files and directories behind a
//! password, with counters for connects, disconnects and primitive calls.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Connector, RemoteSession};
use crate::config::ConnectionProfile;
use crate::entry::{RemoteRecord, DIRECTORY_MARKER, FILE_MARKER, SYMLINK_MARKER};
use crate::error::TransportError;

pub const AUTH_FAILURE: &str = "All configured authentication methods failed";

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mtime: Option<u32> },
    Dir { mtime: Option<u32> },
    Link,
}

#[derive(Debug)]
pub struct MemoryState {
    nodes: BTreeMap<String, Node>,
    password: String,
    pub connects: usize,
    pub disconnects: usize,
    pub open_sessions: usize,
    /// Primitive calls, e.g. `"mkdir /a"`; connect/disconnect excluded
    pub calls: Vec<String>,
    pub fail_disconnect: bool,
}

/// Cloneable handle to one shared in-memory server.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    /// Empty server with just `/`, accepting `password`.
    pub fn new(password: &str) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { mtime: None });
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                nodes,
                password: password.to_string(),
                connects: 0,
                disconnects: 0,
                open_sessions: 0,
                calls: Vec::new(),
                fail_disconnect: false,
            })),
        }
    }

    pub fn with_dir(self, path: &str, mtime: Option<u32>) -> Self {
        self.state
            .lock()
            .nodes
            .insert(normalize(path), Node::Dir { mtime });
        self
    }

    pub fn with_file(self, path: &str, data: &str, mtime: Option<u32>) -> Self {
        self.state.lock().nodes.insert(
            normalize(path),
            Node::File {
                data: data.as_bytes().to_vec(),
                mtime,
            },
        );
        self
    }

    pub fn with_link(self, path: &str) -> Self {
        self.state.lock().nodes.insert(normalize(path), Node::Link);
        self
    }

    pub fn failing_disconnect(self) -> Self {
        self.state.lock().fail_disconnect = true;
        self
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, MemoryState> {
        self.state.lock()
    }

    pub fn file_contents(&self, path: &str) -> Option<String> {
        match self.state.lock().nodes.get(&normalize(path)) {
            Some(Node::File { data, .. }) => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state.lock().nodes.contains_key(&normalize(path))
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Session, TransportError> {
        let mut state = self.state.lock();
        if profile.password() != state.password {
            return Err(TransportError::AuthenticationFailed(AUTH_FAILURE.to_string()));
        }
        state.connects += 1;
        state.open_sessions += 1;
        Ok(MemorySession {
            state: self.state.clone(),
            open: true,
        })
    }
}

pub struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
    open: bool,
}

impl MemorySession {
    fn record(&self, call: String) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !self.open {
            return Err(TransportError::Disconnected);
        }
        state.calls.push(call);
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

fn children<'a>(nodes: &'a BTreeMap<String, Node>, dir: &str) -> Vec<(&'a String, &'a Node)> {
    let prefix = if dir == "/" {
        "/".to_string()
    } else {
        format!("{}/", dir)
    };
    nodes
        .iter()
        .filter(|(path, _)| {
            path.len() > prefix.len()
                && path.starts_with(&prefix)
                && !path[prefix.len()..].contains('/')
        })
        .collect()
}

fn not_found(path: &str) -> TransportError {
    TransportError::NotFound(format!("No such file: {}", path))
}

fn failure(path: &str) -> TransportError {
    TransportError::Protocol(format!("Failure: {}", path))
}

#[async_trait]
impl RemoteSession for MemorySession {
    async fn list(&mut self, path: &str) -> Result<Vec<RemoteRecord>, TransportError> {
        self.record(format!("list {}", path))?;
        let path = normalize(path);
        let state = self.state.lock();

        match state.nodes.get(&path) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(failure(&path)),
            None => return Err(not_found(&path)),
        }

        let records = children(&state.nodes, &path)
            .into_iter()
            .map(|(child, node)| {
                let name = child.rsplit('/').next().unwrap_or_default().to_string();
                let (kind_marker, size, mtime) = match node {
                    Node::File { data, mtime } => (FILE_MARKER, Some(data.len() as u64), *mtime),
                    Node::Dir { mtime } => (DIRECTORY_MARKER, Some(4096), *mtime),
                    Node::Link => (SYMLINK_MARKER, Some(0), None),
                };
                RemoteRecord {
                    name,
                    kind_marker,
                    size,
                    mtime,
                }
            })
            .collect();
        Ok(records)
    }

    async fn get(&mut self, remote: &str, local: &Path) -> Result<u64, TransportError> {
        self.record(format!("get {}", remote))?;
        let data = match self.state.lock().nodes.get(&normalize(remote)) {
            Some(Node::File { data, .. }) => data.clone(),
            Some(_) => return Err(failure(remote)),
            None => return Err(not_found(remote)),
        };
        tokio::fs::write(local, &data).await?;
        Ok(data.len() as u64)
    }

    async fn put(&mut self, local: &Path, remote: &str) -> Result<u64, TransportError> {
        self.record(format!("put {}", remote))?;
        let data = tokio::fs::read(local).await?;
        let remote = normalize(remote);

        let mut state = self.state.lock();
        match state.nodes.get(&parent(&remote)) {
            Some(Node::Dir { .. }) => {}
            _ => return Err(not_found(&remote)),
        }
        if matches!(state.nodes.get(&remote), Some(Node::Dir { .. })) {
            return Err(failure(&remote));
        }
        let len = data.len() as u64;
        state.nodes.insert(remote, Node::File { data, mtime: None });
        Ok(len)
    }

    async fn mkdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.record(format!("mkdir {}", path))?;
        let path = normalize(path);
        let mut state = self.state.lock();

        if state.nodes.contains_key(&path) {
            return Err(failure(&path));
        }
        match state.nodes.get(&parent(&path)) {
            Some(Node::Dir { .. }) => {}
            _ => return Err(not_found(&path)),
        }
        state.nodes.insert(path, Node::Dir { mtime: None });
        Ok(())
    }

    async fn rmdir(&mut self, path: &str) -> Result<(), TransportError> {
        self.record(format!("rmdir {}", path))?;
        let path = normalize(path);
        let mut state = self.state.lock();

        match state.nodes.get(&path) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(failure(&path)),
            None => return Err(not_found(&path)),
        }
        if path == "/" || !children(&state.nodes, &path).is_empty() {
            return Err(failure(&path));
        }
        state.nodes.remove(&path);
        Ok(())
    }

    async fn remove(&mut self, path: &str) -> Result<(), TransportError> {
        self.record(format!("remove {}", path))?;
        let path = normalize(path);
        let mut state = self.state.lock();

        match state.nodes.get(&path) {
            Some(Node::Dir { .. }) => return Err(failure(&path)),
            Some(_) => {}
            None => return Err(not_found(&path)),
        }
        state.nodes.remove(&path);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if self.open {
            self.open = false;
            state.open_sessions -= 1;
            state.disconnects += 1;
        }
        if state.fail_disconnect {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }
}
