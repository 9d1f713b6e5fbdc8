//! Connection profile and client settings
//!
//! A [`ConnectionProfile`] is validated when it is built, whether through
//! [`ConnectionProfile::new`], JSON, or the environment, and cannot change
//! afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variables read by [`ConnectionProfile::from_env`]
pub const ENV_HOST: &str = "FTP_HOST";
pub const ENV_PORT: &str = "FTP_PORT";
pub const ENV_USER: &str = "FTP_USER";
pub const ENV_PASSWORD: &str = "FTP_PASSWORD";
pub const ENV_SECURE: &str = "FTP_SECURE";

/// Profile loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host, port and password credentials for one remote server.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawProfile")]
pub struct ConnectionProfile {
    host: String,
    port: u16,
    user: String,
    password: String,
    /// Kept for compatibility with FTP-style profiles. SFTP is always
    /// encrypted, so it changes nothing.
    secure: bool,
}

#[derive(Deserialize)]
struct RawProfile {
    host: String,
    #[serde(default = "default_port")]
    port: u32,
    user: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    secure: bool,
}

impl TryFrom<RawProfile> for ConnectionProfile {
    type Error = ConfigError;

    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        let port = u16::try_from(raw.port)
            .map_err(|_| ConfigError::InvalidPort(raw.port.to_string()))?;
        Self::new(raw.host, port, raw.user, raw.password, raw.secure)
    }
}

fn default_port() -> u32 {
    22
}

impl ConnectionProfile {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        secure: bool,
    ) -> Result<Self, ConfigError> {
        let host = host.into();
        let user = user.into();

        if host.trim().is_empty() {
            return Err(ConfigError::Missing("host"));
        }
        if user.trim().is_empty() {
            return Err(ConfigError::Missing("user"));
        }
        if port == 0 {
            return Err(ConfigError::InvalidPort("0".to_string()));
        }

        Ok(Self {
            host,
            port,
            user,
            password: password.into(),
            secure,
        })
    }

    /// Parse a JSON profile such as
    /// `{"host": "files.example.com", "port": 22, "user": "bob", "password": "..."}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON profile from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json_str(&contents)
    }

    /// Build a profile from `FTP_HOST`, `FTP_PORT`, `FTP_USER`,
    /// `FTP_PASSWORD` and `FTP_SECURE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(ENV_HOST).ok_or(ConfigError::Missing(ENV_HOST))?;
        let user = lookup(ENV_USER).ok_or(ConfigError::Missing(ENV_USER))?;
        let password = lookup(ENV_PASSWORD).unwrap_or_default();

        let port = match lookup(ENV_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => 22,
        };

        let secure = lookup(ENV_SECURE)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self::new(host, port, user, password, secure)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    /// `host:port`, for logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("secure", &self.secure)
            .finish()
    }
}

/// How the server's host key is checked during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Accept whatever key the server presents (fingerprint is logged).
    #[default]
    AcceptAny,
    /// Only accept keys listed in an OpenSSH `known_hosts` file.
    KnownHosts(PathBuf),
}

/// Optional knobs for [`FtpClient`](crate::FtpClient).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Staging directory; defaults to the system temp dir plus
    /// [`STAGING_DIR_NAME`](crate::staging::STAGING_DIR_NAME).
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Upper bound on the TCP connect + SSH handshake. `None` waits forever.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}
