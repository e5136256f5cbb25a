//! Runtime configuration.
//!
//! Loaded from a RON file:
//!
//! ```ron
//! (
//!     auth_url: "https://swift.example.com/auth/v1.0",
//!     num_persistent_connections: 8,
//!     policy: (lenient_access: false),
//! )
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::backend::PoolConfig;
use crate::constants::{
    DEFAULT_AUTH_URL, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_LISTING_PAGE_SIZE,
    DEFAULT_MAX_CONNECTIONS_PER_HOST, DEFAULT_PERSISTENT_CONNECTIONS, DEFAULT_UPLOAD_QUEUE_DEPTH,
};
use crate::shell::ShellPolicy;
use crate::vfs::FsOptions;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/swift/swftp.ron";

/// Per-user config file name, looked up in the home directory.
pub const USER_CONFIG_FILE: &str = ".swftp.ron";

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwftpConfig {
    /// v1.0 auth endpoint.
    pub auth_url: String,
    /// Idle keep-alive connections per backend host.
    pub num_persistent_connections: usize,
    /// Seconds an idle connection is kept.
    pub connection_timeout_secs: u64,
    /// Concurrent requests per backend host.
    pub max_connections_per_host: usize,
    pub listing_page_size: usize,
    pub upload_queue_depth: usize,
    pub policy: ShellPolicy,
}

impl Default for SwftpConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            num_persistent_connections: DEFAULT_PERSISTENT_CONNECTIONS,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            max_connections_per_host: DEFAULT_MAX_CONNECTIONS_PER_HOST,
            listing_page_size: DEFAULT_LISTING_PAGE_SIZE,
            upload_queue_depth: DEFAULT_UPLOAD_QUEUE_DEPTH,
            policy: ShellPolicy::default(),
        }
    }
}

impl SwftpConfig {
    /// Parse a config from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse one file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Load the first config file found.
    ///
    /// An explicit path must exist. Otherwise the system file, then the
    /// user file, are tried; finding neither yields the defaults. Returns
    /// the path that was used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::from_path(path)?, Some(path.to_path_buf())));
        }
        Self::load_first(&search_paths())
    }

    fn load_first(candidates: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in candidates {
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    debug!(path = %path.display(), "loaded config");
                    return Ok((Self::from_ron(&text)?, Some(path.clone())));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok((Self::default(), None))
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_idle_per_host: self.num_persistent_connections,
            idle_timeout: Duration::from_secs(self.connection_timeout_secs),
            max_connections_per_host: self.max_connections_per_host,
        }
    }

    pub fn fs_options(&self) -> FsOptions {
        FsOptions {
            listing_page_size: self.listing_page_size.max(1),
            upload_queue_depth: self.upload_queue_depth.max(1),
        }
    }
}

/// Default config locations, in lookup order.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(USER_CONFIG_FILE));
    }
    paths
}
