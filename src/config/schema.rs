//! Configuration data structures for the call graph service.
//!
//! Defines the YAML config format: server binding, storage locations and
//! import tuning. Every section defaults, so a config file only needs the
//! keys it changes.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CallGraphError, Result};
use crate::import::ImportOptions;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Loaded from YAML files, environment variables, and CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallGraphConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

impl Default for CallGraphConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl CallGraphConfig {
    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        if self.import.batch_size == 0 {
            return Err(CallGraphError::Config(
                "import.batch_size must be at least 1".into(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(CallGraphError::Config(
                "server.max_upload_bytes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            csv_dir: self.storage.csv_dir.clone(),
            batch_size: self.import.batch_size,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Origins allowed to call the API from a browser. `"*"` allows any.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Request body limit, mostly relevant for `POST /import`.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.addr
            .parse()
            .map_err(|e| CallGraphError::Config(format!("invalid server.addr {:?}: {e}", self.addr)))
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Where the graph database and the audit CSV copies live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_csv_dir")]
    pub csv_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            csv_dir: default_csv_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// ImportConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Target rows merged per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

pub(crate) fn default_addr() -> String {
    "127.0.0.1:8000".to_string()
}

pub(crate) fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

pub(crate) fn default_max_upload_bytes() -> usize {
    256 * 1024 * 1024
}

pub(crate) fn default_db_path() -> PathBuf {
    PathBuf::from("callgraph.db")
}

pub(crate) fn default_csv_dir() -> PathBuf {
    PathBuf::from("csv")
}

pub(crate) fn default_batch_size() -> usize {
    crate::import::pipeline::DEFAULT_BATCH_SIZE
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
