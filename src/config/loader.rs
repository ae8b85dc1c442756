//! Multi-source config loading with priority merging.
//!
//! Priority order (highest wins):
//!   CLI flags > Environment vars > Project config > User config > Defaults

use std::path::{Path, PathBuf};

use super::schema::{
    default_addr, default_batch_size, default_cors_origins, default_csv_dir, default_db_path,
    default_max_upload_bytes, CallGraphConfig,
};
use crate::error::{CallGraphError, Result};

/// Name of the per-project config file.
pub const PROJECT_CONFIG_FILE: &str = ".callgraph.yaml";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub addr: Option<String>,
    pub db_path: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
}

/// Load configuration from all available sources and merge them.
///
/// Sources (low → high priority):
///   1. Built-in defaults
///   2. User config  (`~/.config/callgraph/config.yaml`)
///   3. Project config (`.callgraph.yaml` in `project_dir`)
///   4. Environment variables (`CALLGRAPH_ADDR`, `CALLGRAPH_DB`, ...)
///   5. CLI flags
pub fn load_config(cli: &CliOverrides, project_dir: Option<&Path>) -> Result<CallGraphConfig> {
    let mut config = CallGraphConfig::default();

    // Layer 2: user config
    if let Some(user) = load_user_config() {
        config = merge_configs(config, user);
    }

    // Layer 3: project config
    if let Some(dir) = project_dir {
        if let Some(project) = load_project_config(dir) {
            config = merge_configs(config, project);
        }
    }

    // Layer 4: environment variables
    load_env_overrides(&mut config)?;

    // Layer 5: CLI flags
    apply_cli_overrides(&mut config, cli);

    config.validate()?;
    Ok(config)
}

/// Load user config from the platform-specific config directory.
///
/// Returns `None` if the file does not exist or is unparseable.
pub fn load_user_config() -> Option<CallGraphConfig> {
    let path = user_config_path()?;
    load_config_file(&path)
}

/// Load project config from `.callgraph.yaml` in the given directory.
///
/// Returns `None` if the file does not exist or is unparseable.
pub fn load_project_config(dir: &Path) -> Option<CallGraphConfig> {
    load_config_file(&dir.join(PROJECT_CONFIG_FILE))
}

/// Apply environment variable overrides from the process environment.
pub fn load_env_overrides(config: &mut CallGraphConfig) -> Result<()> {
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Apply environment overrides read through `lookup`.
///
/// Supported variables:
/// - `CALLGRAPH_ADDR`: server bind address
/// - `CALLGRAPH_DB`: SQLite database path
/// - `CALLGRAPH_CSV_DIR`: root of the audit CSV copies
/// - `CALLGRAPH_CORS_ORIGINS`: comma-separated allowed origins
/// - `CALLGRAPH_BATCH_SIZE`: target rows per merge batch
pub fn apply_env_overrides<F>(config: &mut CallGraphConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("CALLGRAPH_ADDR") {
        config.server.addr = val.trim().to_string();
    }

    if let Some(val) = lookup("CALLGRAPH_DB") {
        config.storage.db_path = PathBuf::from(val);
    }

    if let Some(val) = lookup("CALLGRAPH_CSV_DIR") {
        config.storage.csv_dir = PathBuf::from(val);
    }

    if let Some(val) = lookup("CALLGRAPH_CORS_ORIGINS") {
        config.server.cors_origins = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(val) = lookup("CALLGRAPH_BATCH_SIZE") {
        config.import.batch_size = val.trim().parse().map_err(|_| {
            CallGraphError::Config(format!("CALLGRAPH_BATCH_SIZE is not a number: {val:?}"))
        })?;
    }

    Ok(())
}

/// Apply CLI flags, the highest-priority layer.
pub fn apply_cli_overrides(config: &mut CallGraphConfig, cli: &CliOverrides) {
    if let Some(addr) = &cli.addr {
        config.server.addr = addr.clone();
    }
    if let Some(db) = &cli.db_path {
        config.storage.db_path = db.clone();
    }
    if let Some(dir) = &cli.csv_dir {
        config.storage.csv_dir = dir.clone();
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Platform-specific user config path via the `directories` crate.
fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "callgraph", "callgraph")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Try to load and parse a YAML config file. Returns `None` on any error.
fn load_config_file(path: &Path) -> Option<CallGraphConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring unparseable config {}: {}", path.display(), e);
            None
        }
    }
}

/// Merge two configs: `overlay` fields take priority over `base` wherever
/// the overlay differs from the built-in default.
fn merge_configs(mut base: CallGraphConfig, overlay: CallGraphConfig) -> CallGraphConfig {
    if overlay.version != "1.0" {
        base.version = overlay.version;
    }

    if overlay.server.addr != default_addr() {
        base.server.addr = overlay.server.addr;
    }
    if overlay.server.cors_origins != default_cors_origins() {
        base.server.cors_origins = overlay.server.cors_origins;
    }
    if overlay.server.max_upload_bytes != default_max_upload_bytes() {
        base.server.max_upload_bytes = overlay.server.max_upload_bytes;
    }

    if overlay.storage.db_path != default_db_path() {
        base.storage.db_path = overlay.storage.db_path;
    }
    if overlay.storage.csv_dir != default_csv_dir() {
        base.storage.csv_dir = overlay.storage.csv_dir;
    }

    if overlay.import.batch_size != default_batch_size() {
        base.import.batch_size = overlay.import.batch_size;
    }

    base
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
