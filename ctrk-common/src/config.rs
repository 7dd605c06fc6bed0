//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default maximum accepted upload payload size (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default reconciliation chunk size
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default HTTP bind port
pub const DEFAULT_PORT: u16 = 5810;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Data folder holding ctrk.db
    pub root_folder: PathBuf,
    /// HTTP bind port
    pub port: u16,
    /// Payloads above this size are rejected before decoding
    pub max_upload_bytes: usize,
    /// Records per reconciliation transaction
    pub batch_size: usize,
}

impl ServiceConfig {
    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("ctrk.db")
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Optional settings read from the TOML config file
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    root_folder: Option<String>,
    port: Option<u16>,
    max_upload_bytes: Option<usize>,
    batch_size: Option<usize>,
}

/// Resolve service configuration following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable (`CTRK_ROOT_FOLDER`, `CTRK_PORT`,
///    `CTRK_MAX_UPLOAD_BYTES`, `CTRK_BATCH_SIZE`)
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_config(cli_root: Option<&str>, cli_port: Option<u16>) -> ServiceConfig {
    let file = load_toml_config().unwrap_or_default();

    let root_folder = cli_root
        .map(PathBuf::from)
        .or_else(|| std::env::var("CTRK_ROOT_FOLDER").ok().map(PathBuf::from))
        .or_else(|| file.root_folder.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_root_folder);

    let port = cli_port
        .or_else(|| {
            std::env::var("CTRK_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
        })
        .or(file.port)
        .unwrap_or(DEFAULT_PORT);

    let max_upload_bytes = std::env::var("CTRK_MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .or(file.max_upload_bytes)
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

    let batch_size = std::env::var("CTRK_BATCH_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .or(file.batch_size)
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_BATCH_SIZE);

    ServiceConfig {
        root_folder,
        port,
        max_upload_bytes,
        batch_size,
    }
}

/// Read the TOML config file, if one exists
fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()?;
    let contents = std::fs::read_to_string(&path)?;
    toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Locate the platform config file (`~/.config/ctrk/config.toml` on Linux,
/// the equivalent config directory elsewhere)
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir()
        .map(|d| d.join("ctrk").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if user_config.exists() {
        return Ok(user_config);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/ctrk/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ctrk"))
        .unwrap_or_else(|| PathBuf::from("./ctrk_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_cli_argument_wins_over_environment() {
        std::env::set_var("CTRK_ROOT_FOLDER", "/tmp/ctrk-env");
        let config = resolve_config(Some("/tmp/ctrk-cli"), None);
        std::env::remove_var("CTRK_ROOT_FOLDER");

        assert_eq!(config.root_folder, PathBuf::from("/tmp/ctrk-cli"));
    }

    #[test]
    #[serial]
    fn test_environment_variables_apply() {
        std::env::set_var("CTRK_ROOT_FOLDER", "/tmp/ctrk-env");
        std::env::set_var("CTRK_PORT", "6021");
        std::env::set_var("CTRK_BATCH_SIZE", "25");
        let config = resolve_config(None, None);
        std::env::remove_var("CTRK_ROOT_FOLDER");
        std::env::remove_var("CTRK_PORT");
        std::env::remove_var("CTRK_BATCH_SIZE");

        assert_eq!(config.root_folder, PathBuf::from("/tmp/ctrk-env"));
        assert_eq!(config.port, 6021);
        assert_eq!(config.batch_size, 25);
    }

    #[test]
    #[serial]
    fn test_defaults_when_nothing_configured() {
        std::env::remove_var("CTRK_ROOT_FOLDER");
        std::env::remove_var("CTRK_PORT");
        std::env::remove_var("CTRK_MAX_UPLOAD_BYTES");
        std::env::remove_var("CTRK_BATCH_SIZE");
        let config = resolve_config(None, None);

        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.database_path().ends_with("ctrk.db"));
    }

    #[test]
    #[serial]
    fn test_zero_batch_size_falls_back_to_default() {
        std::env::set_var("CTRK_BATCH_SIZE", "0");
        let config = resolve_config(None, None);
        std::env::remove_var("CTRK_BATCH_SIZE");

        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_ensure_root_folder_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            root_folder: dir.path().join("nested").join("ctrk"),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            batch_size: DEFAULT_BATCH_SIZE,
        };

        config.ensure_root_folder().unwrap();
        assert!(config.root_folder.is_dir());
    }
}
