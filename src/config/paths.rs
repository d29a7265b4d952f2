//! Path management for finvault
//!
//! ## Path Resolution Order
//!
//! 1. `FINVAULT_DATA_DIR` environment variable (if set)
//! 2. The platform config directory from `directories`
//!    (`~/.config/finvault` on Linux, `~/Library/Application Support/finvault`
//!    on macOS, `%APPDATA%\finvault\config` on Windows)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{VaultError, VaultResult};

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "FINVAULT_DATA_DIR";

/// Manages all paths used by finvault
#[derive(Debug, Clone)]
pub struct VaultPaths {
    base_dir: PathBuf,
}

impl VaultPaths {
    /// Resolve the base directory from the environment or the platform default
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> VaultResult<Self> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => ProjectDirs::from("", "", "finvault")
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or_else(|| {
                    VaultError::Config("Could not determine a home directory".into())
                })?,
        };

        Ok(Self { base_dir })
    }

    /// Use a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Domain documents
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Local `.aabk` backups
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Default remote directory for `cloud` commands
    pub fn cloud_dir(&self) -> PathBuf {
        self.base_dir.join("cloud")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Secret key/value store (passphrase, database key)
    pub fn secure_store_file(&self) -> PathBuf {
        self.base_dir.join("secure.json")
    }

    /// Ensure the base, data and backup directories exist
    pub fn ensure_directories(&self) -> VaultResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| VaultError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| VaultError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| VaultError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Whether `init` has run (settings file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}
