//! User settings for finvault
//!
//! Backup retention, the daily schedule and key rotation. Every field has a
//! serde default so older or hand-edited files keep loading.

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::backup::schedule::DEFAULT_SCHEDULE_HOUR;
use crate::backup::RETENTION_DAYS;
use crate::error::{VaultError, VaultResult};
use crate::security::{KeyRotationPolicy, DEFAULT_ROTATION_DAYS};
use crate::store::write_json_atomic;

/// Local backup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Days to keep local backups
    pub retention_days: i64,
    /// Local hour (0-23) of the daily scheduled backup
    pub schedule_hour: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            retention_days: RETENTION_DAYS,
            schedule_hour: DEFAULT_SCHEDULE_HOUR,
        }
    }
}

/// Database key rotation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRotationSettings {
    pub interval_days: i64,
}

impl Default for KeyRotationSettings {
    fn default() -> Self {
        Self {
            interval_days: DEFAULT_ROTATION_DAYS,
        }
    }
}

/// User settings for finvault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Schema version for migration support
    pub schema_version: u32,
    pub backup: BackupSettings,
    pub key_rotation: KeyRotationSettings,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            backup: BackupSettings::default(),
            key_rotation: KeyRotationSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or return defaults if the file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> VaultResult<Self> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| VaultError::Config(format!("Failed to parse settings file: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the backup pipeline cannot honour
    pub fn validate(&self) -> VaultResult<()> {
        if self.backup.retention_days < 1 {
            return Err(VaultError::Config(format!(
                "backup.retention_days must be at least 1, got {}",
                self.backup.retention_days
            )));
        }
        if self.backup.schedule_hour > 23 {
            return Err(VaultError::Config(format!(
                "backup.schedule_hour must be 0-23, got {}",
                self.backup.schedule_hour
            )));
        }
        Ok(())
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> VaultResult<()> {
        self.validate()?;
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    pub fn rotation_policy(&self) -> KeyRotationPolicy {
        KeyRotationPolicy::new(self.key_rotation.interval_days)
    }
}
