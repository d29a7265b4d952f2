//! Wiring shared by the command handlers

use std::sync::Arc;

use crate::backup::{BackupManager, PassphraseStore, RetentionStore};
use crate::clock::{Clock, SystemClock};
use crate::config::{Settings, VaultPaths};
use crate::crypto::{BackupCrypto, KeyDerivationParams, OsRandom, Passphrase};
use crate::error::{SecurityError, VaultError, VaultResult};
use crate::result::OpResult;
use crate::security::{DatabaseKeyStore, FileSecureStorage, SecureStorage};
use crate::store::JsonFileStore;

/// Paths, settings and the long-lived collaborators built from them
pub struct VaultContext {
    pub paths: VaultPaths,
    pub settings: Settings,
    secure: Arc<FileSecureStorage>,
    clock: Arc<dyn Clock>,
}

impl VaultContext {
    pub fn open(paths: VaultPaths, settings: Settings) -> VaultResult<Self> {
        let secure = Arc::new(FileSecureStorage::open(paths.secure_store_file())?);
        Ok(Self {
            paths,
            settings,
            secure,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn data_store(&self) -> JsonFileStore {
        JsonFileStore::with_clock(self.paths.data_dir(), self.clock.clone())
    }

    pub fn passphrase_store(&self) -> PassphraseStore {
        PassphraseStore::new(self.secure_storage())
    }

    pub fn key_store(&self) -> DatabaseKeyStore {
        DatabaseKeyStore::new(self.secure_storage(), self.clock.clone(), Arc::new(OsRandom))
    }

    pub fn backup_manager(&self) -> VaultResult<BackupManager> {
        let crypto = BackupCrypto::new(
            Arc::new(OsRandom),
            self.clock.clone(),
            KeyDerivationParams::default(),
        );
        BackupManager::new(
            Arc::new(self.data_store()),
            crypto,
            RetentionStore::new(self.paths.backup_dir()),
            self.passphrase_store(),
            self.clock.clone(),
        )
        .with_retention_days(self.settings.backup.retention_days)
    }

    fn secure_storage(&self) -> Arc<dyn SecureStorage> {
        self.secure.clone()
    }
}

/// Unwrap an operation outcome for display
///
/// `Pending` becomes `None`. A missing passphrase gets a hint on how to set one.
pub fn finish<T>(result: OpResult<T>) -> VaultResult<Option<T>> {
    result.into_result().map_err(|e| {
        if e.security_reason() == Some(SecurityError::PassphraseNotSet) {
            eprintln!("Hint: run 'finvault passphrase set' or set FINVAULT_PASSPHRASE.");
        }
        e
    })
}

/// Reject an empty passphrase supplied through the environment
pub fn explicit_passphrase(value: Option<String>) -> VaultResult<Option<Passphrase>> {
    match value {
        Some(p) if p.is_empty() => Err(VaultError::validation("Passphrase cannot be empty")),
        other => Ok(other.map(Passphrase::new)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_wires_secure_store_file() {
        let temp = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp.path());
        let ctx = VaultContext::open(paths.clone(), Settings::default()).unwrap();

        ctx.passphrase_store().save(&"correct-horse".into()).unwrap();

        assert!(paths.secure_store_file().exists());
        let reopened = VaultContext::open(paths, Settings::default()).unwrap();
        assert!(reopened.passphrase_store().is_set());
    }

    #[tokio::test]
    async fn test_backups_decrypt_with_default_key_derivation() {
        let temp = TempDir::new().unwrap();
        let paths = VaultPaths::with_base_dir(temp.path());
        std::fs::create_dir_all(temp.path()).unwrap();
        std::fs::write(paths.settings_file(), r#"{"kdf": {"iterations": 200000}}"#).unwrap();
        let settings = Settings::load_or_create(&paths).unwrap();
        let ctx = VaultContext::open(paths, settings).unwrap();
        ctx.data_store().initialize().unwrap();

        let manager = ctx.backup_manager().unwrap();
        let file = manager
            .create_backup(Some("correct-horse".into()))
            .await
            .into_result()
            .unwrap()
            .unwrap();

        let envelope = crate::envelope::read_file(&file).unwrap();
        let plaintext = BackupCrypto::default()
            .decrypt(&envelope, &"correct-horse".into())
            .unwrap();
        assert!(crate::store::Snapshot::parse(&plaintext).is_ok());
    }

    #[test]
    fn test_bad_retention_setting_rejected() {
        let temp = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.backup.retention_days = 0;
        let ctx = VaultContext::open(VaultPaths::with_base_dir(temp.path()), settings).unwrap();

        assert!(ctx.backup_manager().is_err());
    }

    #[test]
    fn test_explicit_passphrase() {
        assert!(explicit_passphrase(None).unwrap().is_none());
        assert!(explicit_passphrase(Some(String::new())).is_err());
        assert_eq!(
            explicit_passphrase(Some("pw".into())).unwrap(),
            Some(Passphrase::from("pw"))
        );
    }
}
