//! Stored backup passphrase

use std::sync::Arc;

use crate::crypto::Passphrase;
use crate::error::VaultResult;
use crate::security::SecureStorage;

const KEY_BACKUP_PASSPHRASE: &str = "backup_passphrase";

/// The passphrase used when a backup operation is not given one explicitly
#[derive(Clone)]
pub struct PassphraseStore {
    storage: Arc<dyn SecureStorage>,
}

impl PassphraseStore {
    pub fn new(storage: Arc<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    pub fn save(&self, passphrase: &Passphrase) -> VaultResult<()> {
        self.storage
            .put_string(KEY_BACKUP_PASSPHRASE, passphrase.as_str())
    }

    pub fn load(&self) -> Option<Passphrase> {
        self.storage
            .get_string(KEY_BACKUP_PASSPHRASE)
            .map(Passphrase::new)
    }

    pub fn clear(&self) -> VaultResult<()> {
        self.storage.remove(KEY_BACKUP_PASSPHRASE)
    }

    pub fn is_set(&self) -> bool {
        self.storage.get_string(KEY_BACKUP_PASSPHRASE).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::InMemorySecureStorage;

    #[test]
    fn test_save_load_clear() {
        let store = PassphraseStore::new(Arc::new(InMemorySecureStorage::new()));
        assert!(!store.is_set());
        assert!(store.load().is_none());

        store.save(&Passphrase::from("correct-horse")).unwrap();
        assert!(store.is_set());
        assert_eq!(store.load(), Some(Passphrase::from("correct-horse")));

        store.clear().unwrap();
        assert!(!store.is_set());
    }
}
