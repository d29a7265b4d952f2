//! Database-at-rest key lifecycle
//!
//! The database key is machine-generated and lives base64-encoded in
//! [`SecureStorage`] next to the time it was last rotated. Rotating only
//! replaces the stored key; re-encrypting existing data under the new key is
//! the storage engine's job.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;
use tracing::info;

use crate::clock::Clock;
use crate::crypto::{SecureBytes, SecureRandom};
use crate::error::{VaultError, VaultResult};

use super::rotation::{KeyRotationPolicy, RotationStatus};
use super::storage::SecureStorage;

const KEY_DB_KEY: &str = "db_cipher_key";
const KEY_DB_KEY_ROTATED_AT: &str = "db_cipher_key_rotated_at";

/// Size of the database key in bytes
pub const DB_KEY_LEN: usize = 32;

/// Manages the database encryption key
pub struct DatabaseKeyStore {
    storage: Arc<dyn SecureStorage>,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn SecureRandom>,
}

impl DatabaseKeyStore {
    pub fn new(
        storage: Arc<dyn SecureStorage>,
        clock: Arc<dyn Clock>,
        rng: Arc<dyn SecureRandom>,
    ) -> Self {
        Self {
            storage,
            clock,
            rng,
        }
    }

    /// Whether a key has been generated
    pub fn has_key(&self) -> bool {
        self.storage.get_string(KEY_DB_KEY).is_some()
    }

    /// Return the stored key, generating one on first use
    ///
    /// An existing key without a rotation timestamp gets one backfilled to
    /// now, so rotation-due checks have a baseline.
    pub fn get_or_create_key(&self) -> VaultResult<SecureBytes> {
        match self.storage.get_string(KEY_DB_KEY) {
            Some(encoded) => {
                let key = STANDARD
                    .decode(encoded.as_bytes())
                    .map(SecureBytes::new)
                    .map_err(|e| VaultError::Storage(format!("Stored database key is corrupt: {}", e)))?;
                self.ensure_rotation_timestamp()?;
                Ok(key)
            }
            None => self.rotate_key(),
        }
    }

    /// Generate and persist a new key, recording now as the rotation time
    pub fn rotate_key(&self) -> VaultResult<SecureBytes> {
        let mut key = vec![0u8; DB_KEY_LEN];
        self.rng.fill(&mut key);
        let key = SecureBytes::new(key);

        // Key and timestamp land in one write so they never disagree
        let now = self.clock.now_ms();
        self.storage.put_values(vec![
            (KEY_DB_KEY.to_string(), Value::from(STANDARD.encode(key.as_bytes()))),
            (KEY_DB_KEY_ROTATED_AT.to_string(), Value::from(now)),
        ])?;

        info!(rotated_at = now, "Database key rotated");
        Ok(key)
    }

    /// Rotation state under `policy`
    pub fn rotation_status(&self, policy: &KeyRotationPolicy) -> RotationStatus {
        let last_rotated_at = self.storage.get_long(KEY_DB_KEY_ROTATED_AT, 0);
        let next_rotation_at = if last_rotated_at == 0 {
            0
        } else {
            policy.next_rotation_at(last_rotated_at)
        };

        RotationStatus {
            last_rotated_at,
            next_rotation_at,
            is_due: policy.is_rotation_due(last_rotated_at, self.clock.now_ms()),
        }
    }

    fn ensure_rotation_timestamp(&self) -> VaultResult<()> {
        if self.storage.get_long(KEY_DB_KEY_ROTATED_AT, 0) == 0 {
            self.storage
                .put_long(KEY_DB_KEY_ROTATED_AT, self.clock.now_ms())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, MILLIS_PER_DAY};
    use crate::crypto::random::testing::CountingRandom;
    use crate::security::storage::InMemorySecureStorage;

    fn create_test_store() -> (Arc<InMemorySecureStorage>, Arc<FixedClock>, DatabaseKeyStore) {
        let storage = Arc::new(InMemorySecureStorage::new());
        let clock = Arc::new(FixedClock::new(1_000));
        let store = DatabaseKeyStore::new(
            storage.clone(),
            clock.clone(),
            Arc::new(CountingRandom::default()),
        );
        (storage, clock, store)
    }

    #[test]
    fn test_get_or_create_key_persists_timestamp() {
        let (_storage, _clock, store) = create_test_store();

        let key = store.get_or_create_key().unwrap();
        let status = store.rotation_status(&KeyRotationPolicy::new(1));

        assert_eq!(key.len(), DB_KEY_LEN);
        assert_eq!(status.last_rotated_at, 1_000);
        assert!(!status.is_due);
    }

    #[test]
    fn test_get_or_create_key_is_stable() {
        let (_storage, _clock, store) = create_test_store();

        let first = store.get_or_create_key().unwrap();
        let second = store.get_or_create_key().unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rotate_key_changes_key_and_updates_timestamp() {
        let (_storage, clock, store) = create_test_store();
        let policy = KeyRotationPolicy::new(1);

        let first = store.get_or_create_key().unwrap();
        clock.advance(MILLIS_PER_DAY + 1);
        let rotated = store.rotate_key().unwrap();
        let status = store.rotation_status(&policy);

        assert_ne!(first, rotated);
        assert_eq!(status.last_rotated_at, clock.now_ms());
        assert_eq!(status.next_rotation_at, clock.now_ms() + MILLIS_PER_DAY);
        assert!(!status.is_due);
        assert_eq!(store.get_or_create_key().unwrap(), rotated);
    }

    #[test]
    fn test_rotation_due_when_interval_passed() {
        let (_storage, clock, store) = create_test_store();
        let policy = KeyRotationPolicy::new(1);

        store.get_or_create_key().unwrap();
        clock.advance(MILLIS_PER_DAY + 1);

        assert!(store.rotation_status(&policy).is_due);
    }

    #[test]
    fn test_never_created_key_reports_zero() {
        let (_storage, _clock, store) = create_test_store();

        let status = store.rotation_status(&KeyRotationPolicy::default());

        assert!(!store.has_key());
        assert_eq!(status.last_rotated_at, 0);
        assert_eq!(status.next_rotation_at, 0);
        assert!(!status.is_due);
    }

    #[test]
    fn test_missing_timestamp_is_backfilled() {
        let (storage, clock, store) = create_test_store();
        storage
            .put_string(KEY_DB_KEY, &STANDARD.encode([7u8; DB_KEY_LEN]))
            .unwrap();
        clock.set(50_000);

        let key = store.get_or_create_key().unwrap();

        assert_eq!(key.as_bytes(), &[7u8; DB_KEY_LEN]);
        assert_eq!(storage.get_long(KEY_DB_KEY_ROTATED_AT, 0), 50_000);
    }

    /// Delegates reads, fails every batched write
    struct ReadOnlyBatches(Arc<InMemorySecureStorage>);

    impl SecureStorage for ReadOnlyBatches {
        fn put_string(&self, key: &str, value: &str) -> VaultResult<()> {
            self.0.put_string(key, value)
        }
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get_string(key)
        }
        fn put_bool(&self, key: &str, value: bool) -> VaultResult<()> {
            self.0.put_bool(key, value)
        }
        fn get_bool(&self, key: &str, default: bool) -> bool {
            self.0.get_bool(key, default)
        }
        fn put_long(&self, key: &str, value: i64) -> VaultResult<()> {
            self.0.put_long(key, value)
        }
        fn get_long(&self, key: &str, default: i64) -> i64 {
            self.0.get_long(key, default)
        }
        fn put_values(&self, _entries: Vec<(String, Value)>) -> VaultResult<()> {
            Err(VaultError::storage("disk full"))
        }
        fn remove(&self, key: &str) -> VaultResult<()> {
            self.0.remove(key)
        }
        fn clear(&self) -> VaultResult<()> {
            self.0.clear()
        }
    }

    #[test]
    fn test_failed_rotation_keeps_key_and_timestamp_together() {
        let (storage, clock, store) = create_test_store();
        let original = store.get_or_create_key().unwrap();

        clock.advance(MILLIS_PER_DAY);
        let failing = DatabaseKeyStore::new(
            Arc::new(ReadOnlyBatches(storage.clone())),
            clock.clone(),
            Arc::new(CountingRandom::default()),
        );

        assert!(failing.rotate_key().is_err());
        assert_eq!(store.get_or_create_key().unwrap(), original);
        assert_eq!(storage.get_long(KEY_DB_KEY_ROTATED_AT, 0), 1_000);
    }

    #[test]
    fn test_corrupt_key_is_storage_error() {
        let (storage, _clock, store) = create_test_store();
        storage.put_string(KEY_DB_KEY, "!!not base64!!").unwrap();

        let err = store.get_or_create_key().unwrap_err();
        assert!(matches!(err, VaultError::Storage(_)));
    }
}
