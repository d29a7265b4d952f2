//! Key derivation using PBKDF2-HMAC-SHA256
//!
//! Derives 256-bit AES keys from backup passphrases. The iteration count is
//! fixed: the envelope does not record it, so every backup must be derived
//! with the same count to stay restorable.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use super::secure_memory::Passphrase;

/// PBKDF2 iteration count used for every backup
pub const PBKDF2_ITERATIONS: u32 = 150_000;

/// Derived key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Parameters for key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDerivationParams {
    iterations: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

impl KeyDerivationParams {
    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

/// A derived encryption key
#[derive(ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

/// Derive an encryption key from a passphrase and salt
pub fn derive_key(passphrase: &Passphrase, salt: &[u8], params: &KeyDerivationParams) -> DerivedKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, params.iterations, &mut key);
    DerivedKey { key }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 16] = [7u8; 16];

    #[test]
    fn test_default_iterations() {
        assert_eq!(KeyDerivationParams::default().iterations(), 150_000);
    }

    #[test]
    fn test_same_passphrase_same_key() {
        let params = KeyDerivationParams::default();
        let key1 = derive_key(&"test_passphrase".into(), &SALT, &params);
        let key2 = derive_key(&"test_passphrase".into(), &SALT, &params);
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_passphrase_different_key() {
        let params = KeyDerivationParams::default();
        let key1 = derive_key(&"passphrase1".into(), &SALT, &params);
        let key2 = derive_key(&"passphrase2".into(), &SALT, &params);
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let params = KeyDerivationParams::default();
        let key1 = derive_key(&"same".into(), &[1u8; 16], &params);
        let key2 = derive_key(&"same".into(), &[2u8; 16], &params);
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }
}
