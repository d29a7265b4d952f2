//! AES-256-GCM backup encryption
//!
//! Turns a passphrase and plaintext into an [`Envelope`] and back. Every call
//! to [`BackupCrypto::encrypt`] draws a fresh salt and IV, derives a key with
//! PBKDF2, and records a SHA-256 digest of the plaintext alongside the
//! ciphertext. The digest is checked after the AEAD tag on decrypt.

use std::sync::Arc;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use sha2::{Digest, Sha256};

use crate::clock::{Clock, SystemClock};
use crate::envelope::{Envelope, FORMAT_VERSION};
use crate::error::{SecurityError, VaultError, VaultResult};

use super::key_derivation::{derive_key, KeyDerivationParams};
use super::random::{OsRandom, SecureRandom};
use super::secure_memory::{Passphrase, SecureBytes};

/// Size of the PBKDF2 salt in bytes
pub const SALT_LEN: usize = 16;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const IV_LEN: usize = 12;

/// Size of the SHA-256 plaintext digest
pub const CHECKSUM_LEN: usize = 32;

/// Encrypts and decrypts backup payloads
pub struct BackupCrypto {
    rng: Arc<dyn SecureRandom>,
    clock: Arc<dyn Clock>,
    params: KeyDerivationParams,
}

impl Default for BackupCrypto {
    fn default() -> Self {
        Self::new(
            Arc::new(OsRandom),
            Arc::new(SystemClock),
            KeyDerivationParams::default(),
        )
    }
}

impl BackupCrypto {
    pub fn new(
        rng: Arc<dyn SecureRandom>,
        clock: Arc<dyn Clock>,
        params: KeyDerivationParams,
    ) -> Self {
        Self { rng, clock, params }
    }

    pub fn params(&self) -> &KeyDerivationParams {
        &self.params
    }

    /// Encrypt `plaintext` under a key derived from `passphrase`
    pub fn encrypt(&self, plaintext: &[u8], passphrase: &Passphrase) -> VaultResult<Envelope> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt);
        let mut iv = [0u8; IV_LEN];
        self.rng.fill(&mut iv);

        let key = derive_key(passphrase, &salt, &self.params);
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::Unknown(format!("Failed to create cipher: {}", e)))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| VaultError::Unknown(format!("Encryption failed: {}", e)))?;

        let checksum = Sha256::digest(plaintext).to_vec();

        Ok(Envelope::new(
            FORMAT_VERSION,
            self.clock.now_ms(),
            salt.to_vec(),
            iv.to_vec(),
            checksum,
            ciphertext,
        ))
    }

    /// Decrypt an envelope, verifying the AEAD tag and then the plaintext digest
    pub fn decrypt(&self, envelope: &Envelope, passphrase: &Passphrase) -> VaultResult<SecureBytes> {
        if envelope.iv().len() != IV_LEN {
            return Err(VaultError::validation(format!(
                "Invalid IV size: expected {}, got {}",
                IV_LEN,
                envelope.iv().len()
            )));
        }

        let key = derive_key(passphrase, envelope.salt(), &self.params);
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::Unknown(format!("Failed to create cipher: {}", e)))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(envelope.iv()), envelope.ciphertext())
            .map(SecureBytes::new)
            .map_err(|_| SecurityError::AuthenticationFailed)?;

        let checksum = Sha256::digest(plaintext.as_bytes());
        if !constant_time_eq(&checksum, envelope.checksum()) {
            return Err(SecurityError::ChecksumMismatch.into());
        }

        Ok(plaintext)
    }
}

/// Compare two byte slices without early exit on the first difference
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
