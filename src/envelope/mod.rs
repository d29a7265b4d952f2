//! Encrypted backup container
//!
//! An [`Envelope`] holds everything needed to decrypt a backup given the
//! passphrase: the KDF salt, the AEAD nonce, a plaintext digest, and the
//! ciphertext with its authentication tag. Envelopes are immutable; the
//! `with_*` helpers return modified copies.
//!
//! # File Format
//!
//! Backups are stored as `.aabk` files, all integers big-endian:
//!
//! ```text
//! MAGIC        4 bytes  "AABK"
//! version      i32
//! created_at   i64      epoch milliseconds
//! salt_len     i32
//! iv_len       i32
//! checksum_len i32
//! cipher_len   i32
//! salt, iv, checksum, ciphertext
//! ```

mod codec;

pub use codec::{read_file, read_from, write_file, write_to, HEADER_LEN, MAGIC};

/// Current container format version
pub const FORMAT_VERSION: i32 = 1;

/// File extension for backup containers
pub const BACKUP_EXTENSION: &str = "aabk";

/// The authenticated, encrypted backup container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    version: i32,
    created_at: i64,
    salt: Vec<u8>,
    iv: Vec<u8>,
    checksum: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(
        version: i32,
        created_at: i64,
        salt: Vec<u8>,
        iv: Vec<u8>,
        checksum: Vec<u8>,
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            version,
            created_at,
            salt,
            iv,
            checksum,
            ciphertext,
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Creation time in epoch milliseconds
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// SHA-256 of the plaintext
    pub fn checksum(&self) -> &[u8] {
        &self.checksum
    }

    /// Ciphertext with the GCM tag appended
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Copy of this envelope with a different ciphertext
    pub fn with_ciphertext(&self, ciphertext: Vec<u8>) -> Self {
        Self {
            ciphertext,
            ..self.clone()
        }
    }

    /// Copy of this envelope with a different checksum
    pub fn with_checksum(&self, checksum: Vec<u8>) -> Self {
        Self {
            checksum,
            ..self.clone()
        }
    }

    /// Total encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.salt.len() + self.iv.len() + self.checksum.len() + self.ciphertext.len()
    }
}
