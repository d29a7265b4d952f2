//! Cryptographic functions for finvault
//!
//! Provides AES-256-GCM encryption with PBKDF2-HMAC-SHA256 key derivation
//! for backup envelopes, plus zero-on-drop containers for secrets.

pub mod encryption;
pub mod key_derivation;
pub mod random;
pub mod secure_memory;

pub use encryption::BackupCrypto;
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams, PBKDF2_ITERATIONS};
pub use random::{OsRandom, SecureRandom};
pub use secure_memory::{Passphrase, SecureBytes};
