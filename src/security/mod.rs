//! Secret storage and database key lifecycle

pub mod key_store;
pub mod rotation;
pub mod storage;

pub use key_store::{DatabaseKeyStore, DB_KEY_LEN};
pub use rotation::{KeyRotationPolicy, RotationStatus, DEFAULT_ROTATION_DAYS};
pub use storage::{FileSecureStorage, InMemorySecureStorage, SecureStorage};
