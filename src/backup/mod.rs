//! Encrypted backup system for finvault
//!
//! # Architecture
//!
//! - `BackupManager`: the entry point; creates, restores, verifies and syncs
//!   backups, returning [`OpResult`](crate::result::OpResult)s
//! - `RetentionStore`: names, lists and prunes files in the backup directory
//! - `PassphraseStore`: the stored fallback passphrase
//! - `CloudBackupClient`: the remote store seam, with a directory-backed
//!   implementation
//! - `BackupScheduler`: daily runs with retry classification
//!
//! # Retention Policy
//!
//! Local backups whose embedded timestamp is older than 30 days are deleted
//! after every successful create.
//!
//! # Example
//!
//! ```rust,ignore
//! use finvault::backup::{BackupManager, PassphraseStore, RetentionStore};
//!
//! let manager = BackupManager::new(data, crypto, retention, passphrases, clock);
//! let file = manager.create_backup(Some("correct-horse".into())).await;
//! ```

pub mod cloud;
mod manager;
mod passphrase;
pub mod schedule;
mod store;

pub use cloud::{select_latest, CloudBackupClient, CloudBackupEntry, DirectoryCloudClient};
pub use manager::{BackupManager, RETENTION_DAYS};
pub use passphrase::PassphraseStore;
pub use schedule::{classify, next_run_delay, BackupScheduler, RunDecision};
pub use store::{backup_file_name, timestamp_from_name, BackupInfo, RetentionStore};

use crate::error::VaultResult;

/// Run blocking work (KDF, file I/O) off the async executor
pub(crate) async fn run_blocking<T, F>(work: F) -> VaultResult<T>
where
    F: FnOnce() -> VaultResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
