//! finvault - encrypted backups and key lifecycle for a personal finance store
//!
//! Snapshots of the local data store are encrypted with a passphrase-derived
//! AES-256-GCM key and written as `.aabk` envelope files. Old backups are
//! pruned on a retention window, optionally synced to a remote directory,
//! and created daily by a scheduler. A separate random database key is kept
//! in secure storage and rotated on a fixed interval.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Error types and categories
//! - `result`: Tri-state operation outcome
//! - `crypto`: Key derivation, authenticated encryption, secret containers
//! - `envelope`: The `.aabk` binary container format
//! - `store`: JSON document store and atomic file writes
//! - `security`: Secure key/value storage and the database key store
//! - `backup`: Backup manager, retention, cloud sync and scheduling
//! - `cli`: Command handlers for the `finvault` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use finvault::config::{Settings, VaultPaths};
//! use finvault::cli::VaultContext;
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let ctx = VaultContext::open(paths, settings)?;
//! let file = ctx.backup_manager()?.create_backup(Some("correct-horse".into())).await;
//! ```

pub mod backup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod result;
pub mod security;
pub mod store;

pub use error::{VaultError, VaultResult};
pub use result::OpResult;
