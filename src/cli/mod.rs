//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup and key services.

pub mod backup;
pub mod cloud;
pub mod context;
pub mod key;
pub mod passphrase;
pub mod schedule;

pub use backup::{handle_backup_command, BackupCommands};
pub use cloud::{handle_cloud_command, CloudCommands};
pub use context::{explicit_passphrase, VaultContext};
pub use key::{handle_key_command, KeyCommands};
pub use passphrase::{handle_passphrase_command, PassphraseCommands};
pub use schedule::{handle_schedule_command, ScheduleCommands};
