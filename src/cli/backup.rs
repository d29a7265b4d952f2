//! Backup CLI commands
//!
//! Implements CLI commands for local backup management.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use crate::backup::{BackupInfo, BackupManager};
use crate::crypto::Passphrase;
use crate::error::{VaultError, VaultResult};

use super::context::{finish, VaultContext};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new encrypted backup
    Create,

    /// List all available backups
    List,

    /// Restore from a backup (replaces ALL current data)
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Check that a backup decrypts with the passphrase
    Verify {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Delete backups older than the retention window
    Prune,
}

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    filename: String,
    #[tabled(rename = "Created (UTC)")]
    created: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Size")]
    size: String,
}

/// Handle a backup command
pub async fn handle_backup_command(
    ctx: &VaultContext,
    cmd: BackupCommands,
    passphrase: Option<Passphrase>,
) -> VaultResult<()> {
    let manager = ctx.backup_manager()?;

    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            if let Some(path) = finish(manager.create_backup(passphrase).await)? {
                println!("Backup created: {}", file_label(&path));
                println!("Location: {}", path.display());
            } else {
                println!("Backup pending.");
            }
        }

        BackupCommands::List => {
            let backups = manager.retention().backup_infos()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: finvault backup create");
                return Ok(());
            }

            println!("{}", backup_table(&backups));
            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Restore { backup, force } => {
            let path = resolve_backup_path(&manager, &backup)?;

            if !force {
                println!("Backup: {}", path.display());
                println!();
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  finvault backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring from {}...", file_label(&path));
            if finish(manager.restore_backup(&path, passphrase).await)?.is_some() {
                println!("Restore complete!");
            } else {
                println!("Restore pending.");
            }
        }

        BackupCommands::Verify { backup } => {
            let path = resolve_backup_path(&manager, &backup)?;
            let verified = finish(manager.verify_backup(&path, passphrase).await)?;
            println!("{}", verify_message(verified, &file_label(&path)));
        }

        BackupCommands::Prune => {
            let retention_days = ctx.settings.backup.retention_days;
            let deleted = finish(manager.prune_expired().await)?.unwrap_or_default();

            if deleted.is_empty() {
                println!("No backups older than {} days.", retention_days);
            } else {
                for path in &deleted {
                    println!("  deleted {}", file_label(path));
                }
                println!("Deleted {} backup(s).", deleted.len());
            }
        }
    }

    Ok(())
}

/// Resolve a backup identifier to a full path
pub fn resolve_backup_path(manager: &BackupManager, backup: &str) -> VaultResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .retention()
            .latest_backup()?
            .ok_or_else(|| VaultError::validation("No backups found"));
    }

    let path = PathBuf::from(backup);
    if path.is_file() {
        return Ok(path);
    }

    let dir = manager.retention().backup_dir();
    let in_dir = dir.join(backup);
    if in_dir.is_file() {
        return Ok(in_dir);
    }

    let with_ext = dir.join(format!("{}.{}", backup, crate::envelope::BACKUP_EXTENSION));
    if with_ext.is_file() {
        return Ok(with_ext);
    }

    Err(VaultError::validation(format!("Backup not found: {}", backup)))
}

/// `verify` only ever succeeds with `true`; `None` means still pending
fn verify_message(verified: Option<bool>, label: &str) -> String {
    match verified {
        Some(_) => format!("Backup OK: {}", label),
        None => "Verification pending.".to_string(),
    }
}

fn backup_table(backups: &[BackupInfo]) -> String {
    let now = Utc::now();
    let rows = backups.iter().enumerate().map(|(i, b)| BackupRow {
        index: i + 1,
        filename: b.filename.clone(),
        created: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        age: format_duration(now.signed_duration_since(b.created_at)),
        size: format_size(b.size_bytes),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

fn file_label(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format a duration in human-readable form
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
