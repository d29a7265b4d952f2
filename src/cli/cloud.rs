//! Cloud backup CLI commands

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use crate::backup::{select_latest, CloudBackupClient, DirectoryCloudClient};
use crate::crypto::Passphrase;
use crate::error::{VaultError, VaultResult};

use super::context::{finish, VaultContext};

/// Remote location shared by the cloud subcommands
#[derive(Args)]
pub struct RemoteArgs {
    /// Remote backup directory (defaults to <data dir>/cloud)
    #[arg(long, value_name = "DIR")]
    pub remote: Option<PathBuf>,
}

/// Cloud subcommands
#[derive(Subcommand)]
pub enum CloudCommands {
    /// Create a backup and upload it
    Upload {
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// List remote backups
    List {
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Download the newest remote backup and restore it (replaces ALL current data)
    RestoreLatest {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Tabled)]
struct RemoteRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Modified (UTC)")]
    modified: String,
}

/// Handle a cloud command
pub async fn handle_cloud_command(
    ctx: &VaultContext,
    cmd: CloudCommands,
    passphrase: Option<Passphrase>,
) -> VaultResult<()> {
    let manager = ctx.backup_manager()?;

    match cmd {
        CloudCommands::Upload { remote } => {
            let client = client_for(ctx, remote)?;
            println!("Uploading backup to {}...", client.remote_dir().display());

            if let Some(entry) = finish(manager.upload_to_cloud(&client, passphrase).await)? {
                println!("Uploaded: {}", entry.id);
            } else {
                println!("Upload pending.");
            }
        }

        CloudCommands::List { remote } => {
            let client = client_for(ctx, remote)?;
            let Some(mut entries) = finish(client.list().await)? else {
                println!("Remote listing pending.");
                return Ok(());
            };

            if entries.is_empty() {
                println!("No cloud backups found.");
                return Ok(());
            }

            let latest = select_latest(&entries).map(|e| e.id.clone());
            entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then_with(|| b.id.cmp(&a.id)));

            let rows = entries.iter().map(|e| RemoteRow {
                id: e.id.clone(),
                modified: format_millis(e.modified_at),
            });
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
            if let Some(id) = latest {
                println!("Latest: {}", id);
            }
        }

        CloudCommands::RestoreLatest { remote, force } => {
            let client = client_for(ctx, remote)?;

            if !force {
                println!("Remote: {}", client.remote_dir().display());
                println!();
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  finvault cloud restore-latest --force");
                return Ok(());
            }

            println!("Restoring latest cloud backup...");
            if finish(manager.restore_latest_from_cloud(&client, passphrase).await)?.is_some() {
                println!("Restore complete!");
            } else {
                println!("Restore pending.");
            }
        }
    }

    Ok(())
}

fn client_for(ctx: &VaultContext, args: RemoteArgs) -> VaultResult<DirectoryCloudClient> {
    match args.remote {
        Some(dir) => Ok(DirectoryCloudClient::new(dir)),
        None => {
            let dir = ctx.paths.cloud_dir();
            std::fs::create_dir_all(&dir)
                .map_err(|e| VaultError::Io(format!("Failed to create cloud directory: {}", e)))?;
            Ok(DirectoryCloudClient::new(dir))
        }
    }
}

fn format_millis(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01 00:00:00");
        assert_eq!(format_millis(86_400_000), "1970-01-02 00:00:00");
    }
}
