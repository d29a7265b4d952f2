//! Database key CLI commands

use chrono::{TimeZone, Utc};
use clap::Subcommand;

use crate::error::VaultResult;

use super::context::VaultContext;

/// Key subcommands
#[derive(Subcommand)]
pub enum KeyCommands {
    /// Generate the database key if it does not exist yet
    Init,

    /// Show key rotation status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the database key with a new random one
    Rotate {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a key command
pub fn handle_key_command(ctx: &VaultContext, cmd: KeyCommands) -> VaultResult<()> {
    let keys = ctx.key_store();
    let policy = ctx.settings.rotation_policy();

    match cmd {
        KeyCommands::Init => {
            let existed = keys.has_key();
            keys.get_or_create_key()?;
            if existed {
                println!("Database key already exists.");
            } else {
                println!("Database key generated.");
            }
        }

        KeyCommands::Status { json } => {
            let status = keys.rotation_status(&policy);

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            println!("Database Key");
            println!("============");
            println!("Key present:      {}", if keys.has_key() { "yes" } else { "no" });
            println!("Rotation every:   {} days", policy.interval_days);
            println!("Last rotated:     {}", format_timestamp(status.last_rotated_at));
            println!("Next rotation:    {}", format_timestamp(status.next_rotation_at));
            if status.is_due {
                println!();
                println!("Rotation is due. Run: finvault key rotate --force");
            }
        }

        KeyCommands::Rotate { force } => {
            if !force {
                println!("WARNING: Data encrypted with the current key must be re-encrypted.");
                println!("To proceed, run again with --force flag:");
                println!("  finvault key rotate --force");
                return Ok(());
            }

            keys.rotate_key()?;
            let status = keys.rotation_status(&policy);
            println!("Database key rotated.");
            println!("Next rotation: {}", format_timestamp(status.next_rotation_at));
        }
    }

    Ok(())
}

/// `never` for the zero sentinel
fn format_timestamp(ms: i64) -> String {
    if ms == 0 {
        return "never".to_string();
    }
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
