//! Backup passphrase CLI commands

use clap::Subcommand;

use crate::crypto::Passphrase;
use crate::error::{VaultError, VaultResult};

use super::context::VaultContext;

/// Minimum length accepted for a stored passphrase
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Passphrase subcommands
#[derive(Subcommand)]
pub enum PassphraseCommands {
    /// Store the passphrase used for scheduled and default backups
    Set,

    /// Remove the stored passphrase
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Show whether a passphrase is stored
    Status,
}

/// Handle a passphrase command
///
/// `Set` takes the global `--passphrase` value when given and prompts otherwise.
pub fn handle_passphrase_command(
    ctx: &VaultContext,
    cmd: PassphraseCommands,
    passphrase: Option<Passphrase>,
) -> VaultResult<()> {
    let store = ctx.passphrase_store();

    match cmd {
        PassphraseCommands::Set => {
            let passphrase = match passphrase {
                Some(p) => {
                    check_length(&p)?;
                    p
                }
                None => {
                    println!("Set Backup Passphrase");
                    println!("=====================");
                    println!();
                    println!("IMPORTANT: Backups cannot be restored without this passphrase!");
                    println!();
                    prompt_new_passphrase()?
                }
            };

            store.save(&passphrase)?;
            println!("Passphrase saved.");
        }

        PassphraseCommands::Clear { force } => {
            if !store.is_set() {
                println!("No passphrase is stored.");
                return Ok(());
            }

            if !force {
                println!("Scheduled backups will fail until a new passphrase is set.");
                println!("To proceed, run again with --force flag:");
                println!("  finvault passphrase clear --force");
                return Ok(());
            }

            store.clear()?;
            println!("Passphrase cleared.");
        }

        PassphraseCommands::Status => {
            if store.is_set() {
                println!("Passphrase: set");
            } else {
                println!("Passphrase: not set");
                println!("Set one with: finvault passphrase set");
            }
        }
    }

    Ok(())
}

fn check_length(passphrase: &Passphrase) -> VaultResult<()> {
    if passphrase.len() < MIN_PASSPHRASE_LEN {
        return Err(VaultError::validation(format!(
            "Passphrase must be at least {} characters",
            MIN_PASSPHRASE_LEN
        )));
    }
    Ok(())
}

/// Prompt for a new passphrase with confirmation
fn prompt_new_passphrase() -> VaultResult<Passphrase> {
    loop {
        let first = prompt_passphrase("Enter new passphrase: ")?;

        if check_length(&first).is_err() {
            println!(
                "Passphrase must be at least {} characters. Please try again.",
                MIN_PASSPHRASE_LEN
            );
            continue;
        }

        let second = prompt_passphrase("Confirm passphrase: ")?;

        if first != second {
            println!("Passphrases do not match. Please try again.");
            continue;
        }

        return Ok(first);
    }
}

/// Prompt for a passphrase (hidden input)
fn prompt_passphrase(prompt: &str) -> VaultResult<Passphrase> {
    rpassword::prompt_password(prompt)
        .map(Passphrase::new)
        .map_err(|e| VaultError::Io(format!("Failed to read passphrase: {}", e)))
}
