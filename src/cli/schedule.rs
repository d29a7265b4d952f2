//! Scheduled backup CLI commands

use std::sync::Arc;

use clap::Subcommand;
use tracing::warn;

use crate::backup::{BackupScheduler, RunDecision};
use crate::error::{VaultError, VaultResult};

use super::backup::format_duration;
use super::context::VaultContext;

/// Schedule subcommands
#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Run the daily backup loop in the foreground until Ctrl-C
    Run {
        /// Local hour (0-23); defaults to the configured hour
        #[arg(long)]
        hour: Option<u32>,
    },

    /// Run one scheduled backup now, with retries
    Once,

    /// Show when the next scheduled backup runs
    Next,
}

/// Handle a schedule command
pub async fn handle_schedule_command(ctx: &VaultContext, cmd: ScheduleCommands) -> VaultResult<()> {
    let manager = Arc::new(ctx.backup_manager()?);
    let configured_hour = ctx.settings.backup.schedule_hour;

    match cmd {
        ScheduleCommands::Run { hour } => {
            let hour = hour.unwrap_or(configured_hour);
            let scheduler = BackupScheduler::new(manager.clone(), hour)?;

            if !manager.passphrases().is_set() {
                warn!("No passphrase stored; scheduled backups will fail until one is set");
            }

            println!("Daily backups at {:02}:00 local time. Press Ctrl-C to stop.", hour);
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "Failed to listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                })
                .await?;
            println!("Scheduler stopped.");
        }

        ScheduleCommands::Once => {
            let scheduler = BackupScheduler::new(manager, configured_hour)?;
            match scheduler.run_once().await {
                RunDecision::Success => println!("Scheduled backup succeeded."),
                RunDecision::Retry => {
                    return Err(VaultError::Unknown(
                        "Scheduled backup did not succeed; it will be retried at the next run".into(),
                    ))
                }
                RunDecision::Failure => {
                    return Err(VaultError::Config(
                        "Scheduled backup failed: no passphrase stored".into(),
                    ))
                }
            }
        }

        ScheduleCommands::Next => {
            let scheduler = BackupScheduler::new(manager, configured_hour)?;
            let delay = scheduler.next_delay()?;
            let delay = chrono::Duration::from_std(delay)
                .map_err(|e| VaultError::Unknown(format!("Invalid delay: {}", e)))?;
            println!(
                "Next backup at {:02}:00 local time (in {}).",
                configured_hour,
                format_duration(delay)
            );
        }
    }

    Ok(())
}
