//! Daily scheduled backups
//!
//! A backup runs once a day at a fixed local hour using the stored
//! passphrase. A missing passphrase is a permanent failure for that run;
//! any other failure is retried a few times with a fixed backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tracing::{error, info, warn};

use crate::error::{SecurityError, VaultError, VaultResult};
use crate::result::OpResult;

use super::manager::BackupManager;

/// Default local hour for the daily run
pub const DEFAULT_SCHEDULE_HOUR: u32 = 2;

/// Wait between attempts of a failed run
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(15 * 60);

/// Attempts per daily run
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What to do after a scheduled run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    Success,
    Retry,
    Failure,
}

/// Classify the outcome of a scheduled backup
pub fn classify<T>(result: &OpResult<T>) -> RunDecision {
    match result {
        OpResult::Success(_) => RunDecision::Success,
        OpResult::Error(e) if e.security_reason() == Some(SecurityError::PassphraseNotSet) => {
            RunDecision::Failure
        }
        OpResult::Error(_) | OpResult::Pending => RunDecision::Retry,
    }
}

/// Time until the next `hour:00:00` in `now`'s timezone
///
/// Today's slot if it has not passed yet, otherwise tomorrow's.
pub fn next_run_delay<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> VaultResult<Duration> {
    let slot_on = |date: chrono::NaiveDate| {
        date.and_hms_opt(hour, 0, 0)
            .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest())
    };

    let today = now.date_naive();
    let mut next = slot_on(today)
        .ok_or_else(|| VaultError::Config(format!("Invalid schedule hour: {}", hour)))?;

    if next < *now {
        let tomorrow = today
            .succ_opt()
            .and_then(slot_on)
            .ok_or_else(|| VaultError::Config(format!("Invalid schedule hour: {}", hour)))?;
        next = tomorrow;
    }

    Ok(next
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or_default())
}

/// Runs daily backups until told to stop
pub struct BackupScheduler {
    manager: Arc<BackupManager>,
    hour: u32,
    retry_backoff: Duration,
    max_attempts: u32,
}

impl BackupScheduler {
    pub fn new(manager: Arc<BackupManager>, hour: u32) -> VaultResult<Self> {
        if hour > 23 {
            return Err(VaultError::Config(format!("Invalid schedule hour: {}", hour)));
        }
        Ok(Self {
            manager,
            hour,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    pub fn with_retry(mut self, backoff: Duration, max_attempts: u32) -> Self {
        self.retry_backoff = backoff;
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay until the next scheduled run from the local clock
    pub fn next_delay(&self) -> VaultResult<Duration> {
        next_run_delay(&Local::now(), self.hour)
    }

    /// One scheduled run, retrying transient failures
    pub async fn run_once(&self) -> RunDecision {
        for attempt in 1..=self.max_attempts {
            let result = self.manager.create_backup(None).await;
            let decision = classify(&result);

            match (&decision, &result) {
                (RunDecision::Success, _) => {
                    info!(attempt, "Scheduled backup succeeded");
                    return decision;
                }
                (RunDecision::Failure, OpResult::Error(e)) => {
                    error!(error = %e, "Scheduled backup failed permanently");
                    return decision;
                }
                (_, OpResult::Error(e)) => {
                    warn!(attempt, error = %e, "Scheduled backup failed, will retry");
                }
                _ => warn!(attempt, "Scheduled backup pending, will retry"),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_backoff).await;
            }
        }

        RunDecision::Retry
    }

    /// Run daily until `shutdown` resolves
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> VaultResult<()> {
        tokio::pin!(shutdown);

        loop {
            let delay = self.next_delay()?;
            info!(hour = self.hour, delay_secs = delay.as_secs(), "Waiting for next scheduled backup");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(delay) => {}
            }

            tokio::select! {
                _ = &mut shutdown => break,
                decision = self.run_once() => {
                    info!(?decision, "Scheduled run finished");
                }
            }

            // Don't fire twice within the same slot
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }
}
