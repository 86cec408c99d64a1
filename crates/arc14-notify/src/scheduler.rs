use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc14_common::NotificationConfig;
use arc14_core::Clock;
use chrono::Duration;
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::mailer::Notifier;
use crate::reminders::run_reminder_scan;

/// Everything the background scan needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub db_path: PathBuf,
    pub schedule: Schedule,
    pub lead: Duration,
    pub recipient: String,
}

impl ReminderSettings {
    /// Returns `None` when reminders are disabled or there is nobody to
    /// notify.
    pub fn from_config(config: &NotificationConfig, db_path: PathBuf) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(recipient) = config
            .recipient
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        else {
            return Ok(None);
        };
        let schedule = Schedule::from_str(&config.scan_schedule)
            .with_context(|| format!("invalid scan schedule '{}'", config.scan_schedule))?;
        Ok(Some(Self {
            db_path,
            schedule,
            lead: Duration::minutes(config.lead_minutes),
            recipient: recipient.to_string(),
        }))
    }
}

/// Background reminder job owned by the server. Dropping it without calling
/// [`ReminderScheduler::stop`] aborts the loop.
pub struct ReminderScheduler {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ReminderScheduler {
    pub fn start(
        settings: ReminderSettings,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);
        info!(
            recipient = %settings.recipient,
            lead_minutes = settings.lead.num_minutes(),
            "reminder scheduler started"
        );
        let handle = tokio::spawn(scan_loop(settings, notifier, clock, rx));
        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take()
            && let Err(err) = handle.await
            && !err.is_cancelled()
        {
            error!(error = %err, "reminder scheduler task failed");
        }
        info!("reminder scheduler stopped");
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn scan_loop(
    settings: ReminderSettings,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let now = clock.now();
        let Some(next) = settings.schedule.after(&now).next() else {
            warn!("reminder schedule has no upcoming run; scheduler exiting");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => return,
        }
        if *shutdown.borrow() {
            return;
        }

        if let Err(err) = run_reminder_scan(
            &settings.db_path,
            notifier.as_ref(),
            &settings.recipient,
            clock.now(),
            settings.lead,
        )
        .await
        {
            error!(error = %err, "reminder scan failed");
        }
    }
}
