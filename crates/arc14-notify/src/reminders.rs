use std::path::Path;

use anyhow::Result;
use arc14_core::TaskStatus;
use arc14_store::TrackerStore;
use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::mailer::{Delivery, Notifier, reminder_message};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResult {
    pub task_id: String,
    pub title: String,
    pub sent: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub checked: usize,
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<ReminderResult>,
}

/// One pass of the reminder job: every pending, un-notified task due within
/// `lead` of `now` is claimed and sent to `recipient`. A failed send releases
/// the claim so a later pass retries it.
pub async fn run_reminder_scan(
    db_path: &Path,
    notifier: &dyn Notifier,
    recipient: &str,
    now: DateTime<Local>,
    lead: Duration,
) -> Result<ScanReport> {
    let store = TrackerStore::open(db_path)?;
    let candidates = store.reminder_candidates(now.naive_local(), lead)?;
    let mut report = ScanReport {
        checked: candidates.len(),
        ..Default::default()
    };
    if candidates.is_empty() {
        debug!(now = %now.format("%Y-%m-%d %H:%M"), "no tasks due for a reminder");
        return Ok(report);
    }

    for task in candidates {
        if !store.claim_reminder(&task.id, now.with_timezone(&Utc))? {
            debug!(task_id = %task.id, "reminder already claimed");
            continue;
        }

        let outcome = notifier.send(&reminder_message(&task, recipient)).await;
        let result = match outcome {
            Ok(delivery) => {
                info!(
                    task_id = %task.id,
                    title = %task.title,
                    due = %task.scheduled_time.to_12_hour(),
                    message_id = delivery.message_id.as_deref().unwrap_or("-"),
                    "reminder sent"
                );
                report.sent += 1;
                ReminderResult {
                    task_id: task.id,
                    title: task.title,
                    sent: true,
                    error: None,
                }
            }
            Err(err) => {
                warn!(task_id = %task.id, error = %err, "reminder send failed");
                store.release_reminder(&task.id)?;
                report.failed += 1;
                ReminderResult {
                    task_id: task.id,
                    title: task.title,
                    sent: false,
                    error: Some(err.to_string()),
                }
            }
        };
        report.results.push(result);
    }

    info!(
        checked = report.checked,
        sent = report.sent,
        failed = report.failed,
        "reminder scan finished"
    );
    Ok(report)
}

#[derive(Debug)]
pub enum SingleReminder {
    NotFound,
    /// The task is completed or missed.
    NotPending(TaskStatus),
    AlreadySent,
    Sent(Delivery),
    Failed(String),
}

/// Sends a reminder for one task on demand. The email flag is claimed before
/// sending, so a task is never notified twice even while a scan is running,
/// and a failed send releases it again.
pub async fn send_task_reminder(
    db_path: &Path,
    notifier: &dyn Notifier,
    task_id: &str,
    recipient: &str,
    now: DateTime<Utc>,
) -> Result<SingleReminder> {
    let store = TrackerStore::open(db_path)?;
    let Some(task) = store.get_task(task_id)? else {
        return Ok(SingleReminder::NotFound);
    };
    if task.status != TaskStatus::Pending {
        return Ok(SingleReminder::NotPending(task.status));
    }
    if !store.claim_reminder(&task.id, now)? {
        debug!(task_id = %task.id, "manual reminder skipped, already sent");
        return Ok(SingleReminder::AlreadySent);
    }
    match notifier.send(&reminder_message(&task, recipient)).await {
        Ok(delivery) => {
            info!(task_id = %task.id, recipient, "manual reminder sent");
            Ok(SingleReminder::Sent(delivery))
        }
        Err(err) => {
            warn!(task_id = %task.id, error = %err, "manual reminder failed");
            store.release_reminder(&task.id)?;
            Ok(SingleReminder::Failed(err.to_string()))
        }
    }
}
