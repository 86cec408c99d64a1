use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use arc14_common::NotificationConfig;
use arc14_core::input::NewScheduledTask;
use arc14_core::{Clock, FixedClock, TaskStatus};
use arc14_notify::{
    Delivery, EmailMessage, Notifier, ReminderScheduler, ReminderSettings, SingleReminder,
    run_reminder_scan, send_task_reminder,
};
use arc14_store::TrackerStore;
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, Utc};
use tempfile::tempdir;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    fail_subjects_containing: Option<String>,
}

impl RecordingNotifier {
    fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("lock")
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, message: &EmailMessage) -> Result<Delivery> {
        if let Some(needle) = &self.fail_subjects_containing
            && message.subject.contains(needle.as_str())
        {
            bail!("smtp unavailable");
        }
        self.sent.lock().expect("lock").push(message.clone());
        Ok(Delivery {
            recipient: message.to.clone(),
            message_id: Some("msg-1".to_string()),
        })
    }
}

fn seed(store: &TrackerStore, title: &str, date: NaiveDate, time: &str) -> String {
    let task = NewScheduledTask {
        title: Some(title.to_string()),
        scheduled_date: Some(date.format("%Y-%m-%d").to_string()),
        scheduled_time: Some(time.to_string()),
        ..Default::default()
    }
    .into_task(Utc::now())
    .expect("valid task");
    store.insert_task(&task).expect("insert");
    task.id
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

#[tokio::test]
async fn scan_sends_each_due_task_once() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("arc14.db");
    let store = TrackerStore::open(&db).expect("open store");
    seed(&store, "Standup", date(), "09:15");
    seed(&store, "Lunch", date(), "12:00");

    let clock = FixedClock::at_local(date().and_hms_opt(9, 0, 0).expect("valid time"));
    let notifier = RecordingNotifier::default();

    let first = run_reminder_scan(&db, &notifier, "me@example.com", clock.now(), Duration::minutes(30))
        .await
        .expect("scan");
    assert_eq!(first.checked, 1);
    assert_eq!(first.sent, 1);
    assert_eq!(notifier.subjects(), vec!["Reminder: Standup".to_string()]);

    let second = run_reminder_scan(&db, &notifier, "me@example.com", clock.now(), Duration::minutes(30))
        .await
        .expect("scan");
    assert_eq!(second.checked, 0);
    assert_eq!(notifier.subjects().len(), 1);
}

#[tokio::test]
async fn failed_send_is_reported_and_retried_later() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("arc14.db");
    let store = TrackerStore::open(&db).expect("open store");
    let broken = seed(&store, "Broken", date(), "09:10");
    seed(&store, "Fine", date(), "09:20");

    let clock = FixedClock::at_local(date().and_hms_opt(9, 0, 0).expect("valid time"));
    let notifier = RecordingNotifier {
        fail_subjects_containing: Some("Broken".to_string()),
        ..Default::default()
    };

    let report = run_reminder_scan(&db, &notifier, "me@example.com", clock.now(), Duration::minutes(30))
        .await
        .expect("scan");
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    let failure = report
        .results
        .iter()
        .find(|r| r.task_id == broken)
        .expect("failure recorded");
    assert!(!failure.sent);
    assert_eq!(failure.error.as_deref(), Some("smtp unavailable"));

    let row = store.get_task(&broken).expect("get").expect("exists");
    assert!(!row.email_sent);
}

#[tokio::test]
async fn manual_reminder_marks_task_sent() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("arc14.db");
    let store = TrackerStore::open(&db).expect("open store");
    let id = seed(&store, "Call", date(), "18:00");
    let notifier = RecordingNotifier::default();

    let outcome = send_task_reminder(&db, &notifier, &id, "me@example.com", Utc::now())
        .await
        .expect("send");
    assert!(matches!(outcome, SingleReminder::Sent(_)));
    assert!(store.get_task(&id).expect("get").expect("exists").email_sent);

    let again = send_task_reminder(&db, &notifier, &id, "me@example.com", Utc::now())
        .await
        .expect("send");
    assert!(matches!(again, SingleReminder::AlreadySent));
    assert_eq!(notifier.subjects(), vec!["Reminder: Call".to_string()]);

    let missing = send_task_reminder(&db, &notifier, "nope", "me@example.com", Utc::now())
        .await
        .expect("send");
    assert!(matches!(missing, SingleReminder::NotFound));
}

#[tokio::test]
async fn manual_reminder_skips_finished_tasks_and_releases_on_failure() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("arc14.db");
    let store = TrackerStore::open(&db).expect("open store");
    let done = seed(&store, "Done", date(), "18:00");
    let flaky = seed(&store, "Flaky", date(), "19:00");

    let clock = FixedClock::at_local(date().and_hms_opt(17, 55, 0).expect("valid time"));
    store.complete_task(&done, clock.now()).expect("complete");

    let notifier = RecordingNotifier {
        fail_subjects_containing: Some("Flaky".to_string()),
        ..Default::default()
    };
    let finished = send_task_reminder(&db, &notifier, &done, "me@example.com", clock.now_utc())
        .await
        .expect("send");
    assert!(matches!(
        finished,
        SingleReminder::NotPending(TaskStatus::Completed)
    ));

    let failed = send_task_reminder(&db, &notifier, &flaky, "me@example.com", clock.now_utc())
        .await
        .expect("send");
    assert!(matches!(failed, SingleReminder::Failed(_)));
    assert!(!store.get_task(&flaky).expect("get").expect("exists").email_sent);
    assert!(notifier.subjects().is_empty());
}

#[test]
fn settings_require_a_recipient() {
    let db = std::path::PathBuf::from("arc14.db");
    let without = NotificationConfig::default();
    assert!(
        ReminderSettings::from_config(&without, db.clone())
            .expect("settings")
            .is_none()
    );

    let with = NotificationConfig {
        recipient: Some("me@example.com".to_string()),
        ..Default::default()
    };
    let settings = ReminderSettings::from_config(&with, db)
        .expect("settings")
        .expect("enabled");
    assert_eq!(settings.lead, Duration::minutes(30));
}

#[tokio::test]
async fn scheduler_runs_scan_on_its_cron_schedule() {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("arc14.db");
    let store = TrackerStore::open(&db).expect("open store");
    let due = Local::now() + Duration::minutes(10);
    seed(
        &store,
        "Soon",
        due.date_naive(),
        &due.format("%H:%M").to_string(),
    );

    let config = NotificationConfig {
        recipient: Some("me@example.com".to_string()),
        scan_schedule: "* * * * * *".to_string(),
        ..Default::default()
    };
    let settings = ReminderSettings::from_config(&config, db)
        .expect("settings")
        .expect("enabled");
    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = ReminderScheduler::start(
        settings,
        notifier.clone(),
        Arc::new(arc14_core::SystemClock),
    );

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while notifier.subjects().is_empty() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    scheduler.stop().await;
    assert_eq!(notifier.subjects(), vec!["Reminder: Soon".to_string()]);
}
