use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use arc14_common::NotificationConfig;
use arc14_core::input::NewScheduledTask;
use arc14_core::window::SchedulingWindow;
use arc14_core::{Clock, FixedClock};
use arc14_notify::{Delivery, EmailMessage, Notifier};
use arc14_store::TrackerStore;
use arc14_web::{AppState, router};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
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
        self.sent.lock().expect("lock").push(message.clone());
        Ok(Delivery {
            recipient: message.to.clone(),
            message_id: Some("msg-1".to_string()),
        })
    }
}

struct Harness {
    _tmp: TempDir,
    db: PathBuf,
    clock: Arc<FixedClock>,
    notifier: Arc<RecordingNotifier>,
    app: Router,
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    today().and_hms_opt(hour, minute, 0).expect("valid time")
}

fn harness(now: NaiveDateTime) -> Harness {
    let tmp = tempdir().expect("tempdir");
    let db = tmp.path().join("arc14.db");
    TrackerStore::open(&db).expect("open store");
    let clock = Arc::new(FixedClock::at_local(now));
    let notifier = Arc::new(RecordingNotifier::default());
    let state = Arc::new(AppState {
        db_path: db.clone(),
        clock: clock.clone(),
        window: SchedulingWindow::new(21),
        notifier: notifier.clone(),
        notifications: NotificationConfig {
            recipient: Some("me@example.com".to_string()),
            ..Default::default()
        },
    });
    Harness {
        _tmp: tmp,
        db,
        clock,
        notifier,
        app: router(state),
    }
}

impl Harness {
    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    fn seed_task(&self, date: NaiveDate, time: &str) -> String {
        let task = NewScheduledTask {
            title: Some("Seeded".to_string()),
            scheduled_date: Some(date.format("%Y-%m-%d").to_string()),
            scheduled_time: Some(time.to_string()),
            ..Default::default()
        }
        .into_task(Utc::now())
        .expect("valid task");
        TrackerStore::open(&self.db)
            .expect("open store")
            .insert_task(&task)
            .expect("insert");
        task.id
    }
}

fn tomorrow() -> String {
    (today() + Duration::days(1)).format("%Y-%m-%d").to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let h = harness(at(10, 0));
    let (status, body) = h.call(Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn created_task_is_rendered_in_twelve_hour_time() {
    let h = harness(at(10, 0));
    let (status, body) = h
        .call(
            Method::POST,
            "/api/scheduled-tasks",
            Some(json!({
                "title": "Gym",
                "scheduledDate": tomorrow(),
                "scheduledTime": "14:30",
                "priority": "high"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["scheduledTime"], "2:30 PM");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["punctualityPoints"], 0);

    let id = body["id"].as_str().expect("id").to_string();
    let stored = TrackerStore::open(&h.db)
        .expect("open store")
        .get_task(&id)
        .expect("get")
        .expect("exists");
    assert_eq!(stored.scheduled_time.to_24_hour(), "14:30");
}

#[tokio::test]
async fn mutations_are_rejected_after_cutoff() {
    let h = harness(at(21, 5));
    let id = h.seed_task(today() + Duration::days(1), "09:00");

    let (status, body) = h
        .call(
            Method::POST,
            "/api/scheduled-tasks",
            Some(json!({
                "title": "Late idea",
                "scheduledDate": tomorrow(),
                "scheduledTime": "9:00 AM"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["schedulingCutoff"], "21:00");
    assert_eq!(body["currentTime"], "21:05:00");

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/api/scheduled-tasks/{id}"),
            Some(json!({ "title": "Renamed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Tasks can only be modified before 21:00");

    let (status, _) = h
        .call(Method::DELETE, &format!("/api/scheduled-tasks/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    h.clock.set(h.clock.now() - Duration::hours(2));
    let (status, body) = h
        .call(Method::DELETE, &format!("/api/scheduled-tasks/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");
}

#[tokio::test]
async fn rescheduling_before_cutoff_rearms_the_reminder() {
    let h = harness(at(10, 0));
    let id = h.seed_task(today() + Duration::days(1), "09:00");
    let store = TrackerStore::open(&h.db).expect("open store");
    assert!(store.mark_email_sent(&id, Utc::now()).expect("mark"));

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/api/scheduled-tasks/{id}"),
            Some(json!({ "scheduledTime": "3:15 PM" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scheduledTime"], "3:15 PM");
    assert_eq!(body["emailSent"], false);
    assert_eq!(body["emailSentAt"], Value::Null);

    let stored = store.get_task(&id).expect("get").expect("exists");
    assert_eq!(stored.scheduled_time.to_24_hour(), "15:15");
    assert!(!stored.email_sent);
}

#[tokio::test]
async fn tasks_before_the_earliest_incomplete_date_are_locked() {
    let h = harness(at(10, 0));
    let day_after = (today() + Duration::days(2)).format("%Y-%m-%d").to_string();
    let (status, _) = h
        .call(
            Method::POST,
            "/api/scheduled-tasks",
            Some(json!({
                "title": "Plan ahead",
                "scheduledDate": day_after,
                "scheduledTime": "08:00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = h
        .call(
            Method::POST,
            "/api/scheduled-tasks",
            Some(json!({
                "title": "Too early",
                "scheduledDate": tomorrow(),
                "scheduledTime": "08:00"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["minimumDate"], day_after);
    assert_eq!(body["attemptedDate"], tomorrow());

    let (_, report) = h
        .call(
            Method::GET,
            "/api/scheduled-tasks/config/scheduling-window",
            None,
        )
        .await;
    assert_eq!(report["rules"]["minimumTaskDate"], day_after);
    assert_eq!(report["currentStatus"]["canCreateTasks"], true);
}

#[tokio::test]
async fn overdue_task_is_missed_when_fetched() {
    let h = harness(at(10, 0));
    let id = h.seed_task(today(), "07:00");

    let (status, body) = h
        .call(Method::GET, &format!("/api/scheduled-tasks/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "missed");
    assert_eq!(body["punctualityPoints"], 0);

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/api/scheduled-tasks/{id}/complete"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot complete a missed task");
}

#[tokio::test]
async fn completion_scores_punctuality_once() {
    let h = harness(at(9, 54));
    let id = h.seed_task(today(), "10:00");
    let uri = format!("/api/scheduled-tasks/{id}/complete");

    let (status, body) = h.call(Method::PUT, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["punctualityPoints"], 10);

    let (status, body) = h.call(Method::PUT, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Task already completed");

    let (_, summary) = h
        .call(Method::GET, "/api/scheduled-tasks/stats/summary", None)
        .await;
    assert_eq!(summary["completedTasks"], 1);
    assert_eq!(summary["totalPointsEarned"], 10);
    assert_eq!(summary["completionRate"], 100);
}

#[tokio::test]
async fn invalid_enum_and_missing_fields_are_bad_requests() {
    let h = harness(at(10, 0));
    let (status, body) = h
        .call(
            Method::POST,
            "/api/scheduled-tasks",
            Some(json!({
                "title": "Odd",
                "scheduledDate": tomorrow(),
                "scheduledTime": "08:00",
                "priority": "urgent"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().expect("message").contains("priority"));

    let (status, body) = h
        .call(Method::POST, "/api/habits", Some(json!({ "description": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "name is required");

    let (status, _) = h
        .call(Method::GET, "/api/logs?mood=ecstatic", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let h = harness(at(10, 0));
    let (status, body) = h.call(Method::GET, "/api/habits/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Habit not found");

    let (status, _) = h
        .call(Method::PUT, "/api/scheduled-tasks/nope/complete", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn toggling_a_habit_twice_restores_the_streak() {
    let h = harness(at(10, 0));
    let (_, habit) = h
        .call(
            Method::POST,
            "/api/habits",
            Some(json!({ "name": "Read", "category": "learning" })),
        )
        .await;
    let id = habit["id"].as_str().expect("id").to_string();
    let uri = format!("/api/habits/{id}/toggle");

    let (status, toggled) = h.call(Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["streak"], 1);

    let (_, untoggled) = h.call(Method::POST, &uri, None).await;
    assert_eq!(untoggled["streak"], 0);
    assert_eq!(untoggled["completedDates"], json!([]));
}

#[tokio::test]
async fn mirror_rewards_complete_reflective_cycles() {
    let h = harness(at(10, 0));
    let (status, full) = h
        .call(
            Method::POST,
            "/api/mirror14/evaluate",
            Some(json!({
                "action": "Ran the morning review",
                "reflection": "I learned that mornings work better",
                "correction": "I will block the first hour tomorrow"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, bare) = h
        .call(
            Method::POST,
            "/api/mirror14/evaluate",
            Some(json!({ "action": "Ran the morning review" })),
        )
        .await;
    assert!(full["score"].as_u64() > bare["score"].as_u64());
    assert!(full.get("evaluatedAt").is_some());

    let (status, body) = h
        .call(Method::POST, "/api/mirror14/evaluate", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "action is required");

    let (_, rules) = h.call(Method::GET, "/api/mirror14/rules", None).await;
    assert_eq!(rules["rules"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn arc_cycle_completes_once_all_parts_are_written() {
    let h = harness(at(10, 0));
    let (status, cycle) = h
        .call(
            Method::POST,
            "/api/arc-cycles",
            Some(json!({ "title": "Focus", "action": "Worked offline" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cycle["status"], "active");
    let id = cycle["id"].as_str().expect("id").to_string();

    let (_, updated) = h
        .call(
            Method::PUT,
            &format!("/api/arc-cycles/{id}"),
            Some(json!({
                "reflection": "Realized notifications cost an hour",
                "correction": "Plan two offline blocks"
            })),
        )
        .await;
    assert_eq!(updated["status"], "completed");

    let (status, with_insight) = h
        .call(
            Method::POST,
            &format!("/api/arc-cycles/{id}/insights"),
            Some(json!({ "text": "Deep work needs silence" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(with_insight["insights"][0]["text"], "Deep work needs silence");
}

#[tokio::test]
async fn manual_reminder_uses_configured_recipient() {
    let h = harness(at(10, 0));
    let id = h.seed_task(today(), "10:20");

    let (_, pending) = h
        .call(Method::GET, "/api/scheduled-tasks/email/pending", None)
        .await;
    assert_eq!(pending.as_array().map(Vec::len), Some(1));

    let (status, body) = h
        .call(
            Method::POST,
            &format!("/api/scheduled-tasks/{id}/send-reminder"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"]["recipient"], "me@example.com");
    assert_eq!(h.notifier.sent.lock().expect("lock").len(), 1);

    let (status, body) = h
        .call(
            Method::POST,
            &format!("/api/scheduled-tasks/{id}/send-reminder"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already sent");
    assert_eq!(h.notifier.sent.lock().expect("lock").len(), 1);

    let (_, pending) = h
        .call(Method::GET, "/api/scheduled-tasks/email/pending", None)
        .await;
    assert_eq!(pending.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn malformed_json_body_is_a_bad_request() {
    let h = harness(at(10, 0));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/journals")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = h.app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
