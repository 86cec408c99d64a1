mod arcs;
mod habits;
mod journals;
mod logs;
mod mirror;
mod notifications;
mod tasks;

use std::sync::Arc;

use arc14_core::ValidationError;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;

use crate::{ApiError, AppState};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
struct ApiHealth {
    status: &'static str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct Message {
    message: &'static str,
}

impl Message {
    fn json(message: &'static str) -> Json<Self> {
        Json(Self { message })
    }
}

/// Parses an optional query filter; a blank value means "no filter".
fn filter<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    raw.filter(|v| !v.trim().is_empty()).map(parse).transpose()
}

/// Splits a comma-separated query value into trimmed, non-empty items.
fn comma_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

pub(crate) fn api() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/habits", get(habits::list).post(habits::create))
        .route(
            "/api/habits/{id}",
            get(habits::fetch).put(habits::update).delete(habits::remove),
        )
        .route("/api/habits/{id}/toggle", post(habits::toggle))
        .route("/api/habits/{id}/stats", get(habits::stats))
        .route("/api/logs", get(logs::list).post(logs::create))
        .route("/api/logs/stats/mood", get(logs::mood_stats))
        .route(
            "/api/logs/{id}",
            get(logs::fetch).put(logs::update).delete(logs::remove),
        )
        .route("/api/journals", get(journals::list).post(journals::create))
        .route("/api/journals/stats/categories", get(journals::category_stats))
        .route(
            "/api/journals/{id}",
            get(journals::fetch)
                .put(journals::update)
                .delete(journals::remove),
        )
        .route("/api/arc-cycles", get(arcs::list).post(arcs::create))
        .route("/api/arc-cycles/stats/status", get(arcs::status_stats))
        .route(
            "/api/arc-cycles/{id}",
            get(arcs::fetch).put(arcs::update).delete(arcs::remove),
        )
        .route("/api/arc-cycles/{id}/insights", post(arcs::add_insight))
        .route("/api/arc-cycles/{id}/evaluate", post(arcs::evaluate))
        .route("/api/mirror14/evaluate", post(mirror::evaluate))
        .route("/api/mirror14/rules", get(mirror::rules))
        .route("/api/scheduled-tasks", get(tasks::list).post(tasks::create))
        .route("/api/scheduled-tasks/stats/summary", get(tasks::summary))
        .route("/api/scheduled-tasks/email/pending", get(tasks::pending_reminders))
        .route(
            "/api/scheduled-tasks/config/scheduling-window",
            get(tasks::scheduling_window),
        )
        .route("/api/scheduled-tasks/reminders/run", post(tasks::run_reminders))
        .route(
            "/api/scheduled-tasks/{id}",
            get(tasks::fetch).put(tasks::update).delete(tasks::remove),
        )
        .route("/api/scheduled-tasks/{id}/complete", put(tasks::complete))
        .route("/api/scheduled-tasks/{id}/email-sent", put(tasks::mark_email_sent))
        .route("/api/scheduled-tasks/{id}/send-reminder", post(tasks::send_reminder))
        .route("/api/notifications/config", get(notifications::config))
        .route("/api/notifications/test", post(notifications::test_send))
}

async fn api_health() -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "OK",
        message: "ARC-14 API is running",
    })
}
