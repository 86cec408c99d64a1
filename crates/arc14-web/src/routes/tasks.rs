use std::sync::Arc;

use arc14_core::input::{NewScheduledTask, TaskPatch};
use arc14_core::task::{TaskSummary, minutes_late, punctuality_label};
use arc14_core::timefmt::parse_calendar_date;
use arc14_core::window::{
    TomorrowProgress, ensure_date_allowed, minimum_task_date, tomorrow_progress,
};
use arc14_core::{Priority, ScheduledTask, TaskCategory, TaskMutation, TaskStatus};
use arc14_notify::{ScanReport, SingleReminder, run_reminder_scan, send_task_reminder};
use arc14_store::{CompletionOutcome, TaskFilter, TrackerStore};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::notifications::{EmailRequest, SendOutcome};
use super::{ApiResult, Message, filter};
use crate::error::{OptionalJson, ValidJson, ValidQuery};
use crate::{ApiError, AppState, internal_error, open_store};

/// A task as the client sees it: the time rendered as `H:MM AM/PM`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskView {
    id: String,
    title: String,
    description: String,
    scheduled_date: NaiveDate,
    scheduled_time: String,
    status: TaskStatus,
    completed_at: Option<DateTime<Utc>>,
    punctuality_points: u8,
    email_sent: bool,
    email_sent_at: Option<DateTime<Utc>>,
    priority: Priority,
    category: TaskCategory,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ScheduledTask> for TaskView {
    fn from(task: ScheduledTask) -> Self {
        Self {
            scheduled_time: task.scheduled_time.to_12_hour(),
            id: task.id,
            title: task.title,
            description: task.description,
            scheduled_date: task.scheduled_date,
            status: task.status,
            completed_at: task.completed_at,
            punctuality_points: task.punctuality_points,
            email_sent: task.email_sent,
            email_sent_at: task.email_sent_at,
            priority: task.priority,
            category: task.category,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

fn views(tasks: Vec<ScheduledTask>) -> Vec<TaskView> {
    tasks.into_iter().map(TaskView::from).collect()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskQuery {
    status: Option<String>,
    date: Option<String>,
    upcoming: Option<String>,
}

/// Applies the lazy missed rule to everything overdue at `now`.
fn sweep(store: &TrackerStore, now: DateTime<Local>) -> Result<(), ApiError> {
    let missed = store.sweep_missed(now).map_err(internal_error)?;
    for id in &missed {
        info!(task_id = %id, "task marked missed");
    }
    Ok(())
}

fn lead(state: &AppState) -> Duration {
    Duration::minutes(state.notifications.lead_minutes)
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<TaskQuery>,
) -> ApiResult<Vec<TaskView>> {
    let now = state.clock.now();
    let upcoming = query.upcoming.as_deref() == Some("true");
    let criteria = TaskFilter {
        status: filter(query.status.as_deref(), TaskStatus::parse)?,
        date: filter(query.date.as_deref(), |raw| parse_calendar_date("date", raw))?,
        upcoming_from: upcoming.then(|| now.naive_local()),
    };
    let store = open_store(&state)?;
    sweep(&store, now)?;
    let tasks = store.list_tasks(&criteria).map_err(internal_error)?;
    Ok(Json(views(tasks)))
}

pub(crate) async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TaskView> {
    let store = open_store(&state)?;
    sweep(&store, state.clock.now())?;
    store
        .get_task(&id)
        .map_err(internal_error)?
        .map(|task| Json(TaskView::from(task)))
        .ok_or(ApiError::NotFound("Task"))
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(input): ValidJson<NewScheduledTask>,
) -> Result<(StatusCode, Json<TaskView>), ApiError> {
    let now = state.clock.now_local();
    state.window.ensure_open(now, TaskMutation::Create)?;
    let task = input.into_task(state.clock.now_utc())?;

    let store = open_store(&state)?;
    let today = now.date();
    let existing = store.tasks_on_or_after(today).map_err(internal_error)?;
    ensure_date_allowed(task.scheduled_date, minimum_task_date(&existing, today))?;

    store.insert_task(&task).map_err(internal_error)?;
    let due = task.scheduled_at();
    info!(
        task_id = %task.id,
        title = %task.title,
        date = %task.scheduled_date,
        time = %task.scheduled_time.to_12_hour(),
        priority = %task.priority,
        category = %task.category,
        reminder_at = %(due - lead(&state)).format("%Y-%m-%d %H:%M"),
        minutes_until = (due - now).num_minutes(),
        "task created"
    );
    Ok((StatusCode::CREATED, Json(task.into())))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidJson(patch): ValidJson<TaskPatch>,
) -> ApiResult<TaskView> {
    state
        .window
        .ensure_open(state.clock.now_local(), TaskMutation::Update)?;
    let store = open_store(&state)?;
    let mut task = store
        .get_task(&id)
        .map_err(internal_error)?
        .ok_or(ApiError::NotFound("Task"))?;
    let rescheduled = patch.apply(&mut task, state.clock.now_utc())?;
    if !store
        .save_task_details(&task, rescheduled)
        .map_err(internal_error)?
    {
        return Err(ApiError::NotFound("Task"));
    }
    if rescheduled {
        info!(task_id = %task.id, at = %task.scheduled_at(), "task rescheduled; reminder re-armed");
    }
    Ok(Json(task.into()))
}

pub(crate) async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Message> {
    state
        .window
        .ensure_open(state.clock.now_local(), TaskMutation::Delete)?;
    if !open_store(&state)?
        .delete_task(&id)
        .map_err(internal_error)?
    {
        return Err(ApiError::NotFound("Task"));
    }
    info!(task_id = %id, "task deleted");
    Ok(Message::json("Task deleted successfully"))
}

pub(crate) async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TaskView> {
    let at = state.clock.now();
    match open_store(&state)?
        .complete_task(&id, at)
        .map_err(internal_error)?
    {
        CompletionOutcome::NotFound => Err(ApiError::NotFound("Task")),
        CompletionOutcome::Rejected(rejection) => {
            Err(ApiError::BadRequest(rejection.message().to_string()))
        }
        CompletionOutcome::Completed(task) => {
            let diff = minutes_late(task.scheduled_at(), at.naive_local());
            info!(
                task_id = %task.id,
                title = %task.title,
                scheduled = %task.scheduled_time,
                diff_minutes = diff,
                punctuality = punctuality_label(diff),
                points = task.punctuality_points,
                "task completed"
            );
            Ok(Json(task.into()))
        }
    }
}

pub(crate) async fn summary(State(state): State<Arc<AppState>>) -> ApiResult<TaskSummary> {
    let store = open_store(&state)?;
    sweep(&store, state.clock.now())?;
    let tasks = store
        .list_tasks(&TaskFilter::default())
        .map_err(internal_error)?;
    Ok(Json(TaskSummary::from_tasks(&tasks)))
}

pub(crate) async fn pending_reminders(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<TaskView>> {
    let tasks = open_store(&state)?
        .reminder_candidates(state.clock.now_local(), lead(&state))
        .map_err(internal_error)?;
    Ok(Json(views(tasks)))
}

pub(crate) async fn mark_email_sent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TaskView> {
    let store = open_store(&state)?;
    if !store
        .mark_email_sent(&id, state.clock.now_utc())
        .map_err(internal_error)?
    {
        return Err(ApiError::NotFound("Task"));
    }
    store
        .get_task(&id)
        .map_err(internal_error)?
        .map(|task| Json(TaskView::from(task)))
        .ok_or(ApiError::NotFound("Task"))
}

pub(crate) async fn send_reminder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<EmailRequest>,
) -> ApiResult<SendOutcome> {
    let recipient = request.recipient(&state)?;
    let outcome = send_task_reminder(
        &state.db_path,
        state.notifier.as_ref(),
        &id,
        &recipient,
        state.clock.now_utc(),
    )
    .await
    .map_err(internal_error)?;
    match outcome {
        SingleReminder::NotFound => Err(ApiError::NotFound("Task")),
        SingleReminder::NotPending(status) => Err(ApiError::BadRequest(format!(
            "Cannot send a reminder for a {status} task"
        ))),
        SingleReminder::AlreadySent => Err(ApiError::BadRequest("Email already sent".to_string())),
        SingleReminder::Sent(delivery) => Ok(Json(SendOutcome::new(
            "Reminder sent successfully!",
            delivery,
        ))),
        SingleReminder::Failed(detail) => Err(ApiError::Upstream {
            message: "Failed to send reminder".to_string(),
            detail,
        }),
    }
}

pub(crate) async fn run_reminders(
    State(state): State<Arc<AppState>>,
    OptionalJson(request): OptionalJson<EmailRequest>,
) -> ApiResult<ScanReport> {
    let recipient = request.recipient(&state)?;
    let report = run_reminder_scan(
        &state.db_path,
        state.notifier.as_ref(),
        &recipient,
        state.clock.now(),
        lead(&state),
    )
    .await
    .map_err(internal_error)?;
    if report.failed > 0 {
        warn!(failed = report.failed, "manual reminder run had failures");
    }
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WindowSpan {
    cutoff_hour: u32,
    cutoff_time: String,
    allowed_period: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WindowStatus {
    current_time: String,
    can_schedule: bool,
    can_create_tasks: bool,
    can_modify_tasks: bool,
    can_delete_tasks: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WindowRules {
    can_create_tasks_for_today: bool,
    minimum_task_date: NaiveDate,
    minimum_task_date_formatted: String,
    minimum_task_description: String,
    scheduling_description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WindowReport {
    scheduling_window: WindowSpan,
    current_status: WindowStatus,
    rules: WindowRules,
    early_completion_bonus: TomorrowProgress,
}

fn describe_minimum(minimum: NaiveDate, today: NaiveDate) -> String {
    match (minimum - today).num_days() {
        d if d <= 0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        2 => "Day After Tomorrow".to_string(),
        _ => minimum.format("%A, %B %-d").to_string(),
    }
}

pub(crate) async fn scheduling_window(
    State(state): State<Arc<AppState>>,
) -> ApiResult<WindowReport> {
    let now = state.clock.now_local();
    let today = now.date();
    let tasks = open_store(&state)?
        .tasks_on_or_after(today)
        .map_err(internal_error)?;
    let minimum = minimum_task_date(&tasks, today);
    let cutoff = state.window.cutoff_hour();
    let open = state.window.is_open(now);

    Ok(Json(WindowReport {
        scheduling_window: WindowSpan {
            cutoff_hour: cutoff,
            cutoff_time: format!("{cutoff:02}:00"),
            allowed_period: format!("00:00 - {cutoff:02}:00"),
        },
        current_status: WindowStatus {
            current_time: now.format("%H:%M:%S").to_string(),
            can_schedule: open,
            can_create_tasks: open,
            can_modify_tasks: open,
            can_delete_tasks: open,
        },
        rules: WindowRules {
            can_create_tasks_for_today: minimum <= today,
            minimum_task_date: minimum,
            minimum_task_date_formatted: minimum.format("%-m/%-d/%Y").to_string(),
            minimum_task_description: describe_minimum(minimum, today),
            scheduling_description: format!(
                "You can schedule tasks anytime before {cutoff}:00"
            ),
        },
        early_completion_bonus: tomorrow_progress(&tasks, today),
    }))
}
