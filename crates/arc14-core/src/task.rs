use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use serde::Serialize;

use crate::model::{ScheduledTask, TaskStatus};

/// A pending task this long past its scheduled time becomes `missed`.
pub const MISSED_AFTER: Duration = Duration::hours(2);

/// Minutes between `scheduled` and `completed`, floored.
pub fn minutes_late(scheduled: NaiveDateTime, completed: NaiveDateTime) -> i64 {
    let seconds = (completed - scheduled).num_seconds();
    seconds.div_euclid(60)
}

/// Punctuality band for a completion `diff` minutes after the scheduled time.
pub fn punctuality_points(diff_minutes: i64) -> u8 {
    match diff_minutes {
        d if d <= -5 => 10,
        d if d <= 5 => 8,
        d if d <= 15 => 5,
        d if d <= 30 => 3,
        _ => 1,
    }
}

/// Human label for the same bands, used in logs.
pub fn punctuality_label(diff_minutes: i64) -> &'static str {
    match diff_minutes {
        d if d <= -5 => "early",
        d if d <= 5 => "on time",
        d if d <= 15 => "slightly late",
        d if d <= 30 => "late",
        _ => "very late",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionRejection {
    AlreadyCompleted,
    Missed,
}

impl CompletionRejection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::AlreadyCompleted => "Task already completed",
            Self::Missed => "Cannot complete a missed task",
        }
    }
}

impl ScheduledTask {
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.status == TaskStatus::Pending && now - self.scheduled_at() > MISSED_AFTER
    }

    /// Applies the lazy missed rule. Returns whether the task changed.
    pub fn mark_missed_if_overdue(&mut self, now: NaiveDateTime) -> bool {
        if !self.is_overdue(now) {
            return false;
        }
        self.status = TaskStatus::Missed;
        self.punctuality_points = 0;
        true
    }

    /// Completes a pending task at `at`, deriving its punctuality points.
    pub fn complete(&mut self, at: DateTime<Local>) -> Result<u8, CompletionRejection> {
        match self.status {
            TaskStatus::Completed => return Err(CompletionRejection::AlreadyCompleted),
            TaskStatus::Missed => return Err(CompletionRejection::Missed),
            TaskStatus::Pending => {}
        }
        let points = punctuality_points(minutes_late(self.scheduled_at(), at.naive_local()));
        self.status = TaskStatus::Completed;
        self.completed_at = Some(at.with_timezone(&Utc));
        self.punctuality_points = points;
        Ok(points)
    }

    /// Due within `[now, now + lead]`, still pending and not yet notified.
    pub fn needs_reminder(&self, now: NaiveDateTime, lead: Duration) -> bool {
        if self.status != TaskStatus::Pending || self.email_sent {
            return false;
        }
        let at = self.scheduled_at();
        at >= now && at <= now + lead
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub missed_tasks: usize,
    pub pending_tasks: usize,
    pub average_punctuality_score: f64,
    pub total_points_earned: u32,
    pub completion_rate: u32,
}

impl TaskSummary {
    pub fn from_tasks(tasks: &[ScheduledTask]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let completed: Vec<&ScheduledTask> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .collect();
        let total_points: u32 = completed
            .iter()
            .map(|t| u32::from(t.punctuality_points))
            .sum();
        let scored: Vec<u32> = completed
            .iter()
            .map(|t| u32::from(t.punctuality_points))
            .filter(|p| *p > 0)
            .collect();
        let average = if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<u32>() as f64 / scored.len() as f64
        };
        let completion_rate = if tasks.is_empty() {
            0
        } else {
            (completed.len() as f64 / tasks.len() as f64 * 100.0).round() as u32
        };
        Self {
            total_tasks: tasks.len(),
            completed_tasks: completed.len(),
            missed_tasks: count(TaskStatus::Missed),
            pending_tasks: count(TaskStatus::Pending),
            average_punctuality_score: (average * 10.0).round() / 10.0,
            total_points_earned: total_points,
            completion_rate,
        }
    }
}
