use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::{SchedulingError, TaskMutation};
use crate::model::{ScheduledTask, TaskStatus};

/// Daily window (local midnight up to `cutoff_hour`) in which tasks may be
/// created, modified or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingWindow {
    cutoff_hour: u32,
}

impl SchedulingWindow {
    pub fn new(cutoff_hour: u32) -> Self {
        Self { cutoff_hour }
    }

    pub fn cutoff_hour(&self) -> u32 {
        self.cutoff_hour
    }

    pub fn is_open(&self, now: NaiveDateTime) -> bool {
        now.hour() < self.cutoff_hour
    }

    pub fn ensure_open(
        &self,
        now: NaiveDateTime,
        mutation: TaskMutation,
    ) -> Result<(), SchedulingError> {
        if self.is_open(now) {
            return Ok(());
        }
        Err(SchedulingError::WindowClosed {
            mutation,
            cutoff_hour: self.cutoff_hour,
            current_time: now.format("%H:%M:%S").to_string(),
        })
    }
}

/// Earliest date a new task may target.
///
/// Walks the dates from `today` onward that already have tasks and returns
/// the first one holding any task that is not completed. When every such
/// date is fully completed the answer is the day after `today`.
pub fn minimum_task_date<'a>(
    tasks: impl IntoIterator<Item = &'a ScheduledTask>,
    today: NaiveDate,
) -> NaiveDate {
    let mut by_date: BTreeMap<NaiveDate, bool> = BTreeMap::new();
    for task in tasks {
        if task.scheduled_date < today {
            continue;
        }
        let all_done = by_date.entry(task.scheduled_date).or_insert(true);
        *all_done &= task.status == TaskStatus::Completed;
    }
    by_date
        .into_iter()
        .find(|(_, all_done)| !all_done)
        .map(|(date, _)| date)
        .unwrap_or_else(|| today.succ_opt().unwrap_or(today))
}

pub fn ensure_date_allowed(
    requested: NaiveDate,
    minimum: NaiveDate,
) -> Result<(), SchedulingError> {
    if requested < minimum {
        return Err(SchedulingError::DateLocked {
            minimum_date: minimum,
            attempted_date: requested,
        });
    }
    Ok(())
}

/// Progress on tomorrow's tasks, shown as the "early planning" unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TomorrowProgress {
    pub active: bool,
    pub tomorrow_tasks_count: usize,
    pub tomorrow_completed_count: usize,
    pub message: String,
}

pub fn tomorrow_progress<'a>(
    tasks: impl IntoIterator<Item = &'a ScheduledTask>,
    today: NaiveDate,
) -> TomorrowProgress {
    let tomorrow = today.succ_opt().unwrap_or(today);
    let (total, completed) = tasks
        .into_iter()
        .filter(|t| t.scheduled_date == tomorrow)
        .fold((0, 0), |(total, done), t| {
            let done = done + usize::from(t.status == TaskStatus::Completed);
            (total + 1, done)
        });
    let active = total > 0 && total == completed;
    let message = if active {
        format!(
            "All {total} tasks for tomorrow are completed. You can now plan further ahead!"
        )
    } else if total > 0 {
        format!("Complete all {total} tasks for tomorrow to unlock early planning.")
    } else {
        "Create and complete tasks for tomorrow to unlock early planning!".to_string()
    };
    TomorrowProgress {
        active,
        tomorrow_tasks_count: total,
        tomorrow_completed_count: completed,
        message,
    }
}
