use anyhow::Result;
use arc14_core::task::CompletionRejection;
use arc14_core::{Priority, ScheduledTask, TaskCategory, TaskStatus, TimeOfDay};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use crate::{TrackerStore, date_col, day, opt_ts_col, text_col, ts, ts_col};

const COLUMNS: &str = "id, title, description, scheduled_date, scheduled_time, status, \
     completed_at, punctuality_points, email_sent, email_sent_at, priority, category, \
     created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub date: Option<NaiveDate>,
    /// Pending tasks due at or after this local time. Takes precedence over
    /// `status` and `date`.
    pub upcoming_from: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    NotFound,
    Rejected(CompletionRejection),
    Completed(ScheduledTask),
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledTask> {
    Ok(ScheduledTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        scheduled_date: date_col(row, 3)?,
        scheduled_time: text_col(row, 4, TimeOfDay::parse)?,
        status: text_col(row, 5, TaskStatus::parse)?,
        completed_at: opt_ts_col(row, 6)?,
        punctuality_points: row.get(7)?,
        email_sent: row.get(8)?,
        email_sent_at: opt_ts_col(row, 9)?,
        priority: text_col(row, 10, Priority::parse)?,
        category: text_col(row, 11, TaskCategory::parse)?,
        created_at: ts_col(row, 12)?,
        updated_at: ts_col(row, 13)?,
    })
}

impl TrackerStore {
    pub fn insert_task(&self, task: &ScheduledTask) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO scheduled_tasks ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                task.id,
                task.title,
                task.description,
                day(&task.scheduled_date),
                task.scheduled_time.to_24_hour(),
                task.status.as_str(),
                task.completed_at.as_ref().map(ts),
                task.punctuality_points,
                task.email_sent,
                task.email_sent_at.as_ref().map(ts),
                task.priority.as_str(),
                task.category.as_str(),
                ts(&task.created_at),
                ts(&task.updated_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<ScheduledTask>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM scheduled_tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Ordered by scheduled date, then time. An upcoming query always lists
    /// pending tasks and ignores the status and date filters.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<ScheduledTask>> {
        let mut clauses = Vec::new();
        let mut args: Vec<String> = Vec::new();
        if let Some(from) = &filter.upcoming_from {
            args.push(day(&from.date()));
            args.push(from.format("%H:%M").to_string());
            clauses.push(
                "status = 'pending' AND (scheduled_date > ?1 \
                 OR (scheduled_date = ?1 AND scheduled_time >= ?2))"
                    .to_string(),
            );
        } else {
            if let Some(status) = filter.status {
                args.push(status.as_str().to_string());
                clauses.push(format!("status = ?{}", args.len()));
            }
            if let Some(date) = &filter.date {
                args.push(day(date));
                clauses.push(format!("scheduled_date = ?{}", args.len()));
            }
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM scheduled_tasks {where_sql}
             ORDER BY scheduled_date ASC, scheduled_time ASC"
        ))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn tasks_on_or_after(&self, date: NaiveDate) -> Result<Vec<ScheduledTask>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM scheduled_tasks
             WHERE scheduled_date >= ?1
             ORDER BY scheduled_date ASC, scheduled_time ASC"
        ))?;
        let rows = stmt.query_map(params![day(&date)], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Persists the client-editable fields. When `rearm_reminder` is set the
    /// email flag is cleared so the task is notified again at its new time.
    pub fn save_task_details(&self, task: &ScheduledTask, rearm_reminder: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE scheduled_tasks
             SET title = ?1, description = ?2, scheduled_date = ?3, scheduled_time = ?4,
                 priority = ?5, category = ?6, updated_at = ?7,
                 email_sent = CASE WHEN ?8 THEN 0 ELSE email_sent END,
                 email_sent_at = CASE WHEN ?8 THEN NULL ELSE email_sent_at END
             WHERE id = ?9",
            params![
                task.title,
                task.description,
                day(&task.scheduled_date),
                task.scheduled_time.to_24_hour(),
                task.priority.as_str(),
                task.category.as_str(),
                ts(&task.updated_at),
                rearm_reminder,
                task.id
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM scheduled_tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Marks every overdue pending task as missed. Returns the ids that this
    /// call transitioned.
    pub fn sweep_missed(&self, now: DateTime<Local>) -> Result<Vec<String>> {
        let wall = now.naive_local();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM scheduled_tasks
             WHERE status = 'pending' AND scheduled_date <= ?1"
        ))?;
        let rows = stmt.query_map(params![day(&wall.date())], task_from_row)?;
        let pending = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        let mut missed = Vec::new();
        for mut task in pending {
            if task.mark_missed_if_overdue(wall) && self.transition_to_missed(&task.id, now)? {
                missed.push(task.id);
            }
        }
        Ok(missed)
    }

    fn transition_to_missed(&self, id: &str, at: DateTime<Local>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE scheduled_tasks
             SET status = 'missed', punctuality_points = 0, updated_at = ?1
             WHERE id = ?2 AND status = 'pending'",
            params![ts(&at.with_timezone(&Utc)), id],
        )?;
        Ok(changed > 0)
    }

    /// Completes a pending task at `at`. The missed rule is applied first, and
    /// the write only lands if the task is still pending.
    pub fn complete_task(&self, id: &str, at: DateTime<Local>) -> Result<CompletionOutcome> {
        let Some(mut task) = self.get_task(id)? else {
            return Ok(CompletionOutcome::NotFound);
        };
        if task.mark_missed_if_overdue(at.naive_local()) {
            self.transition_to_missed(&task.id, at)?;
            return Ok(CompletionOutcome::Rejected(CompletionRejection::Missed));
        }
        if let Err(rejection) = task.complete(at) {
            return Ok(CompletionOutcome::Rejected(rejection));
        }
        task.updated_at = at.with_timezone(&Utc);

        let changed = self.conn.execute(
            "UPDATE scheduled_tasks
             SET status = 'completed', completed_at = ?1, punctuality_points = ?2, updated_at = ?3
             WHERE id = ?4 AND status = 'pending'",
            params![
                task.completed_at.as_ref().map(ts),
                task.punctuality_points,
                ts(&task.updated_at),
                task.id
            ],
        )?;
        if changed > 0 {
            return Ok(CompletionOutcome::Completed(task));
        }

        // Lost a race with another transition; report what won.
        Ok(match self.get_task(id)? {
            None => CompletionOutcome::NotFound,
            Some(current) if current.status == TaskStatus::Missed => {
                CompletionOutcome::Rejected(CompletionRejection::Missed)
            }
            Some(_) => CompletionOutcome::Rejected(CompletionRejection::AlreadyCompleted),
        })
    }

    /// Pending, un-notified tasks due within `[now, now + lead]`.
    pub fn reminder_candidates(
        &self,
        now: NaiveDateTime,
        lead: Duration,
    ) -> Result<Vec<ScheduledTask>> {
        let until = now + lead;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM scheduled_tasks
             WHERE status = 'pending' AND email_sent = 0
               AND scheduled_date BETWEEN ?1 AND ?2
             ORDER BY scheduled_date ASC, scheduled_time ASC"
        ))?;
        let rows = stmt.query_map(
            params![day(&now.date()), day(&until.date())],
            task_from_row,
        )?;
        let tasks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks
            .into_iter()
            .filter(|t| t.needs_reminder(now, lead))
            .collect())
    }

    /// Compare-and-set on the email flag. Only one caller wins a given task.
    pub fn claim_reminder(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE scheduled_tasks
             SET email_sent = 1, email_sent_at = ?1
             WHERE id = ?2 AND email_sent = 0 AND status = 'pending'",
            params![ts(&at), id],
        )?;
        Ok(changed > 0)
    }

    pub fn release_reminder(&self, id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE scheduled_tasks SET email_sent = 0, email_sent_at = NULL WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    pub fn mark_email_sent(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE scheduled_tasks SET email_sent = 1, email_sent_at = ?1 WHERE id = ?2",
            params![ts(&at), id],
        )?;
        Ok(changed > 0)
    }
}
