//! Request payloads and their validation into domain records.
//!
//! Every field is optional at the wire level so that a missing required field
//! surfaces as a [`ValidationError`] naming it, rather than a generic decode
//! failure.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::model::{
    ArcCycle, ArcStatus, DailyLog, Habit, HabitCategory, HabitFrequency, Journal,
    JournalCategory, Mood, Priority, ScheduledTask, TaskCategory, TaskStatus, new_id,
};
use crate::timefmt::{TimeOfDay, parse_calendar_date, parse_timestamp};

const DEFAULT_ENERGY: u8 = 5;

fn required(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn text(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn parse_or_default<T: Default>(
    value: Option<&str>,
    parse: impl Fn(&str) -> Result<T, ValidationError>,
) -> Result<T, ValidationError> {
    value.map(parse).transpose().map(Option::unwrap_or_default)
}

/// Trims every tag and drops the empty ones.
pub fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn energy(value: i64) -> Result<u8, ValidationError> {
    if !(1..=10).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: "energy",
            min: 1,
            max: 10,
            value,
        });
    }
    Ok(value as u8)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<String>,
    pub category: Option<String>,
}

impl NewHabit {
    pub fn into_habit(self, now: DateTime<Utc>) -> Result<Habit, ValidationError> {
        Ok(Habit {
            id: new_id(),
            name: required("name", self.name.as_deref())?,
            description: text(self.description.as_deref()),
            frequency: parse_or_default(self.frequency.as_deref(), HabitFrequency::parse)?,
            category: parse_or_default(self.category.as_deref(), HabitCategory::parse)?,
            completed_dates: Vec::new(),
            streak: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial habit update. Completion history is only changed through toggling.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<String>,
    pub category: Option<String>,
}

impl HabitPatch {
    pub fn apply(&self, habit: &mut Habit, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.name.is_some() {
            habit.name = required("name", self.name.as_deref())?;
        }
        if let Some(description) = &self.description {
            habit.description = description.trim().to_string();
        }
        if let Some(frequency) = &self.frequency {
            habit.frequency = HabitFrequency::parse(frequency)?;
        }
        if let Some(category) = &self.category {
            habit.category = HabitCategory::parse(category)?;
        }
        habit.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleRequest {
    pub date: Option<String>,
}

impl ToggleRequest {
    /// Instant to toggle, defaulting to `now`.
    pub fn instant(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
        match self.date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_timestamp("date", raw),
            _ => Ok(now),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDailyLog {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub mood: Option<String>,
    pub energy: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewDailyLog {
    pub fn into_log(self, now: DateTime<Utc>) -> Result<DailyLog, ValidationError> {
        let date = match self.date.as_deref() {
            Some(raw) => parse_timestamp("date", raw)?,
            None => now,
        };
        Ok(DailyLog {
            id: new_id(),
            title: required("title", self.title.as_deref())?,
            content: required("content", self.content.as_deref())?,
            date,
            mood: parse_or_default(self.mood.as_deref(), Mood::parse)?,
            energy: self.energy.map(energy).transpose()?.unwrap_or(DEFAULT_ENERGY),
            tags: clean_tags(&self.tags),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub mood: Option<String>,
    pub energy: Option<i64>,
    pub tags: Option<Vec<String>>,
}

impl DailyLogPatch {
    pub fn apply(&self, log: &mut DailyLog, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.is_some() {
            log.title = required("title", self.title.as_deref())?;
        }
        if self.content.is_some() {
            log.content = required("content", self.content.as_deref())?;
        }
        if let Some(raw) = &self.date {
            log.date = parse_timestamp("date", raw)?;
        }
        if let Some(mood) = &self.mood {
            log.mood = Mood::parse(mood)?;
        }
        if let Some(value) = self.energy {
            log.energy = energy(value)?;
        }
        if let Some(tags) = &self.tags {
            log.tags = clean_tags(tags);
        }
        log.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJournal {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewJournal {
    pub fn into_journal(self, now: DateTime<Utc>) -> Result<Journal, ValidationError> {
        Ok(Journal {
            id: new_id(),
            title: required("title", self.title.as_deref())?,
            content: required("content", self.content.as_deref())?,
            category: parse_or_default(self.category.as_deref(), JournalCategory::parse)?,
            tags: clean_tags(&self.tags),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl JournalPatch {
    pub fn apply(&self, journal: &mut Journal, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.is_some() {
            journal.title = required("title", self.title.as_deref())?;
        }
        if self.content.is_some() {
            journal.content = required("content", self.content.as_deref())?;
        }
        if let Some(category) = &self.category {
            journal.category = JournalCategory::parse(category)?;
        }
        if let Some(tags) = &self.tags {
            journal.tags = clean_tags(tags);
        }
        journal.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArcCycle {
    pub title: Option<String>,
    pub action: Option<String>,
    pub reflection: Option<String>,
    pub correction: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl NewArcCycle {
    pub fn into_cycle(self, now: DateTime<Utc>) -> Result<ArcCycle, ValidationError> {
        Ok(ArcCycle {
            id: new_id(),
            title: required("title", self.title.as_deref())?,
            action: required("action", self.action.as_deref())?,
            reflection: text(self.reflection.as_deref()),
            correction: text(self.correction.as_deref()),
            status: parse_or_default(self.status.as_deref(), ArcStatus::parse)?,
            priority: parse_or_default(self.priority.as_deref(), Priority::parse)?,
            insights: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcCyclePatch {
    pub title: Option<String>,
    pub action: Option<String>,
    pub reflection: Option<String>,
    pub correction: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl ArcCyclePatch {
    /// Applies the patch, then promotes the cycle to completed when all three
    /// parts are present.
    pub fn apply(&self, cycle: &mut ArcCycle, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.title.is_some() {
            cycle.title = required("title", self.title.as_deref())?;
        }
        if self.action.is_some() {
            cycle.action = required("action", self.action.as_deref())?;
        }
        if let Some(reflection) = &self.reflection {
            cycle.reflection = reflection.trim().to_string();
        }
        if let Some(correction) = &self.correction {
            cycle.correction = correction.trim().to_string();
        }
        if let Some(status) = &self.status {
            cycle.status = ArcStatus::parse(status)?;
        }
        if let Some(priority) = &self.priority {
            cycle.priority = Priority::parse(priority)?;
        }
        cycle.promote_if_complete();
        cycle.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewInsight {
    pub text: Option<String>,
}

impl NewInsight {
    pub fn validated_text(&self) -> Result<String, ValidationError> {
        required("text", self.text.as_deref())
    }
}

/// Free-text Mirror-14 evaluation request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRequest {
    pub action: Option<String>,
    pub reflection: Option<String>,
    pub correction: Option<String>,
}

impl EvaluationRequest {
    pub fn parts(&self) -> Result<(String, String, String), ValidationError> {
        Ok((
            required("action", self.action.as_deref())?,
            text(self.reflection.as_deref()),
            text(self.correction.as_deref()),
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduledTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

impl NewScheduledTask {
    pub fn into_task(self, now: DateTime<Utc>) -> Result<ScheduledTask, ValidationError> {
        let title = required("title", self.title.as_deref())?;
        let date = required("scheduledDate", self.scheduled_date.as_deref())?;
        let time = required("scheduledTime", self.scheduled_time.as_deref())?;
        Ok(ScheduledTask {
            id: new_id(),
            title,
            description: text(self.description.as_deref()),
            scheduled_date: parse_calendar_date("scheduledDate", &date)?,
            scheduled_time: TimeOfDay::parse(&time)?,
            status: TaskStatus::Pending,
            completed_at: None,
            punctuality_points: 0,
            email_sent: false,
            email_sent_at: None,
            priority: parse_or_default(self.priority.as_deref(), Priority::parse)?,
            category: parse_or_default(self.category.as_deref(), TaskCategory::parse)?,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Editable task fields. Status, completion and points are not among them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

impl TaskPatch {
    /// Applies the patch. Moving the task in time re-arms its reminder;
    /// returns whether that happened.
    pub fn apply(
        &self,
        task: &mut ScheduledTask,
        now: DateTime<Utc>,
    ) -> Result<bool, ValidationError> {
        let before = task.scheduled_at();
        if self.title.is_some() {
            task.title = required("title", self.title.as_deref())?;
        }
        if let Some(description) = &self.description {
            task.description = description.trim().to_string();
        }
        if let Some(raw) = &self.scheduled_date {
            task.scheduled_date = parse_calendar_date("scheduledDate", raw)?;
        }
        if let Some(raw) = &self.scheduled_time {
            task.scheduled_time = TimeOfDay::parse(raw)?;
        }
        if let Some(priority) = &self.priority {
            task.priority = Priority::parse(priority)?;
        }
        if let Some(category) = &self.category {
            task.category = TaskCategory::parse(category)?;
        }
        let rescheduled = task.scheduled_at() != before;
        if rescheduled {
            task.email_sent = false;
            task.email_sent_at = None;
        }
        task.updated_at = now;
        Ok(rescheduled)
    }
}
