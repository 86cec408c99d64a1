use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::model::Habit;
use crate::timefmt::local_day;

const RECENT_WINDOW_DAYS: i64 = 30;

/// Consecutive days ending at `today` that have at least one completion.
pub fn current_streak(days: impl IntoIterator<Item = NaiveDate>, today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = days.into_iter().collect();
    let mut streak = 0;
    let mut cursor = today;
    while days.contains(&cursor) {
        streak += 1;
        let Some(prev) = cursor.pred_opt() else {
            break;
        };
        cursor = prev;
    }
    streak
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Completed,
    Uncompleted,
}

impl Habit {
    pub fn completion_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.completed_dates.iter().map(local_day)
    }

    pub fn refresh_streak(&mut self, today: NaiveDate) -> u32 {
        self.streak = current_streak(self.completion_days(), today);
        self.streak
    }

    /// Flips completion for the local day containing `at`: removes every
    /// completion on that day if present, otherwise records `at`.
    pub fn toggle_completion(&mut self, at: DateTime<Utc>, today: NaiveDate) -> ToggleOutcome {
        let day = local_day(&at);
        let before = self.completed_dates.len();
        self.completed_dates.retain(|d| local_day(d) != day);
        let outcome = if self.completed_dates.len() < before {
            ToggleOutcome::Uncompleted
        } else {
            self.completed_dates.push(at);
            self.completed_dates.sort();
            ToggleOutcome::Completed
        };
        self.refresh_streak(today);
        outcome
    }

    pub fn stats(&self, now: DateTime<Utc>, today: NaiveDate) -> HabitStats {
        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let recent = self.completed_dates.iter().filter(|d| **d >= cutoff).count();
        let rate = recent as f64 / RECENT_WINDOW_DAYS as f64 * 100.0;
        HabitStats {
            total_completions: self.completed_dates.len(),
            current_streak: current_streak(self.completion_days(), today),
            recent_completions: recent,
            completion_rate: (rate * 10.0).round() / 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub total_completions: usize,
    pub current_streak: u32,
    pub recent_completions: usize,
    /// Percentage of the last 30 days with a completion, one decimal place.
    pub completion_rate: f64,
}
