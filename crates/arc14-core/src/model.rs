use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::timefmt::TimeOfDay;

/// Declares a closed string enum with its wire names, a default variant and
/// `as_str` / `FromStr` that report the allowed set on failure.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $($variant:ident => $text:literal),+ $(,)?
        }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant,)+]
            }

            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                match value.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ValidationError::InvalidEnum {
                        field: $field,
                        value: value.to_string(),
                        allowed: [$($text),+].join(", "),
                    }),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

closed_enum! {
    HabitFrequency ("frequency") {
        Daily => "daily",
        Weekly => "weekly",
        Custom => "custom",
    }
    default Daily
}

closed_enum! {
    HabitCategory ("category") {
        Health => "health",
        Productivity => "productivity",
        Mindfulness => "mindfulness",
        Learning => "learning",
        Social => "social",
        Other => "other",
    }
    default Other
}

closed_enum! {
    Mood ("mood") {
        Great => "great",
        Good => "good",
        Neutral => "neutral",
        Bad => "bad",
        Terrible => "terrible",
    }
    default Neutral
}

closed_enum! {
    JournalCategory ("category") {
        Personal => "personal",
        Work => "work",
        Goals => "goals",
        Gratitude => "gratitude",
        Reflection => "reflection",
        Ideas => "ideas",
    }
    default Personal
}

closed_enum! {
    ArcStatus ("status") {
        Active => "active",
        Reflecting => "reflecting",
        Correcting => "correcting",
        Completed => "completed",
    }
    default Active
}

closed_enum! {
    Priority ("priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
    default Medium
}

closed_enum! {
    /// Lifecycle of a scheduled task. `Completed` and `Missed` are terminal.
    TaskStatus ("status") {
        Pending => "pending",
        Completed => "completed",
        Missed => "missed",
    }
    default Pending
}

closed_enum! {
    TaskCategory ("category") {
        Work => "work",
        Personal => "personal",
        Health => "health",
        Learning => "learning",
        Social => "social",
    }
    default Personal
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub description: String,
    pub frequency: HabitFrequency,
    pub category: HabitCategory,
    pub completed_dates: Vec<DateTime<Utc>>,
    pub streak: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub mood: Mood,
    pub energy: u8,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Journal {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: JournalCategory,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcCycle {
    pub id: String,
    pub title: String,
    pub action: String,
    pub reflection: String,
    pub correction: String,
    pub status: ArcStatus,
    pub priority: Priority,
    pub insights: Vec<Insight>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArcCycle {
    pub fn is_complete(&self) -> bool {
        !self.action.trim().is_empty()
            && !self.reflection.trim().is_empty()
            && !self.correction.trim().is_empty()
    }

    /// Promotes the cycle to `completed` once all three parts are written.
    /// Returns whether the status changed.
    pub fn promote_if_complete(&mut self) -> bool {
        if self.is_complete() && self.status != ArcStatus::Completed {
            self.status = ArcStatus::Completed;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: TimeOfDay,
    pub status: TaskStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub punctuality_points: u8,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub category: TaskCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledTask {
    /// Local wall-clock instant the task is due.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.scheduled_date.and_time(self.scheduled_time.as_naive())
    }
}
