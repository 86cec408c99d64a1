//! Domain model and rules for the ARC-14 self-tracking service.
//!
//! Everything here is synchronous and free of I/O: callers pass the current
//! time in through a [`Clock`] so the scheduling rules stay testable.

pub mod clock;
pub mod error;
pub mod habit;
pub mod input;
pub mod mirror14;
pub mod model;
pub mod task;
pub mod timefmt;
pub mod window;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{SchedulingError, TaskMutation, ValidationError};
pub use model::{
    ArcCycle, ArcStatus, DailyLog, Habit, HabitCategory, HabitFrequency, Insight, Journal,
    JournalCategory, Mood, Priority, ScheduledTask, TaskCategory, TaskStatus,
};
pub use timefmt::TimeOfDay;
