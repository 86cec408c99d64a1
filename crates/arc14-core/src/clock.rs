use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Source of "now" for rules that depend on the server's local wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn now_local(&self) -> NaiveDateTime {
        self.now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A settable clock for tests and offline tooling.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Builds a clock from a local wall-clock time. Ambiguous DST instants
    /// resolve to the earlier offset.
    pub fn at_local(naive: NaiveDateTime) -> Self {
        let now = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&naive));
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<Local>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::{Clock, FixedClock};

    #[test]
    fn fixed_clock_reports_local_wall_time() {
        let naive = NaiveDate::from_ymd_opt(2026, 3, 10)
            .and_then(|d| d.and_hms_opt(14, 30, 0))
            .expect("valid datetime");
        let clock = FixedClock::at_local(naive);
        assert_eq!(clock.now_local(), naive);

        clock.advance(Duration::minutes(45));
        assert_eq!(clock.now_local(), naive + Duration::minutes(45));
    }
}
