use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A wall-clock time stored as 24-hour `HH:MM`.
///
/// Parsing accepts either the stored form or a 12-hour `H:MM AM/PM` value,
/// which is what the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        parse_24_hour(trimmed)
            .or_else(|| parse_12_hour(trimmed))
            .ok_or_else(|| ValidationError::InvalidTime(raw.to_string()))
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }

    /// Storage form, e.g. `09:30`.
    pub fn to_24_hour(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }

    /// Display form, e.g. `9:30 AM`.
    pub fn to_12_hour(&self) -> String {
        let hour = self.hour();
        let period = if hour >= 12 { "PM" } else { "AM" };
        let display = match hour {
            0 => 12,
            h if h > 12 => h - 12,
            h => h,
        };
        format!("{display}:{:02} {period}", self.minute())
    }
}

fn parse_24_hour(raw: &str) -> Option<TimeOfDay> {
    let (h, m) = raw.split_once(':')?;
    if h.len() != 2 || m.len() != 2 || !all_digits(h) || !all_digits(m) {
        return None;
    }
    TimeOfDay::new(h.parse().ok()?, m.parse().ok()?)
}

fn parse_12_hour(raw: &str) -> Option<TimeOfDay> {
    if raw.len() < 2 || !raw.is_char_boundary(raw.len() - 2) {
        return None;
    }
    let (clock, period) = raw.split_at(raw.len() - 2);
    let pm = match period.to_ascii_uppercase().as_str() {
        "AM" => false,
        "PM" => true,
        _ => return None,
    };
    let (h, m) = clock.trim_end().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 || !all_digits(h) || !all_digits(m) {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    TimeOfDay::new(hour, minute)
}

fn all_digits(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_24_hour())
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_24_hour())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parses a calendar date from `YYYY-MM-DD` or the date part of an RFC 3339
/// timestamp (in the timestamp's own offset).
pub fn parse_calendar_date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.date_naive())
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

/// Parses an instant from RFC 3339, or a bare date taken as local midnight.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    let invalid = || ValidationError::InvalidDate {
        field,
        value: raw.to_string(),
    };
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

/// Local calendar day of a stored UTC instant.
pub fn local_day(instant: &DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

#[cfg(test)]
mod tests {
    use super::{TimeOfDay, parse_calendar_date};

    #[test]
    fn normalizes_twelve_hour_input() {
        assert_eq!(TimeOfDay::parse("9:30 AM").unwrap().to_24_hour(), "09:30");
        assert_eq!(TimeOfDay::parse("12:05 am").unwrap().to_24_hour(), "00:05");
        assert_eq!(TimeOfDay::parse("12:00 PM").unwrap().to_24_hour(), "12:00");
        assert_eq!(TimeOfDay::parse("02:45PM").unwrap().to_24_hour(), "14:45");
    }

    #[test]
    fn accepts_stored_twenty_four_hour_form() {
        assert_eq!(TimeOfDay::parse("23:59").unwrap().to_24_hour(), "23:59");
        assert_eq!(TimeOfDay::parse("00:00").unwrap().to_12_hour(), "12:00 AM");
    }

    #[test]
    fn renders_back_to_twelve_hour() {
        assert_eq!(TimeOfDay::parse("14:45").unwrap().to_12_hour(), "2:45 PM");
        assert_eq!(TimeOfDay::parse("9:05 AM").unwrap().to_12_hour(), "9:05 AM");
        assert_eq!(TimeOfDay::parse("12:30").unwrap().to_12_hour(), "12:30 PM");
    }

    #[test]
    fn rejects_malformed_times() {
        for raw in ["", "9:30", "24:00", "13:00 PM", "0:15 AM", "9:3 AM", "noon", "09:60"] {
            assert!(TimeOfDay::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn parses_dates_from_both_forms() {
        let plain = parse_calendar_date("scheduledDate", "2026-10-17").unwrap();
        let stamped = parse_calendar_date("scheduledDate", "2026-10-17T00:00:00.000Z").unwrap();
        assert_eq!(plain, stamped);
        assert!(parse_calendar_date("scheduledDate", "17/10/2026").is_err());
    }
}
