use anyhow::Result;
use arc14_core::{DailyLog, Mood};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;

use crate::{TrackerStore, json_col, text_col, to_json, ts, ts_col};

const COLUMNS: &str = "id, title, content, date, mood, energy, tags, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub mood: Option<Mood>,
    /// Matches logs carrying any of these tags.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodStat {
    pub mood: Mood,
    pub count: usize,
    pub avg_energy: f64,
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<DailyLog> {
    Ok(DailyLog {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        date: ts_col(row, 3)?,
        mood: text_col(row, 4, Mood::parse)?,
        energy: row.get(5)?,
        tags: json_col(row, 6)?,
        created_at: ts_col(row, 7)?,
        updated_at: ts_col(row, 8)?,
    })
}

impl TrackerStore {
    pub fn insert_log(&self, log: &DailyLog) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO daily_logs ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                log.id,
                log.title,
                log.content,
                ts(&log.date),
                log.mood.as_str(),
                log.energy,
                to_json(&log.tags)?,
                ts(&log.created_at),
                ts(&log.updated_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_log(&self, id: &str) -> Result<Option<DailyLog>> {
        let log = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM daily_logs WHERE id = ?1"),
                params![id],
                log_from_row,
            )
            .optional()?;
        Ok(log)
    }

    pub fn list_logs(&self, filter: &LogFilter) -> Result<Vec<DailyLog>> {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(start) = &filter.start {
            args.push(ts(start));
            clauses.push(format!("date >= ?{}", args.len()));
        }
        if let Some(end) = &filter.end {
            args.push(ts(end));
            clauses.push(format!("date <= ?{}", args.len()));
        }
        if let Some(mood) = filter.mood {
            args.push(mood.as_str().to_string());
            clauses.push(format!("mood = ?{}", args.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM daily_logs {where_sql} ORDER BY date DESC, created_at DESC"
        ))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), log_from_row)?;
        let mut logs = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        if !filter.tags.is_empty() {
            logs.retain(|log| log.tags.iter().any(|t| filter.tags.contains(t)));
        }
        Ok(logs)
    }

    pub fn save_log(&self, log: &DailyLog) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE daily_logs
             SET title = ?1, content = ?2, date = ?3, mood = ?4, energy = ?5, tags = ?6,
                 updated_at = ?7
             WHERE id = ?8",
            params![
                log.title,
                log.content,
                ts(&log.date),
                log.mood.as_str(),
                log.energy,
                to_json(&log.tags)?,
                ts(&log.updated_at),
                log.id
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_log(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM daily_logs WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn mood_stats(&self) -> Result<Vec<MoodStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT mood, COUNT(*), AVG(energy)
             FROM daily_logs
             GROUP BY mood
             ORDER BY COUNT(*) DESC, mood ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            let avg: f64 = row.get(2)?;
            Ok(MoodStat {
                mood: text_col(row, 0, Mood::parse)?,
                count: count as usize,
                avg_energy: (avg * 10.0).round() / 10.0,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
