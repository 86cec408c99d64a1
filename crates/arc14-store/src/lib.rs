//! SQLite persistence for ARC-14 records.
//!
//! One table per collection. Scalar fields get typed columns; list-valued
//! fields (habit completions, tags, insights) are stored as JSON text.
//! Timestamps are RFC 3339 UTC with millisecond precision so that text
//! ordering matches chronological ordering.

mod arcs;
mod habits;
mod journals;
mod logs;
mod tasks;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use arcs::{ArcFilter, StatusCount};
pub use journals::{CategoryCount, JournalFilter};
pub use logs::{LogFilter, MoodStat};
pub use tasks::{CompletionOutcome, TaskFilter};

pub struct TrackerStore {
    conn: Connection,
    db_path: PathBuf,
}

/// Row counts per collection, reported by `arc14 doctor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCounts {
    pub habits: usize,
    pub daily_logs: usize,
    pub journals: usize,
    pub arc_cycles: usize,
    pub scheduled_tasks: usize,
}

impl TrackerStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create db directory {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let store = Self {
            conn,
            db_path: db_path.to_path_buf(),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
              version INTEGER PRIMARY KEY,
              name TEXT NOT NULL,
              applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        self.apply_migration(
            1,
            "tracking_collections",
            r#"
            CREATE TABLE IF NOT EXISTS habits (
              id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              description TEXT NOT NULL DEFAULT '',
              frequency TEXT NOT NULL,
              category TEXT NOT NULL,
              completed_dates TEXT NOT NULL DEFAULT '[]',
              streak INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_logs (
              id TEXT PRIMARY KEY,
              title TEXT NOT NULL,
              content TEXT NOT NULL,
              date TEXT NOT NULL,
              mood TEXT NOT NULL,
              energy INTEGER NOT NULL,
              tags TEXT NOT NULL DEFAULT '[]',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS journals (
              id TEXT PRIMARY KEY,
              title TEXT NOT NULL,
              content TEXT NOT NULL,
              category TEXT NOT NULL,
              tags TEXT NOT NULL DEFAULT '[]',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS arc_cycles (
              id TEXT PRIMARY KEY,
              title TEXT NOT NULL,
              action TEXT NOT NULL,
              reflection TEXT NOT NULL DEFAULT '',
              correction TEXT NOT NULL DEFAULT '',
              status TEXT NOT NULL,
              priority TEXT NOT NULL,
              insights TEXT NOT NULL DEFAULT '[]',
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_daily_logs_date ON daily_logs(date);
            CREATE INDEX IF NOT EXISTS idx_arc_cycles_status ON arc_cycles(status);
            "#,
        )?;

        self.apply_migration(
            2,
            "scheduled_tasks",
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_tasks (
              id TEXT PRIMARY KEY,
              title TEXT NOT NULL,
              description TEXT NOT NULL DEFAULT '',
              scheduled_date TEXT NOT NULL,
              scheduled_time TEXT NOT NULL,
              status TEXT NOT NULL DEFAULT 'pending',
              completed_at TEXT,
              punctuality_points INTEGER NOT NULL DEFAULT 0,
              email_sent INTEGER NOT NULL DEFAULT 0,
              email_sent_at TEXT,
              priority TEXT NOT NULL,
              category TEXT NOT NULL,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_when
              ON scheduled_tasks(scheduled_date, scheduled_time);
            CREATE INDEX IF NOT EXISTS idx_scheduled_tasks_status
              ON scheduled_tasks(status, email_sent);
            "#,
        )?;

        Ok(())
    }

    fn apply_migration(&self, version: i64, name: &str, sql: &str) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM schema_migrations WHERE version = ?1 LIMIT 1")?;
        let mut rows = stmt.query(params![version])?;
        if rows.next()?.is_some() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("migration {version} ({name}) failed"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![version, name],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        let version = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    pub fn counts(&self) -> Result<CollectionCounts> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };
        Ok(CollectionCounts {
            habits: count("habits")?,
            daily_logs: count("daily_logs")?,
            journals: count("journals")?,
            arc_cycles: count("arc_cycles")?,
            scheduled_tasks: count("scheduled_tasks")?,
        })
    }

    /// Writes a consistent snapshot of the database to `destination`.
    pub fn backup_to(&self, destination: &Path) -> Result<()> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if destination.exists() {
            bail!("backup destination already exists: {}", destination.display());
        }
        let target = destination
            .to_str()
            .with_context(|| format!("non-UTF-8 backup path {}", destination.display()))?;
        self.conn
            .execute("VACUUM INTO ?1", params![target])
            .with_context(|| {
                format!(
                    "failed to back up database from {} to {}",
                    self.db_path.display(),
                    destination.display()
                )
            })?;
        Ok(())
    }

    pub fn restore_from(&mut self, source: &Path) -> Result<()> {
        if !source.exists() {
            bail!("restore source does not exist: {}", source.display());
        }
        drop(std::mem::replace(
            &mut self.conn,
            Connection::open_in_memory()?,
        ));
        std::fs::copy(source, &self.db_path).with_context(|| {
            format!(
                "failed to restore database from {} to {}",
                source.display(),
                self.db_path.display()
            )
        })?;
        self.conn = Connection::open(&self.db_path)?;
        self.migrate()?;
        Ok(())
    }
}

fn ts(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn day(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to encode list column")
}

/// Reads a text column and converts it, reporting failures as a column
/// conversion error so they surface through `query_map`.
fn text_col<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    text_col(row, idx, parse_ts)
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_ts(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    text_col(row, idx, |s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
}

fn json_col<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    text_col(row, idx, |s| serde_json::from_str::<T>(s))
}
