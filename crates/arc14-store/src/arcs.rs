use anyhow::Result;
use arc14_core::{ArcCycle, ArcStatus, Insight, Priority};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;

use crate::{TrackerStore, json_col, text_col, to_json, ts, ts_col};

const COLUMNS: &str =
    "id, title, action, reflection, correction, status, priority, insights, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct ArcFilter {
    pub status: Option<ArcStatus>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ArcStatus,
    pub count: usize,
}

fn cycle_from_row(row: &Row<'_>) -> rusqlite::Result<ArcCycle> {
    Ok(ArcCycle {
        id: row.get(0)?,
        title: row.get(1)?,
        action: row.get(2)?,
        reflection: row.get(3)?,
        correction: row.get(4)?,
        status: text_col(row, 5, ArcStatus::parse)?,
        priority: text_col(row, 6, Priority::parse)?,
        insights: json_col::<Vec<Insight>>(row, 7)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

impl TrackerStore {
    pub fn insert_arc_cycle(&self, cycle: &ArcCycle) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO arc_cycles ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                cycle.id,
                cycle.title,
                cycle.action,
                cycle.reflection,
                cycle.correction,
                cycle.status.as_str(),
                cycle.priority.as_str(),
                to_json(&cycle.insights)?,
                ts(&cycle.created_at),
                ts(&cycle.updated_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_arc_cycle(&self, id: &str) -> Result<Option<ArcCycle>> {
        let cycle = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM arc_cycles WHERE id = ?1"),
                params![id],
                cycle_from_row,
            )
            .optional()?;
        Ok(cycle)
    }

    pub fn list_arc_cycles(&self, filter: &ArcFilter) -> Result<Vec<ArcCycle>> {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(status) = filter.status {
            args.push(status.as_str());
            clauses.push(format!("status = ?{}", args.len()));
        }
        if let Some(priority) = filter.priority {
            args.push(priority.as_str());
            clauses.push(format!("priority = ?{}", args.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM arc_cycles {where_sql} ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params_from_iter(args), cycle_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn save_arc_cycle(&self, cycle: &ArcCycle) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE arc_cycles
             SET title = ?1, action = ?2, reflection = ?3, correction = ?4, status = ?5,
                 priority = ?6, insights = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                cycle.title,
                cycle.action,
                cycle.reflection,
                cycle.correction,
                cycle.status.as_str(),
                cycle.priority.as_str(),
                to_json(&cycle.insights)?,
                ts(&cycle.updated_at),
                cycle.id
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_arc_cycle(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM arc_cycles WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn arc_status_counts(&self) -> Result<Vec<StatusCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*)
             FROM arc_cycles
             GROUP BY status
             ORDER BY COUNT(*) DESC, status ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(StatusCount {
                status: text_col(row, 0, ArcStatus::parse)?,
                count: count as usize,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
