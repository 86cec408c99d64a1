use anyhow::Result;
use arc14_core::{Habit, HabitCategory, HabitFrequency};
use rusqlite::{OptionalExtension, Row, params};

use crate::{TrackerStore, json_col, text_col, to_json, ts, ts_col};

const COLUMNS: &str =
    "id, name, description, frequency, category, completed_dates, streak, created_at, updated_at";

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        frequency: text_col(row, 3, HabitFrequency::parse)?,
        category: text_col(row, 4, HabitCategory::parse)?,
        completed_dates: json_col(row, 5)?,
        streak: row.get(6)?,
        created_at: ts_col(row, 7)?,
        updated_at: ts_col(row, 8)?,
    })
}

impl TrackerStore {
    pub fn insert_habit(&self, habit: &Habit) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO habits ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                habit.id,
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                habit.category.as_str(),
                to_json(&habit.completed_dates)?,
                habit.streak,
                ts(&habit.created_at),
                ts(&habit.updated_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        let habit = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM habits WHERE id = ?1"),
                params![id],
                habit_from_row,
            )
            .optional()?;
        Ok(habit)
    }

    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM habits ORDER BY created_at DESC"))?;
        let rows = stmt.query_map([], habit_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Overwrites every mutable column. Returns false when the habit is gone.
    pub fn save_habit(&self, habit: &Habit) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE habits
             SET name = ?1, description = ?2, frequency = ?3, category = ?4,
                 completed_dates = ?5, streak = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                habit.name,
                habit.description,
                habit.frequency.as_str(),
                habit.category.as_str(),
                to_json(&habit.completed_dates)?,
                habit.streak,
                ts(&habit.updated_at),
                habit.id
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_habit(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
