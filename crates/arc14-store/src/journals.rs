use anyhow::Result;
use arc14_core::{Journal, JournalCategory};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;

use crate::{TrackerStore, json_col, text_col, to_json, ts, ts_col};

const COLUMNS: &str = "id, title, content, category, tags, created_at, updated_at";

#[derive(Debug, Clone, Default)]
pub struct JournalFilter {
    pub category: Option<JournalCategory>,
    pub tags: Vec<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: JournalCategory,
    pub count: usize,
}

fn journal_from_row(row: &Row<'_>) -> rusqlite::Result<Journal> {
    Ok(Journal {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: text_col(row, 3, JournalCategory::parse)?,
        tags: json_col(row, 4)?,
        created_at: ts_col(row, 5)?,
        updated_at: ts_col(row, 6)?,
    })
}

/// Number of search terms found in the journal's title or content.
fn relevance(journal: &Journal, terms: &[String]) -> usize {
    let haystack = format!("{}\n{}", journal.title, journal.content).to_lowercase();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

impl TrackerStore {
    pub fn insert_journal(&self, journal: &Journal) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO journals ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                journal.id,
                journal.title,
                journal.content,
                journal.category.as_str(),
                to_json(&journal.tags)?,
                ts(&journal.created_at),
                ts(&journal.updated_at)
            ],
        )?;
        Ok(())
    }

    pub fn get_journal(&self, id: &str) -> Result<Option<Journal>> {
        let journal = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM journals WHERE id = ?1"),
                params![id],
                journal_from_row,
            )
            .optional()?;
        Ok(journal)
    }

    /// Newest first, or by search relevance when a search is given.
    pub fn list_journals(&self, filter: &JournalFilter) -> Result<Vec<Journal>> {
        let mut args = Vec::new();
        let where_sql = match filter.category {
            Some(category) => {
                args.push(category.as_str());
                "WHERE category = ?1"
            }
            None => "",
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM journals {where_sql} ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params_from_iter(args), journal_from_row)?;
        let mut journals = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        if !filter.tags.is_empty() {
            journals.retain(|j| j.tags.iter().any(|t| filter.tags.contains(t)));
        }

        let terms: Vec<String> = filter
            .search
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Ok(journals);
        }
        let mut scored: Vec<(usize, Journal)> = journals
            .into_iter()
            .map(|j| (relevance(&j, &terms), j))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().map(|(_, j)| j).collect())
    }

    pub fn save_journal(&self, journal: &Journal) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE journals
             SET title = ?1, content = ?2, category = ?3, tags = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                journal.title,
                journal.content,
                journal.category.as_str(),
                to_json(&journal.tags)?,
                ts(&journal.updated_at),
                journal.id
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_journal(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM journals WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn journal_category_counts(&self) -> Result<Vec<CategoryCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*)
             FROM journals
             GROUP BY category
             ORDER BY COUNT(*) DESC, category ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(CategoryCount {
                category: text_col(row, 0, JournalCategory::parse)?,
                count: count as usize,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
