//! SQLite-backed task store.
//!
//! # Responsibility
//! - Provide a local reference implementation of `TaskStore`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - `total_score` column is recomputed from pillar scores on every write.
//! - Every mutation reads the record back and returns that copy.
//! - Read paths reject invalid persisted state, except `completed_at`, which
//!   is returned raw so insight code can apply its own tolerance.

use crate::db::{open_db, open_db_in_memory};
use crate::model::comment::Comment;
use crate::model::task::{format_timestamp, parse_timestamp, Feedback, PillarScores, Task};
use crate::store::{
    CompletionFilter, FetchedTask, NewTask, StoreError, StoreResult, TaskPatch, TaskStore,
};
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    consequence_score,
    pride_score,
    construction_score,
    completed,
    hidden,
    ideal_date,
    completed_at,
    feedback,
    created_at
FROM tasks";

const IDEAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Task store over one SQLite connection.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Wraps an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Inserts a fully-formed task, keeping its id and timestamps.
    ///
    /// Used by seeding and import paths where the record already exists.
    pub fn insert_task(&self, task: &Task) -> StoreResult<()> {
        task.validate()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tasks (
                id,
                user_id,
                title,
                consequence_score,
                pride_score,
                construction_score,
                total_score,
                completed,
                hidden,
                ideal_date,
                completed_at,
                feedback,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                task.id.as_str(),
                task.user_id.as_str(),
                task.title.as_str(),
                task.scores.consequence,
                task.scores.pride,
                task.scores.construction,
                task.total_score(),
                task.completed,
                task.hidden,
                task.ideal_date.map(format_ideal_date),
                task.completed_at.as_deref(),
                task.feedback.map(Feedback::as_str),
                format_timestamp(task.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_task(conn: &Connection, task_id: &str) -> StoreResult<Task> {
        let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([task_id])?;
        match rows.next()? {
            Some(row) => parse_task_row(row),
            None => Err(not_found("task", task_id)),
        }
    }

    fn list_tasks(
        conn: &Connection,
        user_id: &str,
        filter: CompletionFilter,
    ) -> StoreResult<Vec<Task>> {
        let condition = match filter {
            CompletionFilter::All => "",
            CompletionFilter::Open => " AND completed = 0",
            CompletionFilter::Completed => " AND completed = 1",
        };
        let mut stmt = conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE user_id = ?1{condition}
             ORDER BY created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn list_user_comments(
        conn: &Connection,
        user_id: &str,
    ) -> StoreResult<HashMap<String, Vec<Comment>>> {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.task_id, c.text, c.created_at
             FROM comments c
             JOIN tasks t ON t.id = c.task_id
             WHERE t.user_id = ?1
             ORDER BY c.created_at ASC, c.id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut grouped: HashMap<String, Vec<Comment>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let comment = parse_comment_row(row)?;
            grouped
                .entry(comment.task_id.clone())
                .or_default()
                .push(comment);
        }
        Ok(grouped)
    }
}

impl TaskStore for SqliteTaskStore {
    async fn fetch_tasks(
        &self,
        user_id: &str,
        filter: CompletionFilter,
    ) -> StoreResult<Vec<FetchedTask>> {
        let conn = self.conn.lock();
        let tasks = Self::list_tasks(&conn, user_id, filter)?;
        let mut comments = Self::list_user_comments(&conn, user_id)?;
        debug!(
            "event=store_fetch module=store status=ok filter={filter:?} count={}",
            tasks.len()
        );
        Ok(tasks
            .into_iter()
            .map(|task| {
                let comments = comments.remove(&task.id).unwrap_or_default();
                FetchedTask { task, comments }
            })
            .collect())
    }

    async fn create_task(&self, user_id: &str, task: &NewTask) -> StoreResult<Task> {
        let mut record = Task::new(user_id, task.title.trim(), task.scores);
        record.ideal_date = task.ideal_date;
        self.insert_task(&record)?;
        let conn = self.conn.lock();
        Self::get_task(&conn, &record.id)
    }

    async fn update_task(&self, task_id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut task = Self::get_task(&tx, task_id)?;
        patch.apply_to(&mut task);
        task.validate()?;

        tx.execute(
            "UPDATE tasks
             SET
                title = ?1,
                consequence_score = ?2,
                pride_score = ?3,
                construction_score = ?4,
                total_score = ?5,
                completed = ?6,
                hidden = ?7,
                ideal_date = ?8,
                completed_at = ?9,
                feedback = ?10
             WHERE id = ?11;",
            params![
                task.title.as_str(),
                task.scores.consequence,
                task.scores.pride,
                task.scores.construction,
                task.total_score(),
                task.completed,
                task.hidden,
                task.ideal_date.map(format_ideal_date),
                task.completed_at.as_deref(),
                task.feedback.map(Feedback::as_str),
                task_id,
            ],
        )?;
        let stored = Self::get_task(&tx, task_id)?;
        tx.commit()?;
        Ok(stored)
    }

    async fn delete_task(&self, task_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [task_id])?;
        if changed == 0 {
            return Err(not_found("task", task_id));
        }
        Ok(())
    }

    async fn add_comment(&self, task_id: &str, text: &str) -> StoreResult<Comment> {
        let conn = self.conn.lock();
        let exists = conn
            .query_row("SELECT 1 FROM tasks WHERE id = ?1;", [task_id], |_| Ok(()))
            .optional()?;
        if exists.is_none() {
            return Err(not_found("task", task_id));
        }

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO comments (id, task_id, text, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                comment.id.as_str(),
                comment.task_id.as_str(),
                comment.text.as_str(),
                format_timestamp(comment.created_at),
            ],
        )?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM comments WHERE id = ?1;", [comment_id])?;
        if changed == 0 {
            return Err(not_found("comment", comment_id));
        }
        Ok(())
    }
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<Task> {
    let id: String = row.get("id")?;

    let created_at_text: String = row.get("created_at")?;
    let created_at = parse_stored_timestamp(&created_at_text, "tasks.created_at")?;

    let ideal_date = match row.get::<_, Option<String>>("ideal_date")? {
        Some(value) => Some(
            NaiveDate::parse_from_str(&value, IDEAL_DATE_FORMAT).map_err(|_| {
                StoreError::InvalidData(format!("invalid ideal_date `{value}` for task {id}"))
            })?,
        ),
        None => None,
    };

    let feedback = match row.get::<_, Option<String>>("feedback")? {
        Some(value) => Some(Feedback::parse(&value).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid feedback `{value}` for task {id}"))
        })?),
        None => None,
    };

    Ok(Task {
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        created_at,
        scores: PillarScores::new(
            row.get("consequence_score")?,
            row.get("pride_score")?,
            row.get("construction_score")?,
        ),
        completed: row.get("completed")?,
        hidden: row.get("hidden")?,
        ideal_date,
        completed_at: row.get("completed_at")?,
        feedback,
        id,
    })
}

fn parse_comment_row(row: &Row<'_>) -> StoreResult<Comment> {
    let created_at_text: String = row.get("created_at")?;
    Ok(Comment {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        text: row.get("text")?,
        created_at: parse_stored_timestamp(&created_at_text, "comments.created_at")?,
    })
}

fn parse_stored_timestamp(value: &str, column: &str) -> StoreResult<DateTime<Utc>> {
    parse_timestamp(value)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

fn format_ideal_date(date: NaiveDate) -> String {
    date.format(IDEAL_DATE_FORMAT).to_string()
}

fn not_found(entity: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}
