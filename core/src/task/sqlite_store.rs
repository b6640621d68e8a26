//! SQLite-backed task storage implementation
//!
//! Stores tasks as rows of a single `tasks` table.

use async_trait::async_trait;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::model::{NewTask, Task, TaskStatus};
use super::repository::TaskRepository;
use crate::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
    })
}

/// Task store backed by a single SQLite connection
///
/// Statements run on the blocking thread pool; the connection mutex
/// serializes access from handlers and the worker.
pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| Error::Storage("connection lock poisoned".to_string()))?;
            f(&conn).map_err(Error::from)
        })
        .await
        .map_err(|e| Error::Storage(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskStore {
    async fn insert(&self, task: &NewTask) -> Result<i64> {
        let task = task.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tasks (title, description, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![task.title, task.description, task.status, task.created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn update_status(&self, id: i64, status: TaskStatus) -> Result<()> {
        let affected = self
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE tasks SET status = ?1 WHERE id = ?2",
                    params![status, id],
                )
            })
            .await?;
        if affected == 0 {
            tracing::debug!("Status update for task {} matched no rows", id);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, description, status, created_at FROM tasks")?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
        .await
    }
}
