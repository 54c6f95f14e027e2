//! Data source backed by an embedded SQLite database.
//!
//! # Design
//! The connection lives behind a mutex and every statement runs on tokio's
//! blocking pool, so callers on the async side never stall on disk I/O.
//! Dates are stored as RFC 3339 text and rows are returned in insertion
//! (`rowid`) order.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::client::format_date;
use crate::db::{open_db, open_db_in_memory};
use crate::error::TodoError;
use crate::source::TodoDataSource;
use crate::types::{NewTodo, Todo};

const SELECT_COLUMNS: &str = "SELECT id, title, contents, date, is_done FROM todos";

#[derive(Debug, Clone)]
pub struct LocalDataSource {
    conn: Arc<Mutex<Connection>>,
}

impl LocalDataSource {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TodoError> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn in_memory() -> Result<Self, TodoError> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Looks up a single todo by identifier.
    pub async fn find(&self, id: &str) -> Result<Todo, TodoError> {
        let id = id.to_string();
        self.with_conn(move |conn| select_one(conn, &id)).await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, TodoError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, TodoError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| TodoError::Backend("database lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| TodoError::Backend(format!("database task failed: {e}")))?
    }
}

#[async_trait]
impl TodoDataSource for LocalDataSource {
    async fn fetch_todos(&self) -> Result<Vec<Todo>, TodoError> {
        self.with_conn(select_all).await
    }

    async fn write_todo(&self, input: &NewTodo) -> Result<Todo, TodoError> {
        let todo = Todo {
            id: Uuid::new_v4().to_string(),
            title: input.title.clone(),
            date: input.date,
            contents: input.contents.clone(),
            is_done: false,
        };
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO todos (id, title, contents, date, is_done) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![todo.id, todo.title, todo.contents, format_date(&todo.date), todo.is_done],
            )
            .map_err(sqlite_error)?;
            debug!("event=todo_write module=local status=ok id={}", todo.id);
            Ok(todo)
        })
        .await
    }

    async fn update_todo(&self, todo: &Todo) -> Result<Todo, TodoError> {
        let todo = todo.clone();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE todos SET title = ?2, contents = ?3, date = ?4, is_done = ?5 WHERE id = ?1",
                    params![todo.id, todo.title, todo.contents, format_date(&todo.date), todo.is_done],
                )
                .map_err(sqlite_error)?;
            if changed == 0 {
                return Err(TodoError::NotFound { id: todo.id });
            }
            select_one(conn, &todo.id)
        })
        .await
    }

    async fn delete_todo(&self, id: &str) -> Result<String, TodoError> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let removed = conn
                .execute("DELETE FROM todos WHERE id = ?1", params![id])
                .map_err(sqlite_error)?;
            if removed == 0 {
                return Err(TodoError::NotFound { id });
            }
            debug!("event=todo_delete module=local status=ok id={id}");
            Ok(id)
        })
        .await
    }
}

struct TodoRow {
    id: String,
    title: String,
    contents: String,
    date: String,
    is_done: bool,
}

impl TodoRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            contents: row.get(2)?,
            date: row.get(3)?,
            is_done: row.get(4)?,
        })
    }

    fn into_todo(self) -> Result<Todo, TodoError> {
        let date = DateTime::parse_from_rfc3339(&self.date)
            .map_err(|e| TodoError::Decoding(format!("todo {} has bad date `{}`: {e}", self.id, self.date)))?
            .with_timezone(&Utc);
        Ok(Todo {
            id: self.id,
            title: self.title,
            date,
            contents: self.contents,
            is_done: self.is_done,
        })
    }
}

fn select_all(conn: &Connection) -> Result<Vec<Todo>, TodoError> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid"))
        .map_err(sqlite_error)?;
    let rows = stmt
        .query_map([], TodoRow::read)
        .map_err(sqlite_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(sqlite_error)?;
    rows.into_iter().map(TodoRow::into_todo).collect()
}

fn select_one(conn: &Connection, id: &str) -> Result<Todo, TodoError> {
    conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], TodoRow::read)
        .optional()
        .map_err(sqlite_error)?
        .ok_or_else(|| TodoError::NotFound { id: id.to_string() })?
        .into_todo()
}

fn sqlite_error(err: rusqlite::Error) -> TodoError {
    TodoError::Backend(err.to_string())
}
