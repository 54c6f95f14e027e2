//! Use cases over a `TodoDataSource`.
//!
//! Each operation is a plain async function: build the value to send, call
//! the data source, return the confirmed result. Reconciling that result with
//! the on-screen list is the store's job, not the service's.

use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use crate::error::TodoError;
use crate::form::{FormMode, WriteRequest};
use crate::source::TodoDataSource;
use crate::types::{NewTodo, Todo, TodoChanges};

#[derive(Clone)]
pub struct TodoService {
    source: Arc<dyn TodoDataSource>,
}

impl TodoService {
    pub fn new(source: Arc<dyn TodoDataSource>) -> Self {
        Self { source }
    }

    pub async fn fetch(&self) -> Result<Vec<Todo>, TodoError> {
        let started_at = Instant::now();
        let result = self.source.fetch_todos().await;
        match &result {
            Ok(todos) => info!(
                "event=todo_fetch module=service status=ok count={} duration_ms={}",
                todos.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!("event=todo_fetch module=service status=error error={err}"),
        }
        result
    }

    pub async fn add(&self, input: NewTodo) -> Result<Todo, TodoError> {
        let result = self.source.write_todo(&input).await;
        log_outcome("todo_add", None, &result);
        result
    }

    /// Applies `changes` on top of `target` and stores the result. The
    /// completion flag is carried over unchanged.
    pub async fn edit(&self, target: &Todo, changes: &TodoChanges) -> Result<Todo, TodoError> {
        let edited = target.with_changes(changes);
        let result = self.source.update_todo(&edited).await;
        log_outcome("todo_edit", Some(&target.id), &result);
        result
    }

    pub async fn toggle_done(&self, target: &Todo) -> Result<Todo, TodoError> {
        let toggled = target.with_done(!target.is_done);
        let result = self.source.update_todo(&toggled).await;
        log_outcome("todo_toggle", Some(&target.id), &result);
        result
    }

    /// Returns the identifier the backing store confirmed as deleted.
    pub async fn delete(&self, id: &str) -> Result<String, TodoError> {
        let result = self.source.delete_todo(id).await;
        log_outcome("todo_delete", Some(id), &result);
        result
    }

    /// Dispatches a submitted form to `add` or `edit`.
    pub async fn write(&self, request: &WriteRequest) -> Result<Todo, TodoError> {
        match &request.mode {
            FormMode::Create => self.add(request.new_todo()).await,
            FormMode::Edit(existing) => self.edit(existing, &request.changes()).await,
        }
    }
}

fn log_outcome<T>(event: &str, id: Option<&str>, result: &Result<T, TodoError>) {
    let id = id.unwrap_or("-");
    match result {
        Ok(_) => info!("event={event} module=service status=ok id={id}"),
        Err(err) => warn!("event={event} module=service status=error id={id} error={err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StubDataSource;
    use chrono::{TimeZone, Utc};

    fn todo() -> Todo {
        Todo {
            id: "1".to_string(),
            title: "Read".to_string(),
            date: Utc.with_ymd_and_hms(2025, 5, 11, 9, 0, 0).unwrap(),
            contents: String::new(),
            is_done: false,
        }
    }

    #[tokio::test]
    async fn toggle_twice_restores_flag() {
        let service = TodoService::new(Arc::new(StubDataSource::new(vec![todo()])));
        let once = service.toggle_done(&todo()).await.unwrap();
        assert!(once.is_done);
        let twice = service.toggle_done(&once).await.unwrap();
        assert!(!twice.is_done);
    }

    #[tokio::test]
    async fn edit_keeps_done_flag() {
        let done = todo().with_done(true);
        let service = TodoService::new(Arc::new(StubDataSource::new(vec![done.clone()])));
        let changes = TodoChanges {
            title: Some("Write".to_string()),
            ..TodoChanges::default()
        };
        let edited = service.edit(&done, &changes).await.unwrap();
        assert_eq!(edited.title, "Write");
        assert!(edited.is_done);
    }

    #[tokio::test]
    async fn edit_of_unknown_todo_is_not_found() {
        let service = TodoService::new(Arc::new(StubDataSource::default()));
        let err = service.edit(&todo(), &TodoChanges::default()).await.unwrap_err();
        assert_eq!(err, TodoError::NotFound { id: "1".to_string() });
    }
}
