//! In-memory data source used by debug builds in place of a live backend.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::TodoError;
use crate::source::TodoDataSource;
use crate::types::{NewTodo, Todo};

const SAMPLE_TODOS: &str = include_str!("../../fixtures/sample_todos.json");

#[derive(Debug, Default)]
pub struct StubDataSource {
    todos: Mutex<Vec<Todo>>,
    latency: Duration,
}

impl StubDataSource {
    pub fn new(todos: Vec<Todo>) -> Self {
        Self {
            todos: Mutex::new(todos),
            latency: Duration::ZERO,
        }
    }

    /// A stub pre-filled with the bundled sample list.
    pub fn with_sample_data() -> Result<Self, TodoError> {
        let todos = serde_json::from_str(SAMPLE_TODOS)
            .map_err(|e| TodoError::Decoding(format!("bundled sample data: {e}")))?;
        Ok(Self::new(todos))
    }

    /// Delays every call by `latency`, imitating a network round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Current stored list.
    pub fn stored(&self) -> Result<Vec<Todo>, TodoError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Todo>>, TodoError> {
        self.todos
            .lock()
            .map_err(|_| TodoError::Backend("stub store lock poisoned".to_string()))
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl TodoDataSource for StubDataSource {
    async fn fetch_todos(&self) -> Result<Vec<Todo>, TodoError> {
        self.delay().await;
        self.stored()
    }

    async fn write_todo(&self, input: &NewTodo) -> Result<Todo, TodoError> {
        self.delay().await;
        let todo = Todo {
            id: Uuid::new_v4().to_string(),
            title: input.title.clone(),
            date: input.date,
            contents: input.contents.clone(),
            is_done: false,
        };
        self.lock()?.push(todo.clone());
        Ok(todo)
    }

    async fn update_todo(&self, todo: &Todo) -> Result<Todo, TodoError> {
        self.delay().await;
        let mut todos = self.lock()?;
        let slot = todos
            .iter_mut()
            .find(|stored| stored.id == todo.id)
            .ok_or_else(|| TodoError::NotFound {
                id: todo.id.clone(),
            })?;
        *slot = todo.clone();
        Ok(todo.clone())
    }

    async fn delete_todo(&self, id: &str) -> Result<String, TodoError> {
        self.delay().await;
        let mut todos = self.lock()?;
        let before = todos.len();
        todos.retain(|stored| stored.id != id);
        if todos.len() == before {
            return Err(TodoError::NotFound { id: id.to_string() });
        }
        Ok(id.to_string())
    }
}
