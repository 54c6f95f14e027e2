//! Backing stores the list screen can run against.
//!
//! # Design
//! `TodoDataSource` is the seam between the use cases and storage. Three
//! implementations exist: the remote HTTP API, an embedded SQLite database,
//! and an in-memory stub for debug builds. Implementations fold their own
//! failures into `TodoError` so nothing above this module sees reqwest or
//! rusqlite types.

use async_trait::async_trait;

use crate::error::TodoError;
use crate::types::{NewTodo, Todo};

mod local;
mod remote;
mod stub;

pub use local::LocalDataSource;
pub use remote::RemoteDataSource;
pub use stub::StubDataSource;

#[async_trait]
pub trait TodoDataSource: Send + Sync {
    /// Every stored todo, in storage order.
    async fn fetch_todos(&self) -> Result<Vec<Todo>, TodoError>;

    /// Stores a new todo and returns it with its assigned identifier.
    async fn write_todo(&self, input: &NewTodo) -> Result<Todo, TodoError>;

    /// Replaces the stored todo with `todo.id` and returns the stored value.
    async fn update_todo(&self, todo: &Todo) -> Result<Todo, TodoError>;

    /// Deletes the todo with `id` and returns the deleted identifier.
    async fn delete_todo(&self, id: &str) -> Result<String, TodoError>;
}
