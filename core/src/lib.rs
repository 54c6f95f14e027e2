//! Data layer of a todo-list app.
//!
//! # Overview
//! Todos live in a backing store (remote HTTP API, embedded SQLite, or an
//! in-memory stub). `TodoStore` keeps an on-screen snapshot of them,
//! reconciles it with every confirmed write, groups it into past/today/future
//! tabs, and asks the user whether to retry each failed call.
//!
//! # Design
//! - `TodoClient` is sans-IO: each operation is a `build_*` that produces an
//!   `HttpRequest` and a `parse_*` that consumes an `HttpResponse`.
//!   `RemoteDataSource` performs the round trip with reqwest.
//! - `TodoDataSource` is the storage seam; `TodoService` holds the use cases
//!   as plain async functions over it.
//! - `TodoStore` is a single-writer actor; the snapshot is never shared.
//! - Wiring is explicit (`config::spawn_store`), with no runtime container.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod bucket;
pub mod client;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod form;
pub mod http;
pub mod retry;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod types;

pub use bucket::{DateBucket, Grouping, Section};
pub use client::TodoClient;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, Backend};
pub use error::{ApiError, TodoError};
pub use form::{FormError, FormMode, TodoForm, WriteRequest};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use retry::{run_with_retry, RetryDecision, RetryPrompt};
pub use service::TodoService;
pub use snapshot::{Applied, ConflictPolicy, Snapshot};
pub use source::{LocalDataSource, RemoteDataSource, StubDataSource, TodoDataSource};
pub use store::{ListState, LoadPhase, Operation, PendingFailure, StoreOptions, TodoStore};
pub use types::{DeletedTodo, NewTodo, Todo, TodoChanges};
