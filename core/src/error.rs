//! Error types for the wire client and the domain layer.
//!
//! # Design
//! `ApiError` is what `TodoClient` parse methods return: it knows about HTTP
//! status codes and JSON. Data sources fold it (and SQLite failures) into
//! `TodoError`, the single domain error the list store publishes. `TodoError`
//! carries owned strings only so it can be cloned into published state.

use thiserror::Error;

/// Errors returned by `TodoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404, the requested todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status other than the expected one and 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The round trip itself failed (connection refused, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(String),
}

/// Domain-level error surfaced to the list store and its observers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TodoError {
    /// The backing store answered with something that is not a todo.
    #[error("malformed response: {0}")]
    Decoding(String),

    /// The target of an edit, toggle or delete does not exist.
    #[error("todo {id} not found")]
    NotFound { id: String },

    /// Any other failure of the backing store.
    #[error("backend error: {0}")]
    Backend(String),

    /// A confirmed update lost the race against another confirmed update.
    #[error("todo {id} was changed by another operation")]
    Conflict { id: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The list store task is gone.
    #[error("todo store is closed")]
    Closed,
}

impl TodoError {
    /// Wraps a wire-client error. `id` names the target of the request, if any,
    /// so that a 404 becomes a `NotFound` the caller can act on.
    pub fn from_api(err: ApiError, id: Option<&str>) -> Self {
        match err {
            ApiError::NotFound => TodoError::NotFound {
                id: id.unwrap_or_default().to_string(),
            },
            ApiError::DeserializationError(msg) => TodoError::Decoding(msg),
            other => TodoError::Backend(other.to_string()),
        }
    }
}

impl From<crate::db::DbError> for TodoError {
    fn from(err: crate::db::DbError) -> Self {
        TodoError::Backend(err.to_string())
    }
}
