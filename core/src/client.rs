//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//!
//! Route layout of the todo API:
//! - `GET  /todos` lists everything.
//! - `POST /write` takes the new todo as a JSON body.
//! - `PUT  /update` and `DELETE /delete` take their arguments as query
//!   parameters and answer with the confirmed todo / deleted id.

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{DeletedTodo, NewTodo, Todo};

/// Unreserved characters of RFC 3986 stay as-is, everything else is escaped.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_fetch_todos(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/todos", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_write_todo(&self, input: &NewTodo) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: format!("{}/write", self.base_url),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// The update endpoint replaces every field, so the full todo is sent.
    pub fn build_update_todo(&self, todo: &Todo) -> HttpRequest {
        let date = format_date(&todo.date);
        let is_done = if todo.is_done { "true" } else { "false" };
        let query = encode_query(&[
            ("id", todo.id.as_str()),
            ("title", todo.title.as_str()),
            ("contents", todo.contents.as_str()),
            ("isDone", is_done),
            ("date", date.as_str()),
        ]);
        HttpRequest {
            method: HttpMethod::Put,
            url: format!("{}/update?{query}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_delete_todo(&self, id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: format!("{}/delete?{}", self.base_url, encode_query(&[("id", id)])),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_fetch_todos(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        check_status(&response, 200)?;
        decode(&response.body)
    }

    pub fn parse_write_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 201)?;
        decode(&response.body)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response, 200)?;
        decode(&response.body)
    }

    /// Returns the identifier the server reports as deleted.
    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200)?;
        let deleted: DeletedTodo = decode(&response.body)?;
        Ok(deleted.id)
    }
}

/// Calendar timestamp text used on the wire, e.g. `2025-05-11T09:00:00Z`.
/// Sub-second digits are kept when present, matching the JSON encoding.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", utf8_percent_encode(value, QUERY_VALUE)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
