//! Data source backed by the remote todo API.
//!
//! `TodoClient` decides what goes on the wire; this type only owns the
//! reqwest client that performs the round trip.

use std::time::Instant;

use async_trait::async_trait;
use log::{debug, warn};

use crate::client::TodoClient;
use crate::error::{ApiError, TodoError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::source::TodoDataSource;
use crate::types::{NewTodo, Todo};

#[derive(Debug, Clone)]
pub struct RemoteDataSource {
    client: TodoClient,
    http: reqwest::Client,
}

impl RemoteDataSource {
    pub fn new(base_url: &str) -> Result<Self, TodoError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| TodoError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_http(TodoClient::new(base_url), http))
    }

    pub fn with_http(client: TodoClient, http: reqwest::Client) -> Self {
        Self { client, http }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    /// Executes a request built by `TodoClient`. Non-2xx statuses come back
    /// as data; only transport failures are errors here.
    pub async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let started_at = Instant::now();
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, &req.url);
        for (key, value) in &req.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(
                "event=remote_request module=source status=error method={} url={} error={e}",
                req.method, req.url
            );
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (key.to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        debug!(
            "event=remote_request module=source status=ok method={} url={} http_status={status} duration_ms={}",
            req.method,
            req.url,
            started_at.elapsed().as_millis()
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn round_trip(&self, req: HttpRequest, id: Option<&str>) -> Result<HttpResponse, TodoError> {
        self.execute(req)
            .await
            .map_err(|e| TodoError::from_api(e, id))
    }
}

#[async_trait]
impl TodoDataSource for RemoteDataSource {
    async fn fetch_todos(&self) -> Result<Vec<Todo>, TodoError> {
        let response = self.round_trip(self.client.build_fetch_todos(), None).await?;
        self.client
            .parse_fetch_todos(response)
            .map_err(|e| TodoError::from_api(e, None))
    }

    async fn write_todo(&self, input: &NewTodo) -> Result<Todo, TodoError> {
        let req = self
            .client
            .build_write_todo(input)
            .map_err(|e| TodoError::from_api(e, None))?;
        let response = self.round_trip(req, None).await?;
        self.client
            .parse_write_todo(response)
            .map_err(|e| TodoError::from_api(e, None))
    }

    async fn update_todo(&self, todo: &Todo) -> Result<Todo, TodoError> {
        let id = Some(todo.id.as_str());
        let response = self.round_trip(self.client.build_update_todo(todo), id).await?;
        self.client
            .parse_update_todo(response)
            .map_err(|e| TodoError::from_api(e, id))
    }

    async fn delete_todo(&self, id: &str) -> Result<String, TodoError> {
        let response = self
            .round_trip(self.client.build_delete_todo(id), Some(id))
            .await?;
        self.client
            .parse_delete_todo(response)
            .map_err(|e| TodoError::from_api(e, Some(id)))
    }
}
