//! In-memory stand-in for the remote todo API.
//!
//! Routes: `GET /todos`, `POST /write` (JSON body, 201), `PUT /update` and
//! `DELETE /delete` (fields in the query string). Todos are kept in insertion
//! order so `GET /todos` is stable.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub contents: String,
    #[serde(rename = "isDone")]
    pub is_done: bool,
}

#[derive(Debug, Deserialize)]
pub struct WriteTodo {
    pub title: String,
    #[serde(default)]
    pub contents: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub contents: String,
    #[serde(rename = "isDone")]
    pub is_done: bool,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteTodo {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
    pub id: String,
}

pub type Db = Arc<RwLock<Vec<Todo>>>;

pub fn app() -> Router {
    app_with(Vec::new())
}

/// Router pre-loaded with `seed`.
pub fn app_with(seed: Vec<Todo>) -> Router {
    let db: Db = Arc::new(RwLock::new(seed));
    Router::new()
        .route("/todos", get(fetch_todos))
        .route("/write", post(write_todo))
        .route("/update", put(update_todo))
        .route("/delete", delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("event=listen module=mock_server status=ok addr={addr}");
    }
    axum::serve(listener, app).await
}

async fn fetch_todos(State(db): State<Db>) -> Json<Vec<Todo>> {
    let todos = db.read().await;
    info!("event=fetch module=mock_server status=ok count={}", todos.len());
    Json(todos.clone())
}

async fn write_todo(
    State(db): State<Db>,
    Json(input): Json<WriteTodo>,
) -> (StatusCode, Json<Todo>) {
    let todo = Todo {
        id: Uuid::new_v4().to_string(),
        title: input.title,
        date: input.date,
        contents: input.contents,
        is_done: false,
    };
    db.write().await.push(todo.clone());
    info!("event=write module=mock_server status=ok id={}", todo.id);
    (StatusCode::CREATED, Json(todo))
}

async fn update_todo(
    State(db): State<Db>,
    Query(input): Query<UpdateTodo>,
) -> Result<Json<Todo>, StatusCode> {
    let mut todos = db.write().await;
    let Some(todo) = todos.iter_mut().find(|todo| todo.id == input.id) else {
        info!("event=update module=mock_server status=not_found id={}", input.id);
        return Err(StatusCode::NOT_FOUND);
    };
    todo.title = input.title;
    todo.contents = input.contents;
    todo.is_done = input.is_done;
    todo.date = input.date;
    info!("event=update module=mock_server status=ok id={}", todo.id);
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(db): State<Db>,
    Query(input): Query<DeleteTodo>,
) -> Result<Json<Deleted>, StatusCode> {
    let mut todos = db.write().await;
    let position = todos.iter().position(|todo| todo.id == input.id);
    let Some(index) = position else {
        info!("event=delete module=mock_server status=not_found id={}", input.id);
        return Err(StatusCode::NOT_FOUND);
    };
    let removed = todos.remove(index);
    info!("event=delete module=mock_server status=ok id={}", removed.id);
    Ok(Json(Deleted { id: removed.id }))
}
