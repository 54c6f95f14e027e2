//! Full CRUD lifecycle tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP twice: once through the sans-IO `TodoClient`
//! with ureq as the executor, and once through `RemoteDataSource` with
//! reqwest. Validates that request building and response parsing work
//! end-to-end with the actual server.

use chrono::{TimeZone, Utc};
use todo_core::{
    ApiError, HttpMethod, HttpResponse, NewTodo, RemoteDataSource, TodoClient, TodoDataSource,
    TodoError,
};

/// Execute an `HttpRequest` using ureq and return an `HttpResponse`.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data rather than `Err`, letting the core
/// client handle status interpretation.
fn execute(req: todo_core::HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut response = match (req.method, req.body) {
        (HttpMethod::Get, _) => agent.get(&req.url).call(),
        (HttpMethod::Delete, _) => agent.delete(&req.url).call(),
        (HttpMethod::Post, Some(body)) => {
            agent.post(&req.url).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Post, None) => agent.post(&req.url).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            agent.put(&req.url).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Put, None) => agent.put(&req.url).send_empty(),
    }
    .expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    HttpResponse::new(status, body)
}

/// Runs the mock server on its own thread and returns its address.
fn start_mock_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn new_todo(title: &str) -> NewTodo {
    NewTodo {
        title: title.to_string(),
        contents: "with & without".to_string(),
        date: Utc.with_ymd_and_hms(2025, 5, 11, 9, 0, 0).unwrap(),
    }
}

#[test]
fn crud_lifecycle() {
    let addr = start_mock_server();
    let client = TodoClient::new(&format!("http://{addr}"));

    // Step 1: fetch — should be empty.
    let todos = client.parse_fetch_todos(execute(client.build_fetch_todos())).unwrap();
    assert!(todos.is_empty(), "expected empty list");

    // Step 2: write a todo.
    let req = client.build_write_todo(&new_todo("Integration test")).unwrap();
    let created = client.parse_write_todo(execute(req)).unwrap();
    assert_eq!(created.title, "Integration test");
    assert_eq!(created.contents, "with & without");
    assert!(!created.is_done);

    // Step 3: update title and completion through the query string.
    let mut edited = created.clone();
    edited.title = "Updated title?".to_string();
    edited.is_done = true;
    let updated = client
        .parse_update_todo(execute(client.build_update_todo(&edited)))
        .unwrap();
    assert_eq!(updated, edited);

    // Step 4: fetch — should have the updated item.
    let todos = client.parse_fetch_todos(execute(client.build_fetch_todos())).unwrap();
    assert_eq!(todos, vec![edited.clone()]);

    // Step 5: delete.
    let deleted = client
        .parse_delete_todo(execute(client.build_delete_todo(&created.id)))
        .unwrap();
    assert_eq!(deleted, created.id);

    // Step 6: update after delete — should be NotFound.
    let err = client
        .parse_update_todo(execute(client.build_update_todo(&edited)))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    // Step 7: delete again — should be NotFound.
    let err = client
        .parse_delete_todo(execute(client.build_delete_todo(&created.id)))
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    // Step 8: fetch — should be empty again.
    let todos = client.parse_fetch_todos(execute(client.build_fetch_todos())).unwrap();
    assert!(todos.is_empty(), "expected empty list after delete");
}

#[tokio::test]
async fn remote_source_lifecycle() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));

    let source = RemoteDataSource::new(&format!("http://{addr}")).unwrap();

    let created = source.write_todo(&new_todo("Remote")).await.unwrap();
    let toggled = source.update_todo(&created.with_done(true)).await.unwrap();
    assert!(toggled.is_done);
    assert_eq!(source.fetch_todos().await.unwrap(), vec![toggled]);

    assert_eq!(source.delete_todo(&created.id).await.unwrap(), created.id);
    let err = source.delete_todo(&created.id).await.unwrap_err();
    assert_eq!(err, TodoError::NotFound { id: created.id.clone() });
}

#[tokio::test]
async fn unreachable_server_is_a_backend_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let source = RemoteDataSource::new(&format!("http://{addr}")).unwrap();

    let err = source.fetch_todos().await.unwrap_err();
    assert!(matches!(err, TodoError::Backend(_)), "{err:?}");
}
