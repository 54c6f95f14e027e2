//! Drive the C surface against the live mock server, the way a native shell
//! would: build a request, execute it with its own HTTP stack, hand the
//! response back for parsing.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use todo_ffi::types::{
    FfiDataTag, FfiErrorCode, FfiHttpMethod, FfiHttpRequest, FfiHttpResponse, FfiTodo,
    FfiTodoList, FfiTodoResult,
};
use todo_ffi::*;

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

fn c_str<'a>(ptr: *const c_char) -> &'a str {
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap()
}

/// Execute a built request with ureq, then free it.
fn execute(req: *mut FfiHttpRequest) -> (u16, CString) {
    assert!(!req.is_null());
    let req_ref = unsafe { &*req };
    let url = c_str(req_ref.url).to_string();
    let body = (!req_ref.body.is_null()).then(|| c_str(req_ref.body).to_string());

    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let mut response = match (&req_ref.method, body) {
        (FfiHttpMethod::Get, _) => agent.get(&url).call(),
        (FfiHttpMethod::Delete, _) => agent.delete(&url).call(),
        (FfiHttpMethod::Post, Some(body)) => agent
            .post(&url)
            .content_type("application/json")
            .send(body.as_bytes()),
        (FfiHttpMethod::Post, None) => agent.post(&url).send_empty(),
        (FfiHttpMethod::Put, Some(body)) => agent
            .put(&url)
            .content_type("application/json")
            .send(body.as_bytes()),
        (FfiHttpMethod::Put, None) => agent.put(&url).send_empty(),
    }
    .expect("HTTP transport error");
    todo_free_request(req);

    let status = response.status().as_u16();
    let text = response.body_mut().read_to_string().unwrap_or_default();
    (status, CString::new(text).unwrap())
}

fn parse(
    parse_fn: extern "C" fn(*const todo_ffi::types::FfiTodoClient, *const FfiHttpResponse) -> *mut FfiTodoResult,
    client: *const todo_ffi::types::FfiTodoClient,
    (status, body): (u16, CString),
) -> *mut FfiTodoResult {
    let resp = FfiHttpResponse {
        status,
        body: body.as_ptr(),
    };
    parse_fn(client, &resp)
}

#[test]
fn crud_through_c_surface() {
    let addr = start_mock_server();
    let url = CString::new(format!("http://{addr}")).unwrap();
    let client = todo_client_new(url.as_ptr());
    assert!(!client.is_null());

    // write
    let title = CString::new("From C").unwrap();
    let contents = CString::new("50% done").unwrap();
    let date = CString::new("2025-05-11T09:00:00Z").unwrap();
    let req = todo_build_write_todo(client, title.as_ptr(), contents.as_ptr(), date.as_ptr());
    let result = parse(todo_parse_write_todo, client, execute(req));
    let r = unsafe { &*result };
    assert!(matches!(r.error_code, FfiErrorCode::Ok));
    let created = unsafe { &*(r.data as *const FfiTodo) };
    let id = CString::new(c_str(created.id)).unwrap();
    assert_eq!(c_str(created.contents), "50% done");
    assert!(!created.is_done);
    todo_free_result(result);

    // toggle
    let req = todo_build_update_todo(
        client,
        id.as_ptr(),
        title.as_ptr(),
        contents.as_ptr(),
        date.as_ptr(),
        true,
    );
    let result = parse(todo_parse_update_todo, client, execute(req));
    let r = unsafe { &*result };
    assert!(matches!(r.error_code, FfiErrorCode::Ok));
    assert!(unsafe { &*(r.data as *const FfiTodo) }.is_done);
    todo_free_result(result);

    // fetch
    let req = todo_build_fetch_todos(client);
    let result = parse(todo_parse_fetch_todos, client, execute(req));
    let r = unsafe { &*result };
    assert!(matches!(r.data_tag, FfiDataTag::TodoList));
    assert_eq!(unsafe { &*(r.data as *const FfiTodoList) }.len, 1);
    todo_free_result(result);

    // delete
    let req = todo_build_delete_todo(client, id.as_ptr());
    let result = parse(todo_parse_delete_todo, client, execute(req));
    let r = unsafe { &*result };
    assert!(matches!(r.data_tag, FfiDataTag::DeletedId));
    assert_eq!(c_str(r.data as *const c_char), id.to_str().unwrap());
    todo_free_result(result);

    // delete again
    let req = todo_build_delete_todo(client, id.as_ptr());
    let result = parse(todo_parse_delete_todo, client, execute(req));
    let r = unsafe { &*result };
    assert!(matches!(r.error_code, FfiErrorCode::NotFound));
    todo_free_result(result);

    todo_client_free(client);
}
