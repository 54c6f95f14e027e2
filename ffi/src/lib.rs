//! C-ABI wrapper around `todo-core`.
//!
//! # Overview
//! Exposes the todo wire API through `extern "C"` functions so a mobile or
//! desktop shell with a C FFI can build and parse HTTP requests/responses
//! without linking to Rust's async runtime or serde directly. The date-tab
//! classifier is exported too, so the shell groups todos exactly as the core
//! does.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Per-operation `build_*` / `parse_*` mirrors the core API 1:1.
//! - A single `FfiTodoResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `todo_free_*` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::catch_unwind;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use todo_core::bucket::DateBucket;
use todo_core::clock::{Clock, FixedClock};
use todo_core::error::ApiError;
use todo_core::http::HttpResponse;
use todo_core::types::{NewTodo, Todo};
use todo_core::TodoClient;

use types::*;

/// Borrow a C string as UTF-8. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Read an RFC 3339 timestamp from a C string.
///
/// # Safety
/// Same contract as `read_str`.
unsafe fn read_date(ptr: *const c_char) -> Option<DateTime<Utc>> {
    let text = unsafe { read_str(ptr) }?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `TodoClient` bound to `base_url`.
///
/// Returns null if `base_url` is null or not UTF-8, or if an internal panic
/// occurs. The caller must free the returned pointer with `todo_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_client_new(base_url: *const c_char) -> *mut FfiTodoClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { read_str(base_url) }) else {
            return std::ptr::null_mut();
        };
        let client = TodoClient::new(url);
        Box::into_raw(Box::new(FfiTodoClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a `TodoClient` created by `todo_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_client_free(client: *mut FfiTodoClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build an HTTP request for fetching every todo.
///
/// Returns null if `client` is null.
/// The caller must free the returned pointer with `todo_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn todo_build_fetch_todos(client: *const FfiTodoClient) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_fetch_todos())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build an HTTP request for writing a new todo.
///
/// `contents` may be null (empty). `date` is RFC 3339 text.
/// Returns null if `client`, `title` or `date` is null, or if `date` does not
/// parse.
#[unsafe(no_mangle)]
pub extern "C" fn todo_build_write_todo(
    client: *const FfiTodoClient,
    title: *const c_char,
    contents: *const c_char,
    date: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let (Some(title), Some(date)) = (unsafe { read_str(title) }, unsafe { read_date(date) })
        else {
            return std::ptr::null_mut();
        };
        let input = NewTodo {
            title: title.to_string(),
            contents: unsafe { read_str(contents) }.unwrap_or_default().to_string(),
            date,
        };
        match client.inner.build_write_todo(&input) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build an HTTP request replacing every field of the todo with `id`.
///
/// `contents` may be null (empty). `date` is RFC 3339 text.
/// Returns null if `client`, `id`, `title` or `date` is null, or if `date`
/// does not parse.
#[unsafe(no_mangle)]
pub extern "C" fn todo_build_update_todo(
    client: *const FfiTodoClient,
    id: *const c_char,
    title: *const c_char,
    contents: *const c_char,
    date: *const c_char,
    is_done: bool,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let (Some(id), Some(title), Some(date)) = (
            unsafe { read_str(id) },
            unsafe { read_str(title) },
            unsafe { read_date(date) },
        ) else {
            return std::ptr::null_mut();
        };
        let todo = Todo {
            id: id.to_string(),
            title: title.to_string(),
            date,
            contents: unsafe { read_str(contents) }.unwrap_or_default().to_string(),
            is_done,
        };
        FfiHttpRequest::from_core(client.inner.build_update_todo(&todo))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build an HTTP request for deleting a todo by id.
///
/// Returns null if `client` or `id` is null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_build_delete_todo(
    client: *const FfiTodoClient,
    id: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(id) = (unsafe { read_str(id) }) else {
            return std::ptr::null_mut();
        };
        FfiHttpRequest::from_core(client.inner.build_delete_todo(id))
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body is
/// read as empty.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    let body = unsafe { read_str(resp.body) }.unwrap_or_default();
    HttpResponse::new(resp.status, body)
}

/// Shared null checks and conversion for every `todo_parse_*` function.
fn parse_response<T>(
    client: *const FfiTodoClient,
    response: *const FfiHttpResponse,
    parse: impl FnOnce(&TodoClient, HttpResponse) -> Result<T, ApiError>,
    ok: impl FnOnce(T) -> *mut FfiTodoResult,
) -> *mut FfiTodoResult {
    if client.is_null() {
        return FfiTodoResult::null_arg("client");
    }
    if response.is_null() {
        return FfiTodoResult::null_arg("response");
    }
    let client = unsafe { &*client };
    let resp = unsafe { &*response };
    match parse(&client.inner, ffi_response_to_core(resp)) {
        Ok(value) => ok(value),
        Err(e) => FfiTodoResult::from_error(e),
    }
}

/// Parse an HTTP response from a fetch-todos request.
///
/// Returns a result with `data_tag = TodoList` on success (status 200).
#[unsafe(no_mangle)]
pub extern "C" fn todo_parse_fetch_todos(
    client: *const FfiTodoClient,
    response: *const FfiHttpResponse,
) -> *mut FfiTodoResult {
    catch_unwind(|| {
        parse_response(
            client,
            response,
            TodoClient::parse_fetch_todos,
            FfiTodoResult::ok_todo_list,
        )
    })
    .unwrap_or_else(|_| FfiTodoResult::panic("panic in todo_parse_fetch_todos"))
}

/// Parse an HTTP response from a write-todo request.
///
/// Returns a result with `data_tag = Todo` on success (status 201).
#[unsafe(no_mangle)]
pub extern "C" fn todo_parse_write_todo(
    client: *const FfiTodoClient,
    response: *const FfiHttpResponse,
) -> *mut FfiTodoResult {
    catch_unwind(|| {
        parse_response(
            client,
            response,
            TodoClient::parse_write_todo,
            FfiTodoResult::ok_todo,
        )
    })
    .unwrap_or_else(|_| FfiTodoResult::panic("panic in todo_parse_write_todo"))
}

/// Parse an HTTP response from an update-todo request.
///
/// Returns a result with `data_tag = Todo` on success (status 200).
#[unsafe(no_mangle)]
pub extern "C" fn todo_parse_update_todo(
    client: *const FfiTodoClient,
    response: *const FfiHttpResponse,
) -> *mut FfiTodoResult {
    catch_unwind(|| {
        parse_response(
            client,
            response,
            TodoClient::parse_update_todo,
            FfiTodoResult::ok_todo,
        )
    })
    .unwrap_or_else(|_| FfiTodoResult::panic("panic in todo_parse_update_todo"))
}

/// Parse an HTTP response from a delete-todo request.
///
/// Returns a result with `data_tag = DeletedId` on success (status 200).
#[unsafe(no_mangle)]
pub extern "C" fn todo_parse_delete_todo(
    client: *const FfiTodoClient,
    response: *const FfiHttpResponse,
) -> *mut FfiTodoResult {
    catch_unwind(|| {
        parse_response(
            client,
            response,
            TodoClient::parse_delete_todo,
            FfiTodoResult::ok_deleted_id,
        )
    })
    .unwrap_or_else(|_| FfiTodoResult::panic("panic in todo_parse_delete_todo"))
}

// ---------------------------------------------------------------------------
// Date tabs
// ---------------------------------------------------------------------------

/// Classify an RFC 3339 `date` into the past/today/future tab.
///
/// `now_unix_secs` is the current time and `utc_offset_secs` the device's
/// offset east of UTC; calendar days are compared in that offset.
/// Returns `Invalid` if `date` is null or unparseable, or if the clock
/// arguments are out of range.
#[unsafe(no_mangle)]
pub extern "C" fn todo_date_bucket(
    date: *const c_char,
    now_unix_secs: i64,
    utc_offset_secs: i32,
) -> FfiDateBucket {
    catch_unwind(|| {
        let Some(date) = (unsafe { read_date(date) }) else {
            return FfiDateBucket::Invalid;
        };
        let (Some(now), Some(offset)) = (
            Utc.timestamp_opt(now_unix_secs, 0).single(),
            FixedOffset::east_opt(utc_offset_secs),
        ) else {
            return FfiDateBucket::Invalid;
        };
        let clock = FixedClock::new(now, offset);
        DateBucket::classify(clock.local_day(date), clock.today()).into()
    })
    .unwrap_or(FfiDateBucket::Invalid)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `todo_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        unsafe {
            free_c_string(req.url);
            free_c_string(req.body);
            for header in from_raw_slice(req.headers, req.headers_len) {
                free_c_string(header.key);
                free_c_string(header.value);
            }
        }
    });
}

/// Free an `FfiTodoResult` returned by any `todo_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_result(result: *mut FfiTodoResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        unsafe { free_c_string(result.error_message) };
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Todo => {
                let todo = unsafe { Box::from_raw(result.data as *mut FfiTodo) };
                unsafe { todo.free_fields() };
            }
            FfiDataTag::TodoList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiTodoList) };
                for item in unsafe { from_raw_slice(list.items, list.len) } {
                    unsafe { item.free_fields() };
                }
            }
            FfiDataTag::DeletedId => unsafe { free_c_string(result.data as *mut c_char) },
            FfiDataTag::None => {}
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn todo_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| unsafe { free_c_string(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
