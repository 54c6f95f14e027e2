//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, pointer plus length instead of `Vec`,
//! and tagged enums with explicit discriminants. Dates cross the boundary as
//! RFC 3339 strings. Conversion functions live here to keep `lib.rs` focused
//! on the `extern "C"` surface.
//!
//! Arrays are allocated as boxed slices, so their capacity always equals the
//! `len` field handed to C.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use todo_core::bucket::DateBucket;
use todo_core::client::format_date;
use todo_core::error::ApiError;
use todo_core::http::HttpMethod;

/// Opaque handle to a `TodoClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiTodoClient {
    pub(crate) inner: todo_core::TodoClient,
}

/// Copies `s` into a heap C string owned by the caller. Interior NUL bytes
/// are dropped.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|err| {
            let mut bytes = err.into_vec();
            bytes.retain(|&b| b != 0);
            CString::new(bytes).unwrap_or_default()
        })
        .into_raw()
}

/// Hands a vector to C as a pointer to its first element (null when empty).
pub(crate) fn into_raw_slice<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    (Box::into_raw(items.into_boxed_slice()) as *mut T, len)
}

/// Takes back a slice produced by `into_raw_slice`.
///
/// # Safety
/// `ptr` and `len` must come from the same `into_raw_slice` call and must
/// not have been reclaimed already.
pub(crate) unsafe fn from_raw_slice<T>(ptr: *mut T, len: u32) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
}

/// Frees a C string produced by `into_c_string`. Null is ignored.
///
/// # Safety
/// `s` must be null or come from `into_c_string` and not be freed yet.
pub(crate) unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `todo_build_*` functions. `url` is absolute and already carries
/// the encoded query string. The C caller executes the request and passes
/// the response back through `todo_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: todo_core::HttpRequest) -> *mut Self {
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(key, value)| FfiHeader {
                key: into_c_string(key),
                value: into_c_string(value),
            })
            .collect();
        let (headers, headers_len) = into_raw_slice(headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: into_c_string(req.url),
            headers,
            headers_len,
            body: req.body.map_or(std::ptr::null_mut(), into_c_string),
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing an HTTP request,
/// then passes a pointer to a `todo_parse_*` function. The FFI layer reads
/// but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiTodoResult`.
#[repr(C)]
pub enum FfiErrorCode {
    Ok = 0,
    NotFound = 1,
    Http = 2,
    Deserialization = 3,
    Serialization = 4,
    Panic = 5,
    NullArg = 6,
    Transport = 7,
}

/// Tag that tells `todo_free_result` what `FfiTodoResult::data` points to.
#[repr(C)]
pub enum FfiDataTag {
    None = 0,
    Todo = 1,
    TodoList = 2,
    /// `data` is a `char*` holding the deleted todo's id.
    DeletedId = 3,
}

/// A single todo exposed to C. `date` is RFC 3339 text in UTC.
#[repr(C)]
pub struct FfiTodo {
    pub id: *mut c_char,
    pub title: *mut c_char,
    pub contents: *mut c_char,
    pub date: *mut c_char,
    pub is_done: bool,
}

impl FfiTodo {
    fn from_core(todo: todo_core::Todo) -> Self {
        FfiTodo {
            id: into_c_string(todo.id),
            title: into_c_string(todo.title),
            contents: into_c_string(todo.contents),
            date: into_c_string(format_date(&todo.date)),
            is_done: todo.is_done,
        }
    }

    /// Free the C-string fields (but not the struct itself).
    ///
    /// # Safety
    /// Every field must come from `FfiTodo::from_core` and not be freed yet.
    pub(crate) unsafe fn free_fields(&self) {
        unsafe {
            free_c_string(self.id);
            free_c_string(self.title);
            free_c_string(self.contents);
            free_c_string(self.date);
        }
    }
}

/// A list of todos exposed to C.
#[repr(C)]
pub struct FfiTodoList {
    pub items: *mut FfiTodo,
    pub len: u32,
}

/// Date tab a todo belongs to, or `Invalid` when the inputs cannot be read.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiDateBucket {
    Invalid = -1,
    Past = 0,
    Today = 1,
    Future = 2,
}

impl From<DateBucket> for FfiDateBucket {
    fn from(bucket: DateBucket) -> Self {
        match bucket {
            DateBucket::Past => FfiDateBucket::Past,
            DateBucket::Today => FfiDateBucket::Today,
            DateBucket::Future => FfiDateBucket::Future,
        }
    }
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the parsed payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null.
#[repr(C)]
pub struct FfiTodoResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiTodoResult {
    fn ok(data_tag: FfiDataTag, data: *mut c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiTodoResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn err(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiTodoResult {
            error_code,
            error_message: into_c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Build a success result carrying a single `FfiTodo`.
    pub(crate) fn ok_todo(todo: todo_core::Todo) -> *mut Self {
        let ffi_todo = Box::new(FfiTodo::from_core(todo));
        Self::ok(FfiDataTag::Todo, Box::into_raw(ffi_todo) as *mut c_void)
    }

    /// Build a success result carrying a `FfiTodoList`.
    pub(crate) fn ok_todo_list(todos: Vec<todo_core::Todo>) -> *mut Self {
        let (items, len) = into_raw_slice(todos.into_iter().map(FfiTodo::from_core).collect());
        let ffi_list = Box::new(FfiTodoList { items, len });
        Self::ok(FfiDataTag::TodoList, Box::into_raw(ffi_list) as *mut c_void)
    }

    /// Build a success result carrying the confirmed deleted id.
    pub(crate) fn ok_deleted_id(id: String) -> *mut Self {
        Self::ok(FfiDataTag::DeletedId, into_c_string(id) as *mut c_void)
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let msg = err.to_string();
        match err {
            ApiError::NotFound => Self::err(FfiErrorCode::NotFound, 404, msg),
            ApiError::HttpError { status, .. } => Self::err(FfiErrorCode::Http, status, msg),
            ApiError::DeserializationError(_) => Self::err(FfiErrorCode::Deserialization, 0, msg),
            ApiError::SerializationError(_) => Self::err(FfiErrorCode::Serialization, 0, msg),
            ApiError::Transport(_) => Self::err(FfiErrorCode::Transport, 0, msg),
        }
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::err(FfiErrorCode::Panic, 0, msg.to_string())
    }
}
