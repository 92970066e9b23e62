//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec<u8>`,
//! and tagged enums with explicit discriminants. Conversion functions live
//! here to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::Arc;

use roome_core::{ApiError, Exchange, HttpMethod, HttpRequest, MemoryTokenStore, Session};

/// Opaque handle to a roome session. C callers receive a pointer to this and
/// pass it back into every FFI function.
pub struct FfiRoomeClient {
    pub(crate) session: Session,
    pub(crate) store: Arc<MemoryTokenStore>,
    pub(crate) runtime: tokio::runtime::Runtime,
}

/// Opaque handle to a host-driven exchange.
pub struct FfiExchange {
    pub(crate) inner: Exchange,
    pub(crate) pending: Option<HttpRequest>,
}

/// Convert to a heap C string. Interior NULs cannot cross the boundary, so
/// such strings come out empty.
pub(crate) fn to_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Patch = 3,
    Delete = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Patch => FfiHttpMethod::Patch,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Patch => HttpMethod::Patch,
            FfiHttpMethod::Delete => HttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request the host must send, as C-compatible plain data.
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
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let url = to_c_string(req.url);
        let body = match req.body {
            Some(b) => to_c_string(b),
            None => std::ptr::null_mut(),
        };

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
            body,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response received by the host.
///
/// The C caller constructs this on the stack and passes a pointer to
/// `roome_exchange_advance`. The FFI layer reads but does not free these
/// fields. A `status` of 0 means the host got no HTTP response at all.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const u8,
    pub body_len: u32,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Transport = 1,
    Application = 2,
    UnexpectedStatus = 3,
    Decode = 4,
    NoResponse = 5,
    Serialization = 6,
    Config = 7,
    ExchangeFinished = 8,
    Panic = 9,
    NullArg = 10,
}

/// Result envelope for every call.
///
/// On success `error_code` is `Ok`. If `pending` is true the exchange wants
/// another request sent (fetch it with `roome_exchange_request`); otherwise
/// `body`/`body_len` hold the response body. On failure `error_message` is a
/// human-readable C string and `http_status` carries the offending status
/// when there is one. For `Application` errors `error_message` is the
/// server's message.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub pending: bool,
    pub body: *mut u8,
    pub body_len: u32,
}

impl FfiResult {
    fn boxed(result: FfiResult) -> *mut Self {
        Box::into_raw(Box::new(result))
    }

    fn failure(error_code: FfiErrorCode, http_status: u16, message: String) -> *mut Self {
        Self::boxed(FfiResult {
            error_code,
            error_message: to_c_string(message),
            http_status,
            pending: false,
            body: std::ptr::null_mut(),
            body_len: 0,
        })
    }

    /// Build a success result carrying `body`.
    pub(crate) fn ok_body(body: Vec<u8>) -> *mut Self {
        let body_len = body.len() as u32;
        let body = if body.is_empty() {
            std::ptr::null_mut()
        } else {
            Box::into_raw(body.into_boxed_slice()) as *mut u8
        };
        Self::boxed(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            pending: false,
            body,
            body_len,
        })
    }

    /// Build a success result telling the host to send the next request.
    pub(crate) fn pending() -> *mut Self {
        Self::boxed(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            pending: true,
            body: std::ptr::null_mut(),
            body_len: 0,
        })
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (code, status) = match &err {
            ApiError::Transport(_) => (FfiErrorCode::Transport, 0),
            ApiError::Application(_) => (FfiErrorCode::Application, 400),
            ApiError::UnexpectedStatus(status) => (FfiErrorCode::UnexpectedStatus, *status),
            ApiError::Decode(_) => (FfiErrorCode::Decode, 0),
            ApiError::NoResponse => (FfiErrorCode::NoResponse, 0),
            ApiError::Serialization(_) => (FfiErrorCode::Serialization, 0),
            ApiError::Config(_) => (FfiErrorCode::Config, 0),
            ApiError::ExchangeFinished => (FfiErrorCode::ExchangeFinished, 0),
        };
        let message = match err {
            ApiError::Application(payload) => payload.message,
            other => other.to_string(),
        };
        Self::failure(code, status, message)
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorCode::Panic, 0, msg.to_string())
    }
}
