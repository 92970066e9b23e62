//! C-ABI wrapper around `roome-core`.
//!
//! # Overview
//! Lets the mobile host use the roome request pipeline in one of two ways:
//! - blocking calls (`roome_execute`, `roome_fetch_url_data`) that perform
//!   the HTTP round-trips with the core's own transport, or
//! - host-driven exchanges (`roome_exchange_*`) where the host sends each
//!   request with its own HTTP stack and feeds the response back.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single `FfiResult` envelope conveys bodies, "send another request",
//!   and errors uniformly.
//! - Tokens live in the client handle; the host seeds them from its keychain
//!   with `roome_client_set_tokens` and reads rotated values back after calls.
//! - Host-driven exchanges do not coordinate refreshes with each other; run
//!   them one at a time or use the blocking API.
//! - The C caller owns all returned pointers and must call the matching
//!   `roome_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use roome_core::http::CONTENT_TYPE;
use roome_core::{
    ClientConfig, Exchange, HttpMethod, HttpRequest, HttpResponse, MemoryTokenStore, Session, Step, TokenKey,
    TokenPair, TokenStore,
};

use types::*;

/// Copy a C string. `None` for null or non-UTF-8 input.
fn read_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok().map(str::to_string)
}

/// Request for `path` carrying the stored access token, as the app's
/// repositories build them.
fn authorized_request(client: &FfiRoomeClient, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
    let url = client.session.client().config().url(path);
    let mut request = HttpRequest::new(method, url);
    if let Some(body) = body {
        request.set_header(CONTENT_TYPE, "application/json");
        request.body = Some(body);
    }
    let token = client.store.read(TokenKey::AccessToken).unwrap_or_default();
    request.with_bearer(&token)
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new client bound to `base_url` with an empty token store.
///
/// Returns null if `base_url` is null or not UTF-8, or if an internal panic
/// occurs. The caller must free the returned pointer with `roome_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn roome_client_new(base_url: *const c_char) -> *mut FfiRoomeClient {
    catch_unwind(|| {
        let Some(url) = read_str(base_url) else {
            return std::ptr::null_mut();
        };
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!(error = %e, "could not start client runtime");
                return std::ptr::null_mut();
            }
        };
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::with_ureq(ClientConfig::new(&url), store.clone());
        Box::into_raw(Box::new(FfiRoomeClient {
            session,
            store,
            runtime,
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `roome_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn roome_client_free(client: *mut FfiRoomeClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(client) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Replace both stored tokens. Returns false on a null or non-UTF-8 argument.
#[unsafe(no_mangle)]
pub extern "C" fn roome_client_set_tokens(
    client: *const FfiRoomeClient,
    access_token: *const c_char,
    refresh_token: *const c_char,
) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return false;
        }
        let (Some(access_token), Some(refresh_token)) = (read_str(access_token), read_str(refresh_token)) else {
            return false;
        };
        let client = unsafe { &*client };
        client.store.update_pair(&TokenPair {
            access_token,
            refresh_token,
        });
        true
    }))
    .unwrap_or(false)
}

/// Forget both stored tokens. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn roome_client_clear_tokens(client: *const FfiRoomeClient) {
    if !client.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            unsafe { &*client }.session.sign_out();
        }));
    }
}

fn read_token(client: *const FfiRoomeClient, key: TokenKey) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        match unsafe { &*client }.store.read(key) {
            Some(token) => to_c_string(token),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Current access token, or null if none is stored.
/// Free the returned string with `roome_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn roome_client_access_token(client: *const FfiRoomeClient) -> *mut c_char {
    read_token(client, TokenKey::AccessToken)
}

/// Current refresh token, or null if none is stored.
/// Free the returned string with `roome_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn roome_client_refresh_token(client: *const FfiRoomeClient) -> *mut c_char {
    read_token(client, TokenKey::RefreshToken)
}

// ---------------------------------------------------------------------------
// Blocking calls
// ---------------------------------------------------------------------------

/// Execute an authenticated call to `path` (relative to the base URL),
/// refreshing tokens and retrying once on 401. `body` may be null.
///
/// Blocks the calling thread. Must not be called from inside an async runtime.
#[unsafe(no_mangle)]
pub extern "C" fn roome_execute(
    client: *const FfiRoomeClient,
    method: FfiHttpMethod,
    path: *const c_char,
    body: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let Some(path) = read_str(path) else {
            return FfiResult::null_arg("path");
        };
        let client = unsafe { &*client };
        let request = authorized_request(client, method.into(), &path, read_str(body));
        match client.runtime.block_on(client.session.executor().execute(request)) {
            Ok(body) => FfiResult::ok_body(body),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in roome_execute"))
}

/// Plain GET of an absolute `url`. A 401 is reported as
/// `UnexpectedStatus` without refreshing.
///
/// Blocks the calling thread. Must not be called from inside an async runtime.
#[unsafe(no_mangle)]
pub extern "C" fn roome_fetch_url_data(client: *const FfiRoomeClient, url: *const c_char) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let Some(url) = read_str(url) else {
            return FfiResult::null_arg("url");
        };
        let client = unsafe { &*client };
        match client.runtime.block_on(client.session.executor().fetch_url_data(&url)) {
            Ok(body) => FfiResult::ok_body(body),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in roome_fetch_url_data"))
}

// ---------------------------------------------------------------------------
// Host-driven exchanges
// ---------------------------------------------------------------------------

/// Start an exchange for `path` (relative to the base URL). With
/// `authenticated` the request carries the stored access token and a 401
/// leads to a refresh request; without it a 401 is a plain failure.
///
/// Returns null if `client` or `path` is null.
/// The caller must free the returned pointer with `roome_exchange_free`.
#[unsafe(no_mangle)]
pub extern "C" fn roome_exchange_begin(
    client: *const FfiRoomeClient,
    method: FfiHttpMethod,
    path: *const c_char,
    body: *const c_char,
    authenticated: bool,
) -> *mut FfiExchange {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(path) = read_str(path) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let config = client.session.client().config();
        let exchange = if authenticated {
            let request = authorized_request(client, method.into(), &path, read_str(body));
            Exchange::authenticated(request, config.refresh_url())
        } else {
            let mut request = HttpRequest::new(method.into(), config.url(&path));
            if let Some(body) = read_str(body) {
                request.set_header(CONTENT_TYPE, "application/json");
                request.body = Some(body);
            }
            Exchange::unauthenticated(request)
        };
        let pending = Some(exchange.request().clone());
        Box::into_raw(Box::new(FfiExchange {
            inner: exchange,
            pending,
        }))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// The request the host must send next, or null when nothing is pending.
/// The caller must free the returned pointer with `roome_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn roome_exchange_request(exchange: *const FfiExchange) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if exchange.is_null() {
            return std::ptr::null_mut();
        }
        match &unsafe { &*exchange }.pending {
            Some(request) => FfiHttpRequest::from_core(request.clone()),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Feed the response to the pending request.
///
/// Returns `pending = true` when another request must be sent, a body on
/// completion, or an error. Tokens rotated by a refresh are written to the
/// client's store before this returns.
#[unsafe(no_mangle)]
pub extern "C" fn roome_exchange_advance(
    client: *const FfiRoomeClient,
    exchange: *mut FfiExchange,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if exchange.is_null() {
            return FfiResult::null_arg("exchange");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let exchange = unsafe { &mut *exchange };
        let resp = unsafe { &*response };

        let body = if resp.body.is_null() || resp.body_len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(resp.body, resp.body_len as usize) }.to_vec()
        };

        exchange.pending = None;
        match exchange.inner.advance(HttpResponse::new(resp.status, body), client.store.as_ref()) {
            Ok(Step::Send(next)) | Ok(Step::Refresh(next)) => {
                exchange.pending = Some(next);
                FfiResult::pending()
            }
            Ok(Step::Done(body)) => FfiResult::ok_body(body),
            Err(e) => FfiResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in roome_exchange_advance"))
}

/// Free an exchange created by `roome_exchange_begin`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn roome_exchange_free(exchange: *mut FfiExchange) {
    if !exchange.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(exchange) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `roome_exchange_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn roome_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.body.is_null() {
            drop(unsafe { CString::from_raw(req.body) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    });
}

/// Free an `FfiResult` returned by any call. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn roome_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.body.is_null() && result.body_len > 0 {
            drop(unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    result.body,
                    result.body_len as usize,
                ))
            });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn roome_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
