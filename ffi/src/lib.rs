/*
 * lib.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Microblog, a microblogging add-on for chat clients.
 *
 * Microblog is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Microblog is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Microblog.  If not, see <http://www.gnu.org/licenses/>.
 */

//! C FFI for the microblog core. A request or response is an opaque `MicroblogHttpMessage`
//! handle; the host framework owns the socket, feeds received bytes with
//! `microblog_http_message_receive` and sends the blocks rendered by
//! `microblog_http_message_prepare_fetch`.
//!
//! All string parameters are UTF-8 NUL-terminated. Functions returning `c_int` return
//! `MICROBLOG_OK` (or a count) on success and a negative `MICROBLOG_ERR_*` code on failure;
//! `microblog_last_error` then describes the failure.

use libc::{c_char, c_int, size_t, ssize_t};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::ptr;

use microblog_core::config::HttpConfig;
use microblog_core::protocol::http::{self, HttpError, HttpMessage, Method, ParseState};

pub const MICROBLOG_OK: c_int = 0;
pub const MICROBLOG_ERR_INVALID_ARGUMENT: c_int = -1;
pub const MICROBLOG_ERR_MALFORMED_STATUS: c_int = -2;
pub const MICROBLOG_ERR_MALFORMED_HEADER: c_int = -3;
pub const MICROBLOG_ERR_MALFORMED_CHUNK: c_int = -4;
pub const MICROBLOG_ERR_INVALID_STATE: c_int = -5;
pub const MICROBLOG_ERR_TRANSPORT: c_int = -6;
pub const MICROBLOG_ERR_CONNECTION_CLOSED: c_int = -7;
pub const MICROBLOG_ERR_OVERFLOW: c_int = -8;

pub const MICROBLOG_METHOD_GET: c_int = 0;
pub const MICROBLOG_METHOD_POST: c_int = 1;

/// Values returned by `microblog_http_message_state`.
pub const MICROBLOG_STATE_INIT: c_int = 0;
pub const MICROBLOG_STATE_HEADER: c_int = 1;
pub const MICROBLOG_STATE_CONTENT: c_int = 2;
pub const MICROBLOG_STATE_FINISHED: c_int = 3;

/// Opaque message handle. Create with `microblog_http_message_new`, free with
/// `microblog_http_message_free`.
pub struct MicroblogHttpMessage {
    message: HttpMessage,
    config: HttpConfig,
    /// Backing store for the last string handed out by get_header/find_param.
    scratch: Option<CString>,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(msg: &str) {
    let msg = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn error_code(err: &HttpError) -> c_int {
    match err {
        HttpError::MalformedStatus(_) => MICROBLOG_ERR_MALFORMED_STATUS,
        HttpError::MalformedHeader(_) => MICROBLOG_ERR_MALFORMED_HEADER,
        HttpError::MalformedChunk(_) => MICROBLOG_ERR_MALFORMED_CHUNK,
        HttpError::InvalidState(_) => MICROBLOG_ERR_INVALID_STATE,
        HttpError::Transport(_) => MICROBLOG_ERR_TRANSPORT,
        HttpError::ConnectionClosed => MICROBLOG_ERR_CONNECTION_CLOSED,
        HttpError::Overflow { .. } => MICROBLOG_ERR_OVERFLOW,
    }
}

fn fail(err: &HttpError) -> c_int {
    set_last_error(&err.to_string());
    error_code(err)
}

fn invalid_argument(what: &str) -> c_int {
    set_last_error(&format!("{} is null or not valid UTF-8", what));
    MICROBLOG_ERR_INVALID_ARGUMENT
}

unsafe fn str_arg<'a>(p: *const c_char) -> Option<&'a str> {
    if p.is_null() {
        return None;
    }
    CStr::from_ptr(p).to_str().ok()
}

unsafe fn handle<'a>(msg: *mut MicroblogHttpMessage) -> Option<&'a mut MicroblogHttpMessage> {
    msg.as_mut()
}

unsafe fn bytes_arg<'a>(data: *const u8, len: size_t) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        return None;
    }
    Some(std::slice::from_raw_parts(data, len))
}

/// Run `f` on the handle and the two string arguments, or report which one was invalid.
unsafe fn with_strs(
    msg: *mut MicroblogHttpMessage,
    a: (*const c_char, &str),
    b: (*const c_char, &str),
    f: impl FnOnce(&mut MicroblogHttpMessage, &str, &str),
) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    let Some(x) = str_arg(a.0) else {
        return invalid_argument(a.1);
    };
    let Some(y) = str_arg(b.0) else {
        return invalid_argument(b.1);
    };
    f(h, x, y);
    clear_last_error();
    MICROBLOG_OK
}

unsafe fn with_str(
    msg: *mut MicroblogHttpMessage,
    a: (*const c_char, &str),
    f: impl FnOnce(&mut MicroblogHttpMessage, &str),
) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    let Some(x) = str_arg(a.0) else {
        return invalid_argument(a.1);
    };
    f(h, x);
    clear_last_error();
    MICROBLOG_OK
}

/// Store `value` in the handle's scratch slot and return a pointer to it, or NULL.
fn hand_out(h: &mut MicroblogHttpMessage, value: Option<String>) -> *const c_char {
    h.scratch = value.and_then(|v| CString::new(v).ok());
    h.scratch.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

/// Version string (static, do not free).
#[no_mangle]
pub extern "C" fn microblog_version() -> *const c_char {
    b"0.1.0\0".as_ptr() as *const c_char
}

/// Last error message from a failed call. Valid until next FFI call on this thread. Do not free.
#[no_mangle]
pub extern "C" fn microblog_last_error() -> *const c_char {
    LAST_ERROR.with(|e| e.borrow().as_ref().map_or(ptr::null(), |s| s.as_ptr()))
}

// ---------- Lifecycle ----------

/// New empty message (GET, no host, no path) with the default limits.
#[no_mangle]
pub extern "C" fn microblog_http_message_new() -> *mut MicroblogHttpMessage {
    Box::into_raw(Box::new(MicroblogHttpMessage {
        message: HttpMessage::new(),
        config: HttpConfig::default(),
        scratch: None,
    }))
}

/// Free a message. No-op if msg is NULL.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_free(msg: *mut MicroblogHttpMessage) {
    if !msg.is_null() {
        drop(Box::from_raw(msg));
    }
}

/// Reset to the freshly created state. Limits set with `set_max_message_size` are kept.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_truncate(msg: *mut MicroblogHttpMessage) {
    if let Some(h) = handle(msg) {
        h.message.truncate();
        h.scratch = None;
    }
}

/// Upper bound for header block plus content when receiving.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_max_message_size(
    msg: *mut MicroblogHttpMessage,
    size: size_t,
) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    h.config.max_message_size = size;
    MICROBLOG_OK
}

// ---------- Request fields ----------

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_url(
    msg: *mut MicroblogHttpMessage,
    url: *const c_char,
) -> c_int {
    with_str(msg, (url, "url"), |h, url| h.message.set_url(url))
}

/// Copy the URL into buf as a NUL-terminated string, truncated to fit len bytes.
/// Returns the number of bytes copied, not counting the NUL.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_get_url(
    msg: *mut MicroblogHttpMessage,
    buf: *mut c_char,
    len: size_t,
) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    if buf.is_null() {
        return invalid_argument("buf");
    }
    if len == 0 {
        return 0;
    }
    let out = std::slice::from_raw_parts_mut(buf as *mut u8, len);
    let n = h.message.copy_url(&mut out[..len - 1]);
    out[n] = 0;
    c_int::try_from(n).unwrap_or(c_int::MAX)
}

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_host(
    msg: *mut MicroblogHttpMessage,
    host: *const c_char,
) -> c_int {
    with_str(msg, (host, "host"), |h, host| h.message.set_host(host))
}

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_path(
    msg: *mut MicroblogHttpMessage,
    path: *const c_char,
) -> c_int {
    with_str(msg, (path, "path"), |h, path| h.message.set_path(path))
}

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_port(msg: *mut MicroblogHttpMessage, port: u16) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    h.message.set_port(port);
    MICROBLOG_OK
}

/// method: MICROBLOG_METHOD_GET or MICROBLOG_METHOD_POST.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_method(msg: *mut MicroblogHttpMessage, method: c_int) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    let method = match method {
        MICROBLOG_METHOD_GET => Method::Get,
        MICROBLOG_METHOD_POST => Method::Post,
        _ => {
            set_last_error("unknown request method");
            return MICROBLOG_ERR_INVALID_ARGUMENT;
        }
    };
    h.message.set_method(method);
    MICROBLOG_OK
}

/// Replace the content with len bytes from data (data may be NULL when len is 0).
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_content(
    msg: *mut MicroblogHttpMessage,
    data: *const u8,
    len: size_t,
) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    let Some(data) = bytes_arg(data, len) else {
        return invalid_argument("data");
    };
    h.message.set_content(data);
    MICROBLOG_OK
}

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_basicauth(
    msg: *mut MicroblogHttpMessage,
    user: *const c_char,
    password: *const c_char,
) -> c_int {
    with_strs(msg, (user, "user"), (password, "password"), |h, u, p| {
        h.message.set_basicauth(u, p)
    })
}

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_header(
    msg: *mut MicroblogHttpMessage,
    key: *const c_char,
    value: *const c_char,
) -> c_int {
    with_strs(msg, (key, "key"), (value, "value"), |h, k, v| h.message.set_header(k, v))
}

/// Header value, or NULL if absent. Valid until the next call on this message. Do not free.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_get_header(
    msg: *mut MicroblogHttpMessage,
    key: *const c_char,
) -> *const c_char {
    let (Some(h), Some(key)) = (handle(msg), str_arg(key)) else {
        return ptr::null();
    };
    let value = h.message.header(key).map(str::to_string);
    hand_out(h, value)
}

/// Verbatim header block, each line ending in CRLF, sent before the keyed headers.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_set_fixed_headers(
    msg: *mut MicroblogHttpMessage,
    block: *const c_char,
) -> c_int {
    with_str(msg, (block, "block"), |h, block| h.message.set_fixed_headers(block))
}

// ---------- Parameters ----------

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_add_param(
    msg: *mut MicroblogHttpMessage,
    key: *const c_char,
    value: *const c_char,
) -> c_int {
    with_strs(msg, (key, "key"), (value, "value"), |h, k, v| h.message.add_param(k, v))
}

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_add_param_int(
    msg: *mut MicroblogHttpMessage,
    key: *const c_char,
    value: i64,
) -> c_int {
    with_str(msg, (key, "key"), |h, k| h.message.add_param_int(k, value))
}

#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_add_param_ull(
    msg: *mut MicroblogHttpMessage,
    key: *const c_char,
    value: u64,
) -> c_int {
    with_str(msg, (key, "key"), |h, k| h.message.add_param_u64(k, value))
}

/// Parameter value, or NULL if absent. Valid until the next call on this message. Do not free.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_find_param(
    msg: *mut MicroblogHttpMessage,
    key: *const c_char,
) -> *const c_char {
    let (Some(h), Some(key)) = (handle(msg), str_arg(key)) else {
        return ptr::null();
    };
    let value = h.message.find_param(key).map(str::to_string);
    hand_out(h, value)
}

/// Remove the first parameter named key. Returns 1 if one was removed, 0 if none matched.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_rm_param(
    msg: *mut MicroblogHttpMessage,
    key: *const c_char,
) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    let Some(key) = str_arg(key) else {
        return invalid_argument("key");
    };
    c_int::from(h.message.rm_param(key))
}

// ---------- Sending ----------

/// Render the request. Afterwards `fetch_header` and `fetch_body` return the blocks to send.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_prepare_fetch(msg: *mut MicroblogHttpMessage) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    match h.message.prepare_fetch() {
        Ok(()) => {
            clear_last_error();
            MICROBLOG_OK
        }
        Err(e) => fail(&e),
    }
}

unsafe fn out_block(block: &[u8], len: *mut size_t) -> *const u8 {
    if !len.is_null() {
        *len = block.len();
    }
    block.as_ptr()
}

/// Rendered request line and headers; *len receives the length. Valid until the next call on
/// this message.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_fetch_header(
    msg: *mut MicroblogHttpMessage,
    len: *mut size_t,
) -> *const u8 {
    match handle(msg) {
        Some(h) => out_block(h.message.fetch_header(), len),
        None => ptr::null(),
    }
}

/// Rendered body; *len receives the length (0 when there is no body).
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_fetch_body(
    msg: *mut MicroblogHttpMessage,
    len: *mut size_t,
) -> *const u8 {
    match handle(msg) {
        Some(h) => out_block(h.message.fetch_body(), len),
        None => ptr::null(),
    }
}

// ---------- Receiving ----------

/// Fold len bytes read by the host into the message. Returns how many bytes were taken (fewer
/// than len only once the message is finished), or a negative error code.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_receive(
    msg: *mut MicroblogHttpMessage,
    data: *const u8,
    len: size_t,
) -> ssize_t {
    let Some(h) = handle(msg) else {
        return invalid_argument("message") as ssize_t;
    };
    let Some(data) = bytes_arg(data, len) else {
        return invalid_argument("data") as ssize_t;
    };
    match http::receive(&mut h.message, data, &h.config) {
        Ok(n) => {
            clear_last_error();
            ssize_t::try_from(n).unwrap_or(ssize_t::MAX)
        }
        Err(e) => fail(&e) as ssize_t,
    }
}

/// The host's socket reached end of stream.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_receive_eof(msg: *mut MicroblogHttpMessage) -> c_int {
    let Some(h) = handle(msg) else {
        return invalid_argument("message");
    };
    match http::receive_eof(&mut h.message) {
        Ok(()) => MICROBLOG_OK,
        Err(e) => fail(&e),
    }
}

/// Response status code, 0 before the status line has been parsed.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_status(msg: *mut MicroblogHttpMessage) -> c_int {
    handle(msg).map_or(MICROBLOG_ERR_INVALID_ARGUMENT, |h| c_int::from(h.message.status()))
}

/// One of the MICROBLOG_STATE_* values.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_state(msg: *mut MicroblogHttpMessage) -> c_int {
    match handle(msg).map(|h| h.message.state()) {
        Some(ParseState::Init) => MICROBLOG_STATE_INIT,
        Some(ParseState::Header) => MICROBLOG_STATE_HEADER,
        Some(ParseState::Content) => MICROBLOG_STATE_CONTENT,
        Some(ParseState::Finished) => MICROBLOG_STATE_FINISHED,
        None => MICROBLOG_ERR_INVALID_ARGUMENT,
    }
}

/// Content bytes; *len receives the length. Not NUL-terminated. Valid until the next call on
/// this message.
#[no_mangle]
pub unsafe extern "C" fn microblog_http_message_content(
    msg: *mut MicroblogHttpMessage,
    len: *mut size_t,
) -> *const u8 {
    match handle(msg) {
        Some(h) => out_block(h.message.content(), len),
        None => ptr::null(),
    }
}
