/*
 * message.rs
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

//! HTTP message: everything about one request or one response.
//!
//! A request is filled in with setters (URL parts, headers, parameters, content) and rendered by
//! the writer; a response is filled in by the parser as bytes arrive. The same type serves both
//! sides, and `truncate` returns it to the freshly constructed state for reuse.

use std::borrow::Cow;
use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::BytesMut;

use crate::uri::{self, Scheme};

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Parse progress of a received message. Only ever moves forward until `truncate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ParseState {
    /// Waiting for the status line.
    #[default]
    Init,
    /// Status line seen; reading header lines.
    Header,
    /// Headers done; reading the body.
    Content,
    /// Complete; no further bytes are taken.
    Finished,
}

/// How the body of a received message is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum BodyMode {
    /// No length given: the body runs until the peer closes.
    #[default]
    UntilClose,
    /// Content-Length.
    Fixed,
    /// Transfer-Encoding: chunked.
    Chunked,
}

/// Position inside a chunked body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ChunkPhase {
    /// Reading a chunk-size line.
    #[default]
    Size,
    /// Bytes of chunk data still to copy.
    Data(usize),
    /// Expecting the CRLF that closes a chunk's data.
    DataEnd,
    /// After the zero chunk: skipping trailer lines up to the blank line.
    Trailer,
}

/// One form parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// One HTTP request or response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpMessage {
    host: Option<String>,
    path: Option<String>,
    port: u16,
    scheme: Scheme,
    method: Method,

    headers: BTreeMap<String, String>,
    fixed_headers: Option<String>,
    params: Vec<Param>,

    pub(crate) content: BytesMut,
    /// Undecoded chunked bytes; only used while a chunked body is being read.
    pub(crate) chunked_content: BytesMut,
    /// Receiving side: Content-Length, or None when chunked or read-until-close.
    pub(crate) content_length: Option<usize>,
    pub(crate) status: u16,
    pub(crate) state: ParseState,

    // Receiving side: header bytes not yet turned into status/headers, and where the
    // next line starts and where the CRLF search resumes.
    pub(crate) header_packet: BytesMut,
    /// Size of the complete header block, counted against the message size limit.
    pub(crate) header_len: usize,
    pub(crate) line_start: usize,
    pub(crate) scan_from: usize,
    pub(crate) body_mode: BodyMode,
    pub(crate) chunk_phase: ChunkPhase,

    // Sending side: rendered header block followed by the body block, and the write cursor.
    pub(crate) packet: BytesMut,
    pub(crate) body_offset: usize,
    pub(crate) written: usize,
}

impl HttpMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set scheme, host, port and path from `scheme://host[:port]/path`.
    pub fn set_url(&mut self, url: &str) {
        let parts = uri::split_url(url);
        self.scheme = parts.scheme;
        self.port = parts.port;
        self.set_host(parts.host);
        self.set_path(parts.path);
    }

    /// Canonical `scheme://host:port/path`.
    pub fn url(&self) -> String {
        uri::join_url(
            self.scheme,
            self.host.as_deref().unwrap_or(""),
            self.port,
            self.path.as_deref().unwrap_or("/"),
        )
    }

    /// Copy the URL into `out`, truncating to fit (never splitting a UTF-8 sequence).
    /// Returns the number of bytes written.
    pub fn copy_url(&self, out: &mut [u8]) -> usize {
        let url = self.url();
        let mut n = url.len().min(out.len());
        while !url.is_char_boundary(n) {
            n -= 1;
        }
        out[..n].copy_from_slice(&url.as_bytes()[..n]);
        n
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = Some(path.into());
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Replace the content wholesale.
    pub fn set_content(&mut self, data: &[u8]) {
        self.content.clear();
        self.content.extend_from_slice(data);
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content as text; invalid UTF-8 is replaced.
    pub fn content_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Store `Authorization: Basic base64(user:password)`.
    pub fn set_basicauth(&mut self, user: &str, password: &str) {
        let credential = BASE64.encode(format!("{}:{}", user, password));
        self.set_header("Authorization", format!("Basic {}", credential));
    }

    /// Add or replace a header. Keys match exactly as stored.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// First header whose key matches ignoring ASCII case.
    pub fn header_ignore_case(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// Pre-formatted header lines written verbatim before the keyed headers.
    /// Every line must already end in CRLF.
    pub fn set_fixed_headers(&mut self, block: impl Into<String>) {
        self.fixed_headers = Some(block.into());
    }

    pub fn fixed_headers(&self) -> Option<&str> {
        self.fixed_headers.as_deref()
    }

    /// Append a form parameter. Duplicate keys are kept.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push(Param {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn add_param_int(&mut self, key: impl Into<String>, value: i64) {
        self.add_param(key, value.to_string());
    }

    pub fn add_param_u64(&mut self, key: impl Into<String>, value: u64) {
        self.add_param(key, value.to_string());
    }

    /// Value of the first parameter named `key`.
    pub fn find_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Remove the first parameter named `key`. Returns false if there was none.
    pub fn rm_param(&mut self, key: &str) -> bool {
        match self.params.iter().position(|p| p.key == key) {
            Some(i) => {
                self.params.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Drop every header whose key matches ignoring ASCII case.
    pub(crate) fn remove_header_ignore_case(&mut self, key: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(key));
    }

    /// Release everything and return to the freshly constructed state.
    pub fn truncate(&mut self) {
        *self = Self::default();
    }

    /// Status code; 0 until the status line has been parsed.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == ParseState::Finished
    }

    /// Content-Length of a received message; None while unknown, when chunked, or when the body
    /// runs until close.
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_overwrite_keeps_one_entry() {
        let mut m = HttpMessage::new();
        m.set_header("Accept", "text/xml");
        m.set_header("Accept", "*/*");
        assert_eq!(m.header("Accept"), Some("*/*"));
        assert_eq!(m.header_count(), 1);
    }

    #[test]
    fn header_keys_are_case_sensitive_as_stored() {
        let mut m = HttpMessage::new();
        m.set_header("Content-Type", "text/plain");
        assert_eq!(m.header("content-type"), None);
        assert_eq!(m.header_ignore_case("content-type"), Some("text/plain"));
    }

    #[test]
    fn params_keep_order_and_duplicates() {
        let mut m = HttpMessage::new();
        m.add_param("a", "1");
        m.add_param("a", "2");
        m.add_param_int("count", -20);
        m.add_param_u64("since_id", 18446744073709551615);
        assert_eq!(m.param_count(), 4);
        assert_eq!(m.find_param("a"), Some("1"));
        assert_eq!(m.find_param("count"), Some("-20"));
        assert_eq!(m.find_param("since_id"), Some("18446744073709551615"));

        assert!(m.rm_param("a"));
        assert_eq!(m.find_param("a"), Some("2"));
        assert_eq!(m.param_count(), 3);
        assert_eq!(m.params()[0].key, "a");
        assert!(m.rm_param("a"));
        assert!(!m.rm_param("a"));
        assert_eq!(m.find_param("a"), None);
    }

    #[test]
    fn set_url_then_url_round_trips() {
        let mut m = HttpMessage::new();
        m.set_url("https://twitter.com:443/statuses/friends_timeline.xml");
        assert_eq!(m.scheme(), Scheme::Secure);
        assert_eq!(m.host(), Some("twitter.com"));
        assert_eq!(m.port(), 443);
        assert_eq!(m.path(), Some("/statuses/friends_timeline.xml"));
        assert_eq!(m.url(), "https://twitter.com:443/statuses/friends_timeline.xml");
    }

    #[test]
    fn set_url_replaces_previous_parts() {
        let mut m = HttpMessage::new();
        m.set_url("https://twitter.com/a");
        m.set_url("http://identi.ca/api/b");
        assert_eq!(m.url(), "http://identi.ca:80/api/b");
    }

    #[test]
    fn copy_url_truncates_to_buffer() {
        let mut m = HttpMessage::new();
        m.set_url("http://example.com:8080/abc");
        let mut small = [0u8; 10];
        assert_eq!(m.copy_url(&mut small), 10);
        assert_eq!(&small, b"http://exa");
        let mut big = [0u8; 64];
        let n = m.copy_url(&mut big);
        assert_eq!(&big[..n], b"http://example.com:8080/abc");
        assert_eq!(m.copy_url(&mut []), 0);
    }

    #[test]
    fn copy_url_does_not_split_characters() {
        let mut m = HttpMessage::new();
        m.set_url("http://h:1/é");
        let mut out = [0u8; 12];
        // "http://h:1/" is 11 bytes and é takes two more
        assert_eq!(m.copy_url(&mut out), 11);
    }

    #[test]
    fn basic_auth_header() {
        let mut m = HttpMessage::new();
        m.set_basicauth("Aladdin", "open sesame");
        assert_eq!(m.header("Authorization"), Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="));
    }

    #[test]
    fn set_content_replaces() {
        let mut m = HttpMessage::new();
        m.set_content(b"first body");
        m.set_content(b"second");
        assert_eq!(m.content(), b"second");
        assert_eq!(m.content_str(), "second");
    }

    #[test]
    fn truncate_matches_fresh_message() {
        let mut m = HttpMessage::new();
        m.set_url("https://twitter.com/statuses/update.xml");
        m.set_method(Method::Post);
        m.set_header("Host", "twitter.com");
        m.set_fixed_headers("Accept: */*\r\n");
        m.set_basicauth("user", "pass");
        m.add_param("status", "hello");
        m.set_content(b"body");
        m.prepare_fetch().unwrap();
        m.truncate();
        assert_eq!(m, HttpMessage::new());
        assert_eq!(m.state(), ParseState::Init);
        assert_eq!(m.host(), None);
        assert!(m.content().is_empty());
    }

    #[test]
    fn parse_states_are_ordered() {
        assert!(ParseState::Init < ParseState::Header);
        assert!(ParseState::Header < ParseState::Content);
        assert!(ParseState::Content < ParseState::Finished);
    }
}
