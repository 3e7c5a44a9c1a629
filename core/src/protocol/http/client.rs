/*
 * client.rs
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

//! HTTP client: connect to a host, then use the connection to send requests and read the
//! responses. `HttpClient::fetch` does both in one call, reconnecting on transport failure.

use crate::config::HttpConfig;
use crate::net::{self, Transport};
use crate::protocol::http::error::{HttpError, Result};
use crate::protocol::http::h1::{read_to_end, write_message};
use crate::protocol::http::message::HttpMessage;
use crate::uri::Scheme;

/// HTTP client. Create a connection with `HttpClient::connect(host, port, scheme, config)`, or
/// let `fetch` open one from the request's own URL.
pub struct HttpClient;

impl HttpClient {
    /// Connect to the given host and port, plain or TLS according to `scheme`.
    pub fn connect(host: &str, port: u16, scheme: Scheme, config: &HttpConfig) -> Result<HttpConnection> {
        let transport = net::connect(host, port, scheme, config)?;
        Ok(HttpConnection::new(transport, host.to_string(), port, scheme.is_secure()))
    }

    /// Send `request` on a fresh connection and return the response. Transport failures are
    /// retried on a new connection up to `config.retries` times; parse errors are not.
    pub fn fetch(request: &mut HttpMessage, config: &HttpConfig) -> Result<HttpMessage> {
        let host = match request.host() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(HttpError::InvalidState("host not set")),
        };
        let scheme = request.scheme();
        if scheme == Scheme::Unknown {
            return Err(HttpError::InvalidState("unknown URL scheme"));
        }
        let port = match request.port() {
            0 => scheme.default_port(),
            p => p,
        };

        let mut attempt = 0;
        loop {
            // a new connection gets the whole request, not the tail of an earlier attempt
            request.written = 0;
            let result = Self::connect(&host, port, scheme, config)
                .and_then(|mut conn| conn.send(request, config));
            match result {
                Err(e) if e.is_transport() && attempt < config.retries => {
                    attempt += 1;
                    tracing::warn!(host = %host, port, attempt, error = %e, "retrying request");
                }
                other => return other,
            }
        }
    }
}

/// One open connection. Requests are sent one at a time; each response is read to completion
/// before `send` returns.
pub struct HttpConnection {
    transport: Box<dyn Transport>,
    host: String,
    port: u16,
    secure: bool,
}

impl HttpConnection {
    pub fn new(transport: Box<dyn Transport>, host: String, port: u16, secure: bool) -> Self {
        Self {
            transport,
            host,
            port,
            secure,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Write `request` and read the response into a new message.
    pub fn send(&mut self, request: &mut HttpMessage, config: &HttpConfig) -> Result<HttpMessage> {
        write_message(&mut self.transport, request)?;
        let mut response = HttpMessage::new();
        read_to_end(&mut self.transport, &mut response, config)?;
        tracing::debug!(
            host = %self.host,
            status = response.status(),
            length = response.content().len(),
            "exchange complete"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testing::ScriptedTransport;
    use crate::protocol::http::message::Method;

    #[test]
    fn send_over_scripted_transport() {
        let transport = ScriptedTransport::new(vec![
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec(),
            b"5\r\nhello\r\n".to_vec(),
            b"0\r\n\r\n".to_vec(),
        ]);
        let mut conn = HttpConnection::new(Box::new(transport), "example.com".into(), 80, false);
        let mut request = HttpMessage::new();
        request.set_url("http://example.com/statuses/user_timeline.xml");
        request.set_header("Host", "example.com");
        let response = conn.send(&mut request, &HttpConfig::default()).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.content(), b"hello");
        assert_eq!(conn.host(), "example.com");
        assert!(!conn.is_secure());
    }

    #[test]
    fn send_reports_early_close() {
        let transport = ScriptedTransport::new(vec![
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc".to_vec(),
        ]);
        let mut conn = HttpConnection::new(Box::new(transport), "example.com".into(), 80, false);
        let mut request = HttpMessage::new();
        request.set_url("http://example.com/x");
        request.set_method(Method::Post);
        assert!(matches!(
            conn.send(&mut request, &HttpConfig::default()),
            Err(HttpError::ConnectionClosed)
        ));
    }

    #[test]
    fn fetch_requires_host_and_scheme() {
        let config = HttpConfig::default();
        let mut request = HttpMessage::new();
        request.set_path("/x");
        assert!(matches!(
            HttpClient::fetch(&mut request, &config),
            Err(HttpError::InvalidState(_))
        ));
        request.set_url("gopher://example.com/x");
        assert!(matches!(
            HttpClient::fetch(&mut request, &config),
            Err(HttpError::InvalidState(_))
        ));
    }
}
