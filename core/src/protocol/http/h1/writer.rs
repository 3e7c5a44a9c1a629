/*
 * writer.rs
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

//! HTTP/1.1 request writer.
//!
//! Wire layout: request line, fixed header block verbatim, keyed headers, blank line, body.
//! The body is the form-encoded parameters when there are any, otherwise the raw content.

use std::io;

use bytes::{BufMut, BytesMut};

use crate::net::Transport;
use crate::protocol::http::error::{HttpError, Result};
use crate::protocol::http::message::{HttpMessage, Method};
use crate::uri;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

impl HttpMessage {
    /// Render the request into its header block and body block (see `fetch_header` and
    /// `fetch_body`). Sets Content-Length from the rendered body, and a form Content-Type when
    /// the body comes from parameters and none was set.
    pub fn prepare_fetch(&mut self) -> Result<()> {
        if self.host().map_or(true, str::is_empty) {
            return Err(HttpError::InvalidState("host not set"));
        }
        let path = match self.path() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(HttpError::InvalidState("path not set")),
        };

        let body = if self.param_count() > 0 {
            let encoded = uri::encode_pairs(
                self.params()
                    .iter()
                    .map(|p| (p.key.as_str(), p.value.as_str())),
            );
            if self.header_ignore_case("Content-Type").is_none() {
                self.set_header("Content-Type", FORM_CONTENT_TYPE);
            }
            BytesMut::from(encoded.as_bytes())
        } else {
            self.content.clone()
        };
        if !body.is_empty() || self.method() == Method::Post {
            self.remove_header_ignore_case("Content-Length");
            self.set_header("Content-Length", body.len().to_string());
        }

        let mut packet = BytesMut::with_capacity(256 + body.len());
        packet.put_slice(self.method().as_str().as_bytes());
        packet.put_u8(b' ');
        packet.put_slice(path.as_bytes());
        packet.put_slice(b" HTTP/1.1\r\n");
        if let Some(fixed) = self.fixed_headers() {
            packet.put_slice(fixed.as_bytes());
        }
        for (key, value) in self.headers() {
            packet.put_slice(key.as_bytes());
            packet.put_slice(b": ");
            packet.put_slice(value.as_bytes());
            packet.put_slice(b"\r\n");
        }
        packet.put_slice(b"\r\n");
        let body_offset = packet.len();
        packet.put_slice(&body);

        self.packet = packet;
        self.body_offset = body_offset;
        self.written = 0;
        Ok(())
    }

    /// Rendered request line and headers, up to and including the blank line.
    pub fn fetch_header(&self) -> &[u8] {
        &self.packet[..self.body_offset]
    }

    /// Rendered body.
    pub fn fetch_body(&self) -> &[u8] {
        &self.packet[self.body_offset..]
    }

    /// Bytes of the rendered request already handed to the transport.
    pub fn bytes_written(&self) -> usize {
        self.written
    }
}

/// Send the request, looping until every byte is written. Returns the bytes written by this
/// call. If an earlier call stopped part way on an error, this one resumes where it left off;
/// otherwise the request is rendered afresh.
pub fn write_message<T: Transport + ?Sized>(transport: &mut T, message: &mut HttpMessage) -> Result<usize> {
    if message.written == 0 || message.written >= message.packet.len() {
        message.prepare_fetch()?;
    }
    let start = message.written;
    while message.written < message.packet.len() {
        match transport.write(&message.packet[message.written..]) {
            Ok(0) => {
                return Err(HttpError::Transport(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "transport accepted no bytes",
                )))
            }
            Ok(n) => {
                message.written += n;
                tracing::trace!(bytes = n, total = message.written, "transport write");
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(message.written - start)
}
