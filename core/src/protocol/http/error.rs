/*
 * error.rs
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

//! HTTP engine errors.

use std::io;

/// Errors from parsing, rendering, or moving an HTTP message.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// First line of the response is not `HTTP/<version> <code> [reason]`.
    #[error("malformed status line: {0}")]
    MalformedStatus(String),

    /// A header line has no `:` separator or an unusable value.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A chunk-size line is not hexadecimal, or chunk framing is broken.
    #[error("malformed chunk: {0}")]
    MalformedChunk(String),

    /// The message cannot be rendered or driven in its current state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The transport reported a failure.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The peer closed the stream before the message was complete.
    #[error("connection closed before message was complete")]
    ConnectionClosed,

    /// The message grew past the configured maximum size.
    #[error("message exceeds maximum size of {limit} bytes")]
    Overflow { limit: usize },
}

impl HttpError {
    /// True for failures of the underlying stream (worth a fresh connection), false for
    /// protocol or usage errors.
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::Transport(_) | HttpError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
