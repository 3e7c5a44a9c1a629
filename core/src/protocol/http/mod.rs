/*
 * mod.rs
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

//! HTTP message engine.
//!
//! - `HttpMessage` is both the outgoing request and the incoming response.
//! - `h1` folds response bytes into a message (resumable across partial reads) and writes
//!   rendered requests, over any `Transport`.
//! - `HttpClient` / `HttpConnection` tie the two to a real connection.

mod error;
mod message;

pub mod client;
pub mod h1;
pub mod status;

pub use client::{HttpClient, HttpConnection};
pub use error::{HttpError, Result};
pub use h1::{read_message, read_to_end, receive, receive_eof, write_message};
pub use message::{HttpMessage, Method, Param, ParseState};
pub use crate::uri::Scheme;
