/*
 * parser.rs
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

//! HTTP/1.1 response push parser: status line, headers, body (Content-Length, chunked, or
//! until close).
//!
//! Bytes are folded into an `HttpMessage` as they arrive; any read may end mid-line or
//! mid-chunk. Header bytes wait in the message's header accumulator, undecoded chunked bytes in
//! its chunk scratch buffer. Lines already turned into status/headers are never scanned again.

use bytes::Buf;

use crate::config::HttpConfig;
use crate::net::Transport;
use crate::protocol::http::error::{HttpError, Result};
use crate::protocol::http::message::{BodyMode, ChunkPhase, HttpMessage, ParseState};
use crate::protocol::http::status;

/// Longest chunk-size line accepted (size, extensions and CRLF).
const MAX_CHUNK_LINE: usize = 1024;

/// Find CRLF in buf; return the offset of the CR, or None if not found.
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Fold `data` into `message`. Returns how many bytes were taken: all of them unless the
/// message finished part way through, in which case the rest belongs to whatever follows.
pub fn receive(message: &mut HttpMessage, data: &[u8], config: &HttpConfig) -> Result<usize> {
    let mut consumed = 0;
    while consumed < data.len() {
        let rest = &data[consumed..];
        let used = match message.state {
            ParseState::Init | ParseState::Header => receive_header(message, rest, config)?,
            ParseState::Content => match message.body_mode {
                BodyMode::Fixed => receive_fixed(message, rest),
                BodyMode::UntilClose => receive_until_close(message, rest, config)?,
                BodyMode::Chunked => receive_chunked(message, rest, config)?,
            },
            ParseState::Finished => break,
        };
        consumed += used;
    }
    Ok(consumed)
}

/// The peer closed the stream. Completes a read-until-close body; anything else is premature.
pub fn receive_eof(message: &mut HttpMessage) -> Result<()> {
    match (message.state, message.body_mode) {
        (ParseState::Finished, _) => Ok(()),
        (ParseState::Content, BodyMode::UntilClose) => {
            message.content_length = Some(message.content.len());
            finish(message);
            Ok(())
        }
        _ => Err(HttpError::ConnectionClosed),
    }
}

/// One transport read folded into `message`. Returns the state afterwards.
pub fn read_message<T: Transport + ?Sized>(
    transport: &mut T,
    message: &mut HttpMessage,
    config: &HttpConfig,
) -> Result<ParseState> {
    let mut buf = vec![0u8; config.read_chunk_size.max(1)];
    read_step(transport, message, config, &mut buf)
}

/// Read until the message is finished.
pub fn read_to_end<T: Transport + ?Sized>(
    transport: &mut T,
    message: &mut HttpMessage,
    config: &HttpConfig,
) -> Result<()> {
    let mut buf = vec![0u8; config.read_chunk_size.max(1)];
    while read_step(transport, message, config, &mut buf)? != ParseState::Finished {}
    Ok(())
}

fn read_step<T: Transport + ?Sized>(
    transport: &mut T,
    message: &mut HttpMessage,
    config: &HttpConfig,
    buf: &mut [u8],
) -> Result<ParseState> {
    if message.state == ParseState::Finished {
        return Ok(ParseState::Finished);
    }
    let n = loop {
        match transport.read(buf) {
            Ok(n) => break n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    };
    tracing::trace!(bytes = n, state = ?message.state, "transport read");
    if n == 0 {
        receive_eof(message)?;
        return Ok(message.state);
    }
    let used = receive(message, &buf[..n], config)?;
    if used < n {
        tracing::debug!(surplus = n - used, "ignoring bytes past end of message");
    }
    Ok(message.state)
}

fn check_size(len: usize, config: &HttpConfig) -> Result<()> {
    if len > config.max_message_size {
        return Err(HttpError::Overflow {
            limit: config.max_message_size,
        });
    }
    Ok(())
}

/// The header block, the content so far and `extra` more content bytes must fit together.
fn check_body_size(message: &HttpMessage, extra: usize, config: &HttpConfig) -> Result<()> {
    let total = message
        .header_len
        .checked_add(message.content.len())
        .and_then(|n| n.checked_add(extra));
    match total {
        Some(n) if n <= config.max_message_size => Ok(()),
        _ => Err(HttpError::Overflow {
            limit: config.max_message_size,
        }),
    }
}

fn finish(message: &mut HttpMessage) {
    message.state = ParseState::Finished;
    tracing::debug!(
        status = message.status,
        length = message.content.len(),
        "response complete"
    );
}

/// Status line and header lines. Returns bytes of `data` taken; stops at the blank line.
fn receive_header(message: &mut HttpMessage, data: &[u8], config: &HttpConfig) -> Result<usize> {
    let before = message.header_packet.len();
    message.header_packet.extend_from_slice(data);

    loop {
        if message.state == ParseState::Init {
            check_status_prefix(&message.header_packet[message.line_start..])?;
        }
        let line_end = match find_crlf(&message.header_packet[message.scan_from..]) {
            Some(i) => message.scan_from + i,
            None => {
                // resume one byte back in case the CR has arrived without its LF
                message.scan_from = message
                    .header_packet
                    .len()
                    .saturating_sub(1)
                    .max(message.line_start);
                check_size(message.header_packet.len(), config)?;
                return Ok(data.len());
            }
        };
        check_size(line_end + 2, config)?;
        let line_start = message.line_start;
        message.line_start = line_end + 2;
        message.scan_from = message.line_start;

        match message.state {
            ParseState::Init => {
                let line = &message.header_packet[line_start..line_end];
                let code = parse_status_line(line)?;
                message.status = code;
                message.state = ParseState::Header;
                tracing::debug!(status = code, "status line");
            }
            _ if line_end == line_start => {
                let end = message.line_start;
                message.header_len = end;
                start_body(message, config)?;
                message.header_packet.clear();
                message.line_start = 0;
                message.scan_from = 0;
                return Ok(end - before);
            }
            _ => {
                let (key, value) = parse_header_line(&message.header_packet[line_start..line_end])?;
                message.set_header(key, value);
            }
        }
    }
}

/// Reject a first line that cannot become `HTTP/...` without waiting for its CRLF.
fn check_status_prefix(pending: &[u8]) -> Result<()> {
    let n = pending.len().min(5);
    if pending[..n] != b"HTTP/"[..n] {
        let shown = String::from_utf8_lossy(&pending[..pending.len().min(32)]).into_owned();
        return Err(HttpError::MalformedStatus(shown));
    }
    Ok(())
}

/// `HTTP/<major>.<minor> <3-digit code>[ <reason>]`
fn parse_status_line(line: &[u8]) -> Result<u16> {
    let malformed = || HttpError::MalformedStatus(String::from_utf8_lossy(line).into_owned());
    let text = std::str::from_utf8(line).map_err(|_| malformed())?;
    let mut parts = text.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    let code = parts.next().unwrap_or("");

    let digits = version.strip_prefix("HTTP/").ok_or_else(malformed)?;
    let (major, minor) = digits.split_once('.').ok_or_else(malformed)?;
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_number(major) || !is_number(minor) {
        return Err(malformed());
    }
    if code.len() != 3 || !is_number(code) {
        return Err(malformed());
    }
    let code: u16 = code.parse().map_err(|_| malformed())?;
    if code < 100 {
        return Err(malformed());
    }
    Ok(code)
}

fn parse_header_line(line: &[u8]) -> Result<(String, String)> {
    let text = String::from_utf8_lossy(line);
    let (key, value) = text
        .split_once(':')
        .ok_or_else(|| HttpError::MalformedHeader(text.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(HttpError::MalformedHeader(text.to_string()));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Headers are complete: pick the body mode from them.
fn start_body(message: &mut HttpMessage, config: &HttpConfig) -> Result<()> {
    let chunked = message
        .header_ignore_case("Transfer-Encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);
    let content_length = match message.header_ignore_case("Content-Length") {
        Some(v) => Some(
            v.trim()
                .parse::<usize>()
                .map_err(|_| HttpError::MalformedHeader(format!("Content-Length: {}", v)))?,
        ),
        None => None,
    };

    let (mode, length) = if status::has_no_body(message.status) {
        (BodyMode::Fixed, Some(0))
    } else if chunked {
        (BodyMode::Chunked, None)
    } else if let Some(len) = content_length {
        check_body_size(message, len, config)?;
        (BodyMode::Fixed, Some(len))
    } else {
        (BodyMode::UntilClose, None)
    };

    message.state = ParseState::Content;
    message.body_mode = mode;
    message.content_length = length;
    message.chunk_phase = ChunkPhase::Size;
    if let Some(len) = length {
        message.content.reserve(len);
    }
    tracing::debug!(
        mode = ?message.body_mode,
        length = ?message.content_length,
        headers = message.header_count(),
        "headers complete"
    );
    if message.content_length == Some(0) {
        finish(message);
    }
    Ok(())
}

fn receive_fixed(message: &mut HttpMessage, data: &[u8]) -> usize {
    let target = message.content_length.unwrap_or(0);
    let take = target.saturating_sub(message.content.len()).min(data.len());
    message.content.extend_from_slice(&data[..take]);
    if message.content.len() >= target {
        finish(message);
    }
    take
}

fn receive_until_close(message: &mut HttpMessage, data: &[u8], config: &HttpConfig) -> Result<usize> {
    check_body_size(message, data.len(), config)?;
    message.content.extend_from_slice(data);
    Ok(data.len())
}

/// Append to the chunk scratch buffer and decode as far as it goes.
fn receive_chunked(message: &mut HttpMessage, data: &[u8], config: &HttpConfig) -> Result<usize> {
    message.chunked_content.extend_from_slice(data);
    decode_chunks(message, config)?;
    if message.state == ParseState::Finished {
        // whatever is left over arrived in this call, after the terminating chunk
        let surplus = message.chunked_content.len();
        message.chunked_content.clear();
        return Ok(data.len() - surplus);
    }
    Ok(data.len())
}

fn decode_chunks(message: &mut HttpMessage, config: &HttpConfig) -> Result<()> {
    loop {
        let scratch = &mut message.chunked_content;
        match message.chunk_phase {
            ChunkPhase::Size => {
                let line_end = match find_crlf(scratch) {
                    Some(n) => n,
                    None => return check_partial_size_line(scratch),
                };
                let line = scratch.split_to(line_end + 2);
                let size = parse_chunk_size(&line[..line_end])?;
                if size == 0 {
                    message.chunk_phase = ChunkPhase::Trailer;
                } else {
                    check_body_size(message, size, config)?;
                    message.chunk_phase = ChunkPhase::Data(size);
                }
            }
            ChunkPhase::Data(remaining) => {
                let take = remaining.min(scratch.len());
                if take == 0 {
                    return Ok(());
                }
                let chunk = scratch.split_to(take);
                message.content.extend_from_slice(&chunk);
                message.chunk_phase = if remaining == take {
                    ChunkPhase::DataEnd
                } else {
                    ChunkPhase::Data(remaining - take)
                };
            }
            ChunkPhase::DataEnd => {
                if scratch.len() < 2 {
                    if scratch.first().is_some_and(|&b| b != b'\r') {
                        return Err(HttpError::MalformedChunk("missing CRLF after chunk data".into()));
                    }
                    return Ok(());
                }
                if &scratch[..2] != b"\r\n" {
                    return Err(HttpError::MalformedChunk("missing CRLF after chunk data".into()));
                }
                scratch.advance(2);
                message.chunk_phase = ChunkPhase::Size;
            }
            ChunkPhase::Trailer => {
                let line_end = match find_crlf(scratch) {
                    Some(n) => n,
                    None => {
                        if scratch.len() > MAX_CHUNK_LINE {
                            return Err(HttpError::MalformedChunk("trailer line too long".into()));
                        }
                        return Ok(());
                    }
                };
                scratch.advance(line_end + 2);
                if line_end == 0 {
                    finish(message);
                    return Ok(());
                }
                tracing::trace!("ignoring chunked trailer line");
            }
        }
    }
}

/// A chunk-size line whose CRLF has not arrived yet: fail now if it can never become valid.
fn check_partial_size_line(pending: &[u8]) -> Result<()> {
    if pending.len() > MAX_CHUNK_LINE {
        return Err(HttpError::MalformedChunk("chunk-size line too long".into()));
    }
    for (i, &b) in pending.iter().enumerate() {
        match b {
            b';' => return Ok(()),
            b'\r' if i + 1 == pending.len() => return Ok(()),
            b' ' | b'\t' => {}
            b if b.is_ascii_hexdigit() => {}
            _ => {
                let shown = String::from_utf8_lossy(pending).into_owned();
                return Err(HttpError::MalformedChunk(shown));
            }
        }
    }
    Ok(())
}

/// Hex size, optionally followed by `;extensions` (ignored).
fn parse_chunk_size(line: &[u8]) -> Result<usize> {
    let malformed = || HttpError::MalformedChunk(String::from_utf8_lossy(line).into_owned());
    let text = std::str::from_utf8(line).map_err(|_| malformed())?;
    let hex = text.split(';').next().unwrap_or(text).trim();
    if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    usize::from_str_radix(hex, 16).map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testing::ScriptedTransport;

    const FIXED: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
    const CHUNKED: &[u8] =
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";

    fn parse_all(data: &[u8]) -> Result<HttpMessage> {
        let mut m = HttpMessage::new();
        receive(&mut m, data, &HttpConfig::default())?;
        Ok(m)
    }

    #[test]
    fn fixed_length_body() {
        let mut m = HttpMessage::new();
        let used = receive(&mut m, FIXED, &HttpConfig::default()).unwrap();
        assert_eq!(used, FIXED.len());
        assert_eq!(m.status(), 200);
        assert_eq!(m.content(), b"hello");
        assert_eq!(m.state(), ParseState::Finished);
        assert_eq!(m.content_length(), Some(5));
        assert_eq!(m.header("Content-Length"), Some("5"));
    }

    #[test]
    fn chunked_body() {
        let m = parse_all(CHUNKED).unwrap();
        assert_eq!(m.content(), b"hello");
        assert_eq!(m.state(), ParseState::Finished);
        assert_eq!(m.content_length(), None);
        assert!(m.chunked_content.is_empty());
    }

    #[test]
    fn chunks_are_appended() {
        let data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
3\r\nabc\r\nA\r\n0123456789\r\n0\r\n\r\n";
        let m = parse_all(data).unwrap();
        assert_eq!(m.content(), b"abc0123456789");
    }

    #[test]
    fn split_at_every_boundary_matches_one_shot() {
        let config = HttpConfig::default();
        for input in [FIXED, CHUNKED] {
            let whole = parse_all(input).unwrap();
            for cut in 1..input.len() {
                let mut m = HttpMessage::new();
                let a = receive(&mut m, &input[..cut], &config).unwrap();
                let b = receive(&mut m, &input[cut..], &config).unwrap();
                assert_eq!(a + b, input.len(), "cut at {}", cut);
                assert_eq!(m, whole, "cut at {}", cut);
            }
        }
    }

    #[test]
    fn byte_at_a_time() {
        let config = HttpConfig::default();
        let mut m = HttpMessage::new();
        for b in CHUNKED.chunks(1) {
            receive(&mut m, b, &config).unwrap();
        }
        assert_eq!(m, parse_all(CHUNKED).unwrap());
    }

    #[test]
    fn state_moves_forward_through_phases() {
        let config = HttpConfig::default();
        let mut m = HttpMessage::new();
        receive(&mut m, b"HTTP/1.1 20", &config).unwrap();
        assert_eq!(m.state(), ParseState::Init);
        receive(&mut m, b"0 OK\r\nContent-", &config).unwrap();
        assert_eq!(m.state(), ParseState::Header);
        assert_eq!(m.status(), 200);
        receive(&mut m, b"Length: 5\r\n\r\nhe", &config).unwrap();
        assert_eq!(m.state(), ParseState::Content);
        receive(&mut m, b"llo", &config).unwrap();
        assert_eq!(m.state(), ParseState::Finished);
    }

    #[test]
    fn surplus_after_fixed_body_is_not_consumed() {
        let mut data = FIXED.to_vec();
        data.extend_from_slice(b"HTTP/1.1 404");
        let mut m = HttpMessage::new();
        let used = receive(&mut m, &data, &HttpConfig::default()).unwrap();
        assert_eq!(used, FIXED.len());
        assert_eq!(m.content(), b"hello");
        assert_eq!(receive(&mut m, b"more", &HttpConfig::default()).unwrap(), 0);
    }

    #[test]
    fn surplus_after_chunked_body_is_not_consumed() {
        let mut data = CHUNKED.to_vec();
        data.extend_from_slice(b"extra");
        let mut m = HttpMessage::new();
        let used = receive(&mut m, &data, &HttpConfig::default()).unwrap();
        assert_eq!(used, CHUNKED.len());
        assert_eq!(m.content(), b"hello");
    }

    #[test]
    fn malformed_chunk_size_fails_immediately() {
        let mut m = HttpMessage::new();
        let data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nxyz\r\n";
        match receive(&mut m, data, &HttpConfig::default()) {
            Err(HttpError::MalformedChunk(_)) => {}
            other => panic!("expected MalformedChunk, got {:?}", other),
        }
        // without the CRLF as well: no waiting for more bytes
        let mut m = HttpMessage::new();
        let data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nx";
        assert!(matches!(
            receive(&mut m, data, &HttpConfig::default()),
            Err(HttpError::MalformedChunk(_))
        ));
        assert_eq!(m.state(), ParseState::Content);
    }

    #[test]
    fn missing_crlf_after_chunk_data() {
        let data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nabXY";
        assert!(matches!(parse_all(data), Err(HttpError::MalformedChunk(_))));
    }

    #[test]
    fn chunk_extensions_and_trailers_are_ignored() {
        let data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
5;name=value\r\nhello\r\n0\r\nExpires: never\r\n\r\n";
        let m = parse_all(data).unwrap();
        assert_eq!(m.content(), b"hello");
        assert!(m.is_finished());
        assert_eq!(m.header("Expires"), None);
    }

    #[test]
    fn malformed_status_line() {
        assert!(matches!(parse_all(b"HTTX/1.1 200 OK\r\n"), Err(HttpError::MalformedStatus(_))));
        assert!(matches!(parse_all(b"HTTP/1.1 2x0 OK\r\n"), Err(HttpError::MalformedStatus(_))));
        assert!(matches!(parse_all(b"HTTP/one 200 OK\r\n"), Err(HttpError::MalformedStatus(_))));
        // rejected before the line is even complete
        assert!(matches!(parse_all(b"<html>"), Err(HttpError::MalformedStatus(_))));
    }

    #[test]
    fn status_line_without_reason() {
        let m = parse_all(b"HTTP/1.0 404\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(m.status(), 404);
        assert!(m.is_finished());
    }

    #[test]
    fn malformed_header_line() {
        let data = b"HTTP/1.1 200 OK\r\nNoColonHere\r\n\r\n";
        assert!(matches!(parse_all(data), Err(HttpError::MalformedHeader(_))));
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: five\r\n\r\n";
        assert!(matches!(parse_all(data), Err(HttpError::MalformedHeader(_))));
    }

    #[test]
    fn headers_are_trimmed_and_last_write_wins() {
        let data = b"HTTP/1.1 200 OK\r\nX-Rate:  10 \r\nServer:a:b\r\nX-Rate: 9\r\nContent-Length: 0\r\n\r\n";
        let m = parse_all(data).unwrap();
        assert_eq!(m.header("X-Rate"), Some("9"));
        assert_eq!(m.header("Server"), Some("a:b"));
    }

    #[test]
    fn not_modified_has_no_body() {
        let m = parse_all(b"HTTP/1.1 304 Not Modified\r\nContent-Length: 120\r\n\r\n").unwrap();
        assert_eq!(m.status(), status::NOT_MODIFIED);
        assert!(m.is_finished());
        assert!(m.content().is_empty());
    }

    #[test]
    fn body_until_close() {
        let config = HttpConfig::default();
        let mut m = HttpMessage::new();
        receive(&mut m, b"HTTP/1.0 200 OK\r\n\r\nsome ", &config).unwrap();
        receive(&mut m, b"text", &config).unwrap();
        assert_eq!(m.state(), ParseState::Content);
        receive_eof(&mut m).unwrap();
        assert!(m.is_finished());
        assert_eq!(m.content(), b"some text");
        assert_eq!(m.content_length(), Some(9));
    }

    #[test]
    fn early_close_is_an_error() {
        let mut m = HttpMessage::new();
        receive(&mut m, b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc", &HttpConfig::default()).unwrap();
        assert!(matches!(receive_eof(&mut m), Err(HttpError::ConnectionClosed)));
        // partial state stays inspectable
        assert_eq!(m.content(), b"abc");
        assert_eq!(m.state(), ParseState::Content);
    }

    #[test]
    fn overflow_in_headers_and_body() {
        let config = HttpConfig::default().with_max_message_size(16);
        let mut m = HttpMessage::new();
        assert!(matches!(
            receive(&mut m, b"HTTP/1.1 200 OK\r\nServer: something long\r\n", &config),
            Err(HttpError::Overflow { limit: 16 })
        ));
        let config = HttpConfig::default().with_max_message_size(40);
        let mut m = HttpMessage::new();
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 41\r\n\r\n";
        assert!(matches!(receive(&mut m, data, &config), Err(HttpError::Overflow { .. })));
        let config = HttpConfig::default().with_max_message_size(50);
        let mut m = HttpMessage::new();
        let data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nFF\r\n";
        assert!(matches!(receive(&mut m, data, &config), Err(HttpError::Overflow { limit: 50 })));
        let mut m = HttpMessage::new();
        let complete_lines = b"HTTP/1.1 200 OK\r\nA: 1\r\nB: 2\r\nC: 3\r\nD: 4\r\nE: 5\r\n\r\n";
        assert!(matches!(
            receive(&mut m, complete_lines, &config),
            Err(HttpError::Overflow { limit: 50 })
        ));
    }

    #[test]
    fn huge_chunk_size_after_content_is_overflow() {
        let mut data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n".to_vec();
        data.extend_from_slice(format!("{:X}\r\n", usize::MAX).as_bytes());
        let mut m = HttpMessage::new();
        assert!(matches!(
            receive(&mut m, &data, &HttpConfig::default()),
            Err(HttpError::Overflow { .. })
        ));
        assert_eq!(m.content(), b"hello");
        assert_eq!(m.chunk_phase, ChunkPhase::Size);

        let mut m = HttpMessage::new();
        let mut data = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n1\r\na\r\n".to_vec();
        data.extend_from_slice(format!("{:X}\r\n", usize::MAX - 2).as_bytes());
        assert!(matches!(
            receive(&mut m, &data, &HttpConfig::default()),
            Err(HttpError::Overflow { .. })
        ));
    }

    #[test]
    fn limit_covers_headers_and_content_together() {
        let config = HttpConfig::default().with_max_message_size(50);

        // 39 header bytes + 20 content bytes
        let mut m = HttpMessage::new();
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 20\r\n\r\n";
        assert!(matches!(receive(&mut m, data, &config), Err(HttpError::Overflow { limit: 50 })));
        let mut m = HttpMessage::new();
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world";
        assert_eq!(receive(&mut m, data, &config).unwrap(), data.len());
        assert!(m.is_finished());

        // 19 header bytes, body until close
        let mut m = HttpMessage::new();
        receive(&mut m, b"HTTP/1.0 200 OK\r\n\r\n", &config).unwrap();
        receive(&mut m, &[b'x'; 31], &config).unwrap();
        assert!(matches!(receive(&mut m, b"y", &config), Err(HttpError::Overflow { limit: 50 })));

        // 47 header bytes, chunked
        let head = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
        let mut m = HttpMessage::new();
        receive(&mut m, head, &config).unwrap();
        assert!(matches!(receive(&mut m, b"4\r\n", &config), Err(HttpError::Overflow { limit: 50 })));
        let mut m = HttpMessage::new();
        receive(&mut m, head, &config).unwrap();
        receive(&mut m, b"3\r\nabc\r\n0\r\n\r\n", &config).unwrap();
        assert_eq!(m.content(), b"abc");
        assert!(m.is_finished());
    }

    #[test]
    fn read_to_end_over_partial_reads() {
        let mut transport = ScriptedTransport::new(vec![
            b"HTTP/1.1 200 OK\r\nTransfer-".to_vec(),
            b"Encoding: chunked\r\n\r\n5\r\nhel".to_vec(),
            b"lo\r\n0\r".to_vec(),
            b"\n\r\n".to_vec(),
        ]);
        let mut m = HttpMessage::new();
        read_to_end(&mut transport, &mut m, &HttpConfig::default()).unwrap();
        assert_eq!(m.content(), b"hello");
        assert_eq!(m.status(), 200);
    }

    #[test]
    fn read_message_steps_and_reports_close() {
        let mut transport = ScriptedTransport::new(vec![b"HTTP/1.1 200 OK\r\n".to_vec()]);
        let config = HttpConfig::default();
        let mut m = HttpMessage::new();
        assert_eq!(read_message(&mut transport, &mut m, &config).unwrap(), ParseState::Header);
        assert!(matches!(
            read_message(&mut transport, &mut m, &config),
            Err(HttpError::ConnectionClosed)
        ));
    }

    #[test]
    fn read_passes_transport_errors_through() {
        let mut transport = ScriptedTransport::new(vec![]).fail_reads();
        let mut m = HttpMessage::new();
        match read_to_end(&mut transport, &mut m, &HttpConfig::default()) {
            Err(HttpError::Transport(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
