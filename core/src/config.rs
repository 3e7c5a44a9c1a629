/*
 * config.rs
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

//! HTTP engine configuration: limits and timeouts passed explicitly to the parser, writer and
//! transports. Persisted as XML in ~/.microblog/config.xml, read and written with quick_xml:
//!
//! ```xml
//! <microblog>
//!   <http>
//!     <max-message-size>4194304</max-message-size>
//!     <read-chunk-size>10240</read-chunk-size>
//!     <connect-timeout>15</connect-timeout>
//!     <io-timeout>30</io-timeout>
//!     <retries>0</retries>
//!   </http>
//! </microblog>
//! ```
//!
//! Timeouts are in seconds; an io-timeout of 0 means block indefinitely.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

/// Default upper bound for one message (header block plus body).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
/// Bytes requested from the transport per read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 10240;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("config XML error: {0}")]
    Xml(String),
    #[error("invalid value for <{element}>: {value}")]
    InvalidValue { element: String, value: String },
}

/// Limits and timeouts for one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub max_message_size: usize,
    pub read_chunk_size: usize,
    pub connect_timeout: Duration,
    /// Socket read/write timeout; None blocks indefinitely.
    pub io_timeout: Option<Duration>,
    /// Extra attempts made by `HttpClient::fetch` after a transport failure.
    pub retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
            retries: 0,
        }
    }
}

impl HttpConfig {
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Default config directory: ~/.microblog.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join(".microblog"))
}

/// Default config file: ~/.microblog/config.xml.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("config.xml"))
}

/// Load the config file. A missing file yields defaults; missing elements keep their defaults
/// and unknown elements are ignored.
pub fn load_config(path: &Path) -> Result<HttpConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HttpConfig::default()),
        Err(e) => return Err(e.into()),
    };
    parse_config_xml(&content)
}

fn parse_config_xml(content: &str) -> Result<HttpConfig, ConfigError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut config = HttpConfig::default();
    let mut in_http = false;
    let mut element_name = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(ConfigError::Xml(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name == b"http" {
                    in_http = true;
                } else if in_http {
                    element_name = String::from_utf8_lossy(name).into_owned();
                }
            }
            Ok(Event::Text(e)) => {
                if !in_http || element_name.is_empty() {
                    continue;
                }
                let text = e.unescape().map_err(|e| ConfigError::Xml(e.to_string()))?;
                apply_setting(&mut config, &element_name, text.trim())?;
                element_name.clear();
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"http" {
                    in_http = false;
                }
                element_name.clear();
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(config)
}

fn apply_setting(config: &mut HttpConfig, element: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        element: element.to_string(),
        value: value.to_string(),
    };
    match element {
        "max-message-size" => config.max_message_size = value.parse().map_err(|_| invalid())?,
        "read-chunk-size" => {
            let n: usize = value.parse().map_err(|_| invalid())?;
            if n == 0 {
                return Err(invalid());
            }
            config.read_chunk_size = n;
        }
        "connect-timeout" => {
            config.connect_timeout = Duration::from_secs(value.parse().map_err(|_| invalid())?)
        }
        "io-timeout" => {
            let secs: u64 = value.parse().map_err(|_| invalid())?;
            config.io_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        "retries" => config.retries = value.parse().map_err(|_| invalid())?,
        _ => {}
    }
    Ok(())
}

/// Write the config file, creating its directory if needed.
pub fn save_config(path: &Path, config: &HttpConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = config_xml_to_bytes(config)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn xml_err<E: std::fmt::Display>(e: E) -> ConfigError {
    ConfigError::Xml(e.to_string())
}

fn config_xml_to_bytes(config: &HttpConfig) -> Result<Vec<u8>, ConfigError> {
    let mut out = Vec::new();
    let mut writer = Writer::new_with_indent(&mut out, b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("microblog")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("http")))
        .map_err(xml_err)?;
    let io_timeout = config.io_timeout.map(|d| d.as_secs()).unwrap_or(0);
    let settings = [
        ("max-message-size", config.max_message_size.to_string()),
        ("read-chunk-size", config.read_chunk_size.to_string()),
        ("connect-timeout", config.connect_timeout.as_secs().to_string()),
        ("io-timeout", io_timeout.to_string()),
        ("retries", config.retries.to_string()),
    ];
    for (name, value) in &settings {
        writer
            .write_event(Event::Start(BytesStart::new(*name)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::End(BytesEnd::new(*name)))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("http")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("microblog")))
        .map_err(xml_err)?;
    Ok(out)
}
