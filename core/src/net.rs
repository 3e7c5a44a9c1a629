/*
 * net.rs
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

//! Byte-stream transports: plain TCP or TCP wrapped with rustls.
//!
//! Both satisfy `Transport`, so the parser and writer never know which one they drive. The
//! choice is made once, when the connection is set up. Timeouts are socket options taken from
//! `HttpConfig`; the engine itself never times out.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, OnceLock};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::config::HttpConfig;
use crate::uri::Scheme;

/// Blocking byte stream. Either call may move fewer bytes than asked for.
pub trait Transport {
    /// Read into `buf`. Ok(0) means the peer closed the stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write some prefix of `buf`; returns how much was taken.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }
}

/// Build a root certificate store: platform native certs first, then webpki-roots as fallback.
fn build_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            for cert in certs {
                let _ = root_store.add(cert);
            }
        }
        Err(e) => tracing::debug!(error = %e, "native certificates unavailable"),
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    root_store
}

static CLIENT_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

/// TLS client config (native + Mozilla roots, no client auth, HTTP/1.1 only), built once.
fn tls_client_config() -> Arc<ClientConfig> {
    CLIENT_CONFIG
        .get_or_init(|| {
            let mut config = ClientConfig::builder()
                .with_root_certificates(build_root_store())
                .with_no_client_auth();
            config.alpn_protocols = vec![b"http/1.1".to_vec()];
            Arc::new(config)
        })
        .clone()
}

/// Host as resolvers and certificate checks want it: IPv6 literals without their URL brackets.
fn socket_host(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// TCP connect to the first reachable address, with the configured timeouts applied.
fn tcp_connect(host: &str, port: u16, config: &HttpConfig) -> io::Result<TcpStream> {
    let addrs = (socket_host(host), port).to_socket_addrs()?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, config.connect_timeout) {
            Ok(tcp) => {
                apply_timeouts(&tcp, config)?;
                tcp.set_nodelay(true)?;
                return Ok(tcp);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("no address for {}", host))
    }))
}

fn apply_timeouts(tcp: &TcpStream, config: &HttpConfig) -> io::Result<()> {
    tcp.set_read_timeout(config.io_timeout)?;
    tcp.set_write_timeout(config.io_timeout)
}

/// Plain TCP transport.
pub struct PlainTransport {
    inner: TcpStream,
}

impl PlainTransport {
    pub fn connect(host: &str, port: u16, config: &HttpConfig) -> io::Result<Self> {
        let tcp = tcp_connect(host, port, config)?;
        Ok(Self { inner: tcp })
    }

    /// Wrap an already connected stream, applying the configured timeouts.
    pub fn from_stream(tcp: TcpStream, config: &HttpConfig) -> io::Result<Self> {
        apply_timeouts(&tcp, config)?;
        Ok(Self { inner: tcp })
    }

    /// Upgrade this plain stream to TLS. Consumes `self`; the handshake runs on first use.
    pub fn upgrade_to_tls(self, host: &str) -> io::Result<TlsTransport> {
        TlsTransport::over(self.inner, host)
    }
}

impl Transport for PlainTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }
}

/// TLS transport (rustls client session over TCP). Session state stays inside.
pub struct TlsTransport {
    inner: StreamOwned<ClientConnection, TcpStream>,
}

impl TlsTransport {
    pub fn connect(host: &str, port: u16, config: &HttpConfig) -> io::Result<Self> {
        let tcp = tcp_connect(host, port, config)?;
        Self::over(tcp, host)
    }

    fn over(tcp: TcpStream, host: &str) -> io::Result<Self> {
        let server_name = ServerName::try_from(socket_host(host))
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?
            .to_owned();
        let session = ClientConnection::new(tls_client_config(), server_name)
            .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
        Ok(Self {
            inner: StreamOwned::new(session, tcp),
        })
    }
}

impl Transport for TlsTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            // servers that send "Connection: close" often skip close_notify
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                tracing::debug!("TLS peer closed without close_notify");
                Ok(0)
            }
            other => other,
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.inner.flush()?;
        Ok(n)
    }
}

/// Connect plain or secure according to `scheme`.
pub fn connect(host: &str, port: u16, scheme: Scheme, config: &HttpConfig) -> io::Result<Box<dyn Transport>> {
    tracing::debug!(host, port, secure = scheme.is_secure(), "connecting");
    match scheme {
        Scheme::Plain => Ok(Box::new(PlainTransport::connect(host, port, config)?)),
        Scheme::Secure => Ok(Box::new(TlsTransport::connect(host, port, config)?)),
        Scheme::Unknown => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "unknown URL scheme",
        )),
    }
}
