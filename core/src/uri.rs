/*
 * uri.rs
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

//! URL codec: split and join `scheme://host:port/path`, and form-encode request parameters
//! (`application/x-www-form-urlencoded`, space as `+`).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Form component safe set: everything but unreserved characters is escaped. Space is left
/// alone here and turned into `+` afterwards; a literal `+` is always escaped as `%2B`.
const FORM_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b' ');

/// Transport scheme of a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// `http`
    Plain,
    /// `https`
    Secure,
    /// Anything else, or no scheme at all.
    #[default]
    Unknown,
}

impl Scheme {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("http") {
            Scheme::Plain
        } else if name.eq_ignore_ascii_case("https") {
            Scheme::Secure
        } else {
            Scheme::Unknown
        }
    }

    /// Scheme name as rendered in a URL. Unknown renders empty.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Plain => "http",
            Scheme::Secure => "https",
            Scheme::Unknown => "",
        }
    }

    /// Conventional port; 0 when the scheme is unknown.
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Plain => 80,
            Scheme::Secure => 443,
            Scheme::Unknown => 0,
        }
    }

    pub fn is_secure(&self) -> bool {
        *self == Scheme::Secure
    }
}

/// The four parts of a message URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Split `scheme://host[:port]/path`. A missing port takes the scheme's conventional port,
/// a missing path becomes `/`. Query strings and fragments stay part of the path, even when
/// they follow the authority directly.
pub fn split_url(url: &str) -> UrlParts {
    let (scheme, rest) = match url.find("://") {
        Some(i) => (Scheme::from_name(&url[..i]), &url[i + 3..]),
        None => (Scheme::Unknown, url),
    };
    let (authority, path) = match rest.find(['/', '?', '#']) {
        Some(i) if rest[i..].starts_with('/') => (&rest[..i], rest[i..].to_string()),
        Some(i) => (&rest[..i], format!("/{}", &rest[i..])),
        None => (rest, "/".to_string()),
    };
    let (host, port) = split_authority(authority);
    let port = match port {
        Some(p) => match p.parse::<u16>() {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!(port = p, "unparsable port in URL, using scheme default");
                scheme.default_port()
            }
        },
        None => scheme.default_port(),
    };
    UrlParts {
        scheme,
        host: host.to_string(),
        port,
        path,
    }
}

/// Host and optional port text. Bracketed IPv6 literals keep their brackets.
fn split_authority(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        if let Some(end) = authority.find(']') {
            let host = &authority[..=end];
            let port = authority[end + 1..].strip_prefix(':').filter(|p| !p.is_empty());
            return (host, port);
        }
        return (authority, None);
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() => (host, Some(port)),
        Some((host, _)) => (host, None),
        None => (authority, None),
    }
}

/// Canonical `scheme://host:port/path`. The port is always written.
pub fn join_url(scheme: Scheme, host: &str, port: u16, path: &str) -> String {
    let slash = if path.starts_with('/') { "" } else { "/" };
    format!("{}://{}:{}{}{}", scheme.as_str(), host, port, slash, path)
}

/// Form-encode one key or value.
pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, FORM_COMPONENT)
        .to_string()
        .replace(' ', "+")
}

/// Join pairs as `k1=v1&k2=v2`, keeping their order.
pub fn encode_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut out = String::new();
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(&encode_component(key));
        out.push('=');
        out.push_str(&encode_component(value));
    }
    out
}
