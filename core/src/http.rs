//! Wire-level HTTP types exchanged with the transport.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! pipeline builds an `HttpRequest` and hands it to a `Transport`, which
//! performs the actual I/O and returns an `HttpResponse`. Keeping them as
//! data lets the redirect policy and the middleware stages be tested without
//! a network.

use std::fmt;

use http::HeaderMap;
use url::Url;

use crate::params::Params;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Only POST, PUT and PATCH send a request body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    /// Multipart uploads follow the same verb set as bodies.
    pub fn allows_multipart(&self) -> bool {
        self.allows_body()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data, ready for a `Transport`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Params,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Path plus query, as written on the request line.
    pub fn request_uri(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{q}", self.url.path()),
            None => self.url.path().to_string(),
        }
    }

    /// `host[:port]` of the target URL.
    pub fn host(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

/// An HTTP response described as plain data, as returned by a `Transport`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// A cookie sent with every request of a client.
///
/// Only `name=value` goes on the wire; the remaining attributes describe the
/// cookie for callers that manage a jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// `name=value` as it appears in a `Cookie` header. Octets browsers would
    /// reject are dropped; values with a space or comma are quoted.
    pub fn pair(&self) -> String {
        let value: String = self
            .value
            .chars()
            .filter(|&c| c.is_ascii() && (' '..='~').contains(&c) && !matches!(c, '"' | ';' | '\\'))
            .collect();
        if value.contains(' ') || value.contains(',') {
            format!("{}=\"{value}\"", self.name)
        } else {
            format!("{}={value}", self.name)
        }
    }
}

/// Render `cookies` as a single `Cookie` header value.
pub(crate) fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(cookies.iter().map(Cookie::pair).collect::<Vec<_>>().join("; "))
}
