//! Redirect handling.
//!
//! The transport never follows redirects on its own. After every 3xx
//! response carrying a `Location`, the client builds the next hop and asks
//! each configured policy whether it may be followed. Any rejection ends the
//! call with `Error::RedirectRejected`.

use std::collections::HashSet;
use std::sync::Arc;

use http::header::LOCATION;

use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Hop limit applied when no policy is configured.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Decides whether the hop to `next` may be followed.
///
/// `via` holds every request already sent in this call, oldest first, so
/// `via.len()` is the number of the hop being considered.
pub trait RedirectPolicy: Send + Sync {
    fn apply(&self, next: &HttpRequest, via: &[HttpRequest]) -> std::result::Result<(), String>;
}

impl<F> RedirectPolicy for F
where
    F: Fn(&HttpRequest, &[HttpRequest]) -> std::result::Result<(), String> + Send + Sync,
{
    fn apply(&self, next: &HttpRequest, via: &[HttpRequest]) -> std::result::Result<(), String> {
        self(next, via)
    }
}

/// Refuses every redirect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRedirect;

impl RedirectPolicy for NoRedirect {
    fn apply(&self, _next: &HttpRequest, _via: &[HttpRequest]) -> std::result::Result<(), String> {
        Err("auto redirect is disabled".to_string())
    }
}

/// Follows at most `max_hops` redirects.
#[derive(Debug, Clone, Copy)]
pub struct FlexibleRedirect {
    max_hops: usize,
}

impl FlexibleRedirect {
    pub fn new(max_hops: usize) -> Self {
        Self { max_hops }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }
}

impl Default for FlexibleRedirect {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REDIRECTS)
    }
}

impl RedirectPolicy for FlexibleRedirect {
    fn apply(&self, _next: &HttpRequest, via: &[HttpRequest]) -> std::result::Result<(), String> {
        if via.len() > self.max_hops {
            return Err(format!("stopped after {} redirects", self.max_hops));
        }
        Ok(())
    }
}

/// Only follows redirects whose target host is in the allowed set.
#[derive(Debug, Clone)]
pub struct DomainCheckRedirect {
    hosts: HashSet<String>,
}

impl DomainCheckRedirect {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl RedirectPolicy for DomainCheckRedirect {
    fn apply(&self, next: &HttpRequest, _via: &[HttpRequest]) -> std::result::Result<(), String> {
        let host = next.url.host_str().unwrap_or_default().to_ascii_lowercase();
        if self.hosts.contains(&host) {
            Ok(())
        } else {
            Err(format!("redirect to host '{host}' is not allowed"))
        }
    }
}

/// Run every policy against the proposed hop. An empty list falls back to
/// `FlexibleRedirect::default()`.
pub(crate) fn check(
    policies: &[Arc<dyn RedirectPolicy>],
    next: &HttpRequest,
    via: &[HttpRequest],
) -> Result<()> {
    let reject = |reason: String| Error::RedirectRejected {
        method: next.method,
        path: next.url.path().to_string(),
        reason,
    };

    if policies.is_empty() {
        return FlexibleRedirect::default().apply(next, via).map_err(reject);
    }
    for policy in policies {
        policy.apply(next, via).map_err(reject)?;
    }
    Ok(())
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// The request to send next if `response` redirects, `None` otherwise.
///
/// 301, 302 and 303 turn the hop into a body-less GET (HEAD stays HEAD);
/// 307 and 308 repeat the method and body. Credentials and cookies are not
/// carried to a different host.
pub(crate) fn next_hop(current: &HttpRequest, response: &HttpResponse) -> Result<Option<HttpRequest>> {
    if !is_redirect(response.status) {
        return Ok(None);
    }
    let Some(location) = response
        .headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    let url = current
        .url
        .join(location)
        .map_err(|e| Error::malformed_url(location, e))?;

    let keep_method = matches!(response.status, 307 | 308)
        || matches!(current.method, HttpMethod::Get | HttpMethod::Head);
    let (method, body) = if keep_method {
        (current.method, current.body.clone())
    } else {
        (HttpMethod::Get, None)
    };

    let mut headers = current.headers.clone();
    if body.is_none() {
        headers.remove("Content-Type");
        headers.remove("Content-Length");
    }
    if url.host_str() != current.url.host_str() {
        for sensitive in ["Authorization", "Cookie", "Proxy-Authorization", "WWW-Authenticate"] {
            headers.remove(sensitive);
        }
    }

    Ok(Some(HttpRequest {
        method,
        url,
        headers,
        body,
    }))
}
