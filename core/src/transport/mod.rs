//! Transport abstraction for pluggable HTTP backends.
//!
//! A transport performs exactly one exchange: it sends the given request and
//! returns whatever the server answered, 3xx included. Redirects, status
//! interpretation and body decoding all happen in the pipeline.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::http::{HttpRequest, HttpResponse};

#[cfg(feature = "ureq-transport")]
mod ureq_transport;
#[cfg(feature = "ureq-transport")]
pub use ureq_transport::UreqTransport;

/// Connection settings a transport must honour for each exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Upper bound for the whole exchange; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub proxy: Option<Url>,
    /// Accept any server certificate.
    pub insecure_skip_verify: bool,
}

/// Failures reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Sends one wire request and returns the raw response.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &HttpRequest,
        options: &TransportOptions,
    ) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest, &TransportOptions) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn send(
        &self,
        request: &HttpRequest,
        options: &TransportOptions,
    ) -> Result<HttpResponse, TransportError> {
        self(request, options)
    }
}
