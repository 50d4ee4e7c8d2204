//! Error types for the request pipeline.
//!
//! # Design
//! Every failure of a call is reported through one `Error` enum so callers
//! can match on the kind. Two kinds are raised after the response already
//! exists (`Decoding`, and `Middleware` from a post-response stage); those
//! carry the populated `Response` so the caller still sees what the server
//! sent.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpMethod;
use crate::response::Response;
use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by a call, a pipeline stage, or client configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// The host URL or request URL could not be parsed.
    #[error("malformed url '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// The body value cannot be encoded under the request's content type.
    #[error("unsupported body type: {0}")]
    UnsupportedBodyType(String),

    /// File attachments were requested on a verb that carries no body.
    #[error("multipart content is not allowed in HTTP verb [{0}]")]
    MultipartNotAllowed(HttpMethod),

    /// A file referenced by an `@` form field could not be read.
    #[error("unable to attach file '{}': {source}", path.display())]
    FileAttachment {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A structured body value failed to serialize.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// The response body could not be decoded into the result or error type.
    #[error("decoding failed: {reason}")]
    Decoding {
        reason: String,
        response: Option<Box<Response>>,
    },

    /// A redirect policy refused to follow a hop.
    #[error("{method} {path}: {reason}")]
    RedirectRejected {
        method: HttpMethod,
        path: String,
        reason: String,
    },

    /// The transport failed to deliver the request or read the response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A middleware stage aborted the call.
    #[error("middleware failed: {reason}")]
    Middleware {
        reason: String,
        response: Option<Box<Response>>,
    },

    /// Client configuration could not be loaded.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl Error {
    /// Build the error a user middleware returns to abort the call.
    pub fn middleware(reason: impl Into<String>) -> Self {
        Error::Middleware {
            reason: reason.into(),
            response: None,
        }
    }

    pub(crate) fn decoding(reason: impl Into<String>) -> Self {
        Error::Decoding {
            reason: reason.into(),
            response: None,
        }
    }

    pub(crate) fn malformed_url(url: &str, reason: impl ToString) -> Self {
        Error::MalformedUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The response that was received before the error was raised, if any.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Decoding { response, .. } | Error::Middleware { response, .. } => {
                response.as_deref()
            }
            _ => None,
        }
    }

    /// Take ownership of the attached response, if any.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Error::Decoding { response, .. } | Error::Middleware { response, .. } => {
                response.map(|r| *r)
            }
            _ => None,
        }
    }

    /// Attach `response` to the kinds that can carry one; other kinds are
    /// returned unchanged and the response is dropped.
    pub(crate) fn with_response(self, response: Response) -> Self {
        match self {
            Error::Decoding { reason, .. } => Error::Decoding {
                reason,
                response: Some(Box::new(response)),
            },
            Error::Middleware { reason, .. } => Error::Middleware {
                reason,
                response: Some(Box::new(response)),
            },
            other => other,
        }
    }
}
