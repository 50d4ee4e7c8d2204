//! Synchronous REST client pipeline.
//!
//! # Overview
//! A `Client` holds shared configuration; each call is described by a
//! `Request` and turned into a wire-level `HttpRequest` by an ordered chain
//! of pre-request stages. A `Transport` performs the exchange, redirects are
//! followed as the configured policies allow, and post-response stages
//! decode JSON or XML bodies into caller-chosen result and error types.
//!
//! # Design
//! - Built-in stages and user hooks share one middleware interface and one
//!   ordered list per direction.
//! - Request bodies are a closed `Body` enum; structured values are
//!   serialized when attached and encoded for the final content type.
//! - Socket I/O sits behind the `Transport` trait. The default `ureq`
//!   transport never follows redirects itself so the pipeline sees every
//!   hop.
//! - No process-wide default client; callers construct their own.

pub mod assemble;
pub mod client;
pub mod codec;
pub mod config;
pub mod content;
pub mod error;
pub mod form;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod params;
pub mod redirect;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{BasicAuth, Client, Mode};
pub use codec::{Body, Target};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use http::{Cookie, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{LogCrateSink, LogSink};
pub use middleware::{RequestMiddleware, ResponseMiddleware};
pub use params::Params;
pub use redirect::{DomainCheckRedirect, FlexibleRedirect, NoRedirect, RedirectPolicy};
pub use request::Request;
pub use response::Response;
pub use transport::{Transport, TransportError, TransportOptions};

#[cfg(feature = "ureq-transport")]
pub use transport::UreqTransport;
