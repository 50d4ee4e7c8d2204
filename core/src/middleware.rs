//! Pre-request and post-response stages.
//!
//! Built-in stages and user hooks implement the same traits and live in the
//! same ordered lists on the `Client`. A chain stops at the first stage that
//! returns an error.

use std::sync::Arc;

use crate::client::Client;
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use crate::{assemble, response};

/// A stage that runs before the request is sent.
pub trait RequestMiddleware: Send + Sync {
    fn apply(&self, client: &Client, request: &mut Request<'_>) -> Result<()>;
}

impl<F> RequestMiddleware for F
where
    F: Fn(&Client, &mut Request<'_>) -> Result<()> + Send + Sync,
{
    fn apply(&self, client: &Client, request: &mut Request<'_>) -> Result<()> {
        self(client, request)
    }
}

/// A stage that runs after the response is received.
pub trait ResponseMiddleware: Send + Sync {
    fn apply(&self, client: &Client, response: &mut Response) -> Result<()>;
}

impl<F> ResponseMiddleware for F
where
    F: Fn(&Client, &mut Response) -> Result<()> + Send + Sync,
{
    fn apply(&self, client: &Client, response: &mut Response) -> Result<()> {
        self(client, response)
    }
}

pub(crate) type RequestChain = Vec<Arc<dyn RequestMiddleware>>;
pub(crate) type ResponseChain = Vec<Arc<dyn ResponseMiddleware>>;

pub(crate) fn builtin_request_chain() -> RequestChain {
    vec![
        Arc::new(assemble::parse_request_url),
        Arc::new(assemble::parse_request_header),
        Arc::new(assemble::parse_request_body),
        Arc::new(assemble::create_http_request),
        Arc::new(assemble::add_credentials),
        Arc::new(assemble::request_logger),
    ]
}

pub(crate) fn builtin_response_chain() -> ResponseChain {
    vec![
        Arc::new(response::response_logger),
        Arc::new(response::parse_response_body),
    ]
}

pub(crate) fn run_request_chain(
    chain: &[Arc<dyn RequestMiddleware>],
    client: &Client,
    request: &mut Request<'_>,
) -> Result<()> {
    for stage in chain {
        stage.apply(client, request)?;
    }
    Ok(())
}

pub(crate) fn run_response_chain(
    chain: &[Arc<dyn ResponseMiddleware>],
    client: &Client,
    response: &mut Response,
) -> Result<()> {
    for stage in chain {
        stage.apply(client, response)?;
    }
    Ok(())
}
