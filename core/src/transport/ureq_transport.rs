//! Ureq-based transport (blocking).
//!
//! The agent is configured to return every status as data and never follow
//! redirects, so the pipeline sees each hop. Agents are cached per
//! `TransportOptions` and rebuilt when the client's settings change.

use std::io::Read as _;
use std::sync::Mutex;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError, TransportOptions};

/// A [`Transport`] backed by [`ureq`].
#[derive(Debug, Default)]
pub struct UreqTransport {
    agent: Mutex<Option<(TransportOptions, ureq::Agent)>>,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn agent(&self, options: &TransportOptions) -> Result<ureq::Agent, TransportError> {
        let mut cached = self
            .agent
            .lock()
            .map_err(|_| TransportError::Other("agent cache poisoned".to_owned()))?;
        if let Some((built_for, agent)) = cached.as_ref() {
            if built_for == options {
                return Ok(agent.clone());
            }
        }
        let agent = build_agent(options)?;
        *cached = Some((options.clone(), agent.clone()));
        Ok(agent)
    }
}

fn build_agent(options: &TransportOptions) -> Result<ureq::Agent, TransportError> {
    let mut config = ureq::Agent::config_builder()
        // Status codes and redirects are interpreted by the pipeline.
        .http_status_as_error(false)
        .max_redirects(0)
        .max_redirects_will_error(false)
        .timeout_global(options.timeout);

    if let Some(proxy) = &options.proxy {
        let proxy = ureq::Proxy::new(proxy.as_str())
            .map_err(|e| TransportError::Other(format!("invalid proxy: {e}")))?;
        config = config.proxy(Some(proxy));
    }
    if options.insecure_skip_verify {
        config = config.tls_config(
            ureq::tls::TlsConfig::builder()
                .disable_verification(true)
                .build(),
        );
    }

    Ok(config.build().new_agent())
}

fn to_http_method(method: HttpMethod) -> http::Method {
    match method {
        HttpMethod::Get => http::Method::GET,
        HttpMethod::Post => http::Method::POST,
        HttpMethod::Put => http::Method::PUT,
        HttpMethod::Delete => http::Method::DELETE,
        HttpMethod::Patch => http::Method::PATCH,
        HttpMethod::Head => http::Method::HEAD,
        HttpMethod::Options => http::Method::OPTIONS,
    }
}

impl Transport for UreqTransport {
    fn send(
        &self,
        request: &HttpRequest,
        options: &TransportOptions,
    ) -> Result<HttpResponse, TransportError> {
        let agent = self.agent(options)?;

        let mut builder = http::Request::builder()
            .method(to_http_method(request.method))
            .uri(request.url.as_str());
        // ureq frames sized bodies itself; a second Content-Length would clash.
        for (name, value) in request.headers.iter() {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            builder = builder.header(name, value);
        }

        // Body verbs always carry a sized body so an empty one still goes
        // out with `Content-Length: 0`.
        let body = match &request.body {
            Some(body) => Some(body.clone()),
            None if request.method.allows_body() => Some(Vec::new()),
            None => None,
        };
        let result = match body {
            Some(body) => {
                let req = builder
                    .body(body)
                    .map_err(|e| TransportError::Other(e.to_string()))?;
                agent.run(req)
            }
            None => {
                let req = builder
                    .body(())
                    .map_err(|e| TransportError::Other(e.to_string()))?;
                agent.run(req)
            }
        };

        match result {
            Ok(resp) => convert_response(resp),
            Err(ureq::Error::Timeout(_)) => Err(TransportError::Timeout),
            Err(ureq::Error::HostNotFound) => {
                Err(TransportError::Connection("host not found".to_owned()))
            }
            Err(ureq::Error::Io(e)) => Err(TransportError::Connection(e.to_string())),
            Err(e) => Err(TransportError::Other(e.to_string())),
        }
    }
}

/// Convert a ureq `http::Response<Body>` into our [`HttpResponse`].
fn convert_response(response: http::Response<ureq::Body>) -> Result<HttpResponse, TransportError> {
    let (parts, body) = response.into_parts();

    let mut bytes = Vec::new();
    body.into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    Ok(HttpResponse {
        status: parts.status.as_u16(),
        headers: parts.headers,
        body: bytes,
    })
}
