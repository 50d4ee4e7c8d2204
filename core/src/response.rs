//! The result of one call, and the built-in post-response stages.

use std::any::Any;
use std::borrow::Cow;
use std::time::{Duration, SystemTime};

use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use log::Level;

use crate::client::Client;
use crate::codec::{Decoded, Target};
use crate::content::is_structured;
use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::logging;

/// A received response together with the request that produced it.
#[derive(Debug)]
pub struct Response {
    request: HttpRequest,
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    received_at: SystemTime,
    elapsed: Duration,
    pub(crate) result_target: Option<Target>,
    pub(crate) error_target: Option<Target>,
    result: Option<Decoded>,
    error: Option<Decoded>,
}

impl Response {
    pub(crate) fn new(request: HttpRequest, raw: HttpResponse, elapsed: Duration) -> Self {
        Self {
            request,
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            received_at: SystemTime::now(),
            elapsed,
            result_target: None,
            error_target: None,
            result: None,
            error: None,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Status line such as `"200 OK"`.
    pub fn status(&self) -> String {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason());
        match reason {
            Some(reason) => format!("{} {reason}", self.status),
            None => self.status.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as trimmed text.
    pub fn text(&self) -> Cow<'_, str> {
        match String::from_utf8_lossy(&self.body) {
            Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
            Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
        }
    }

    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    /// Time from handing the request to the transport until the final
    /// response arrived, redirects included.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The wire request as assembled for the first hop.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// The decoded success body, when a result type was requested.
    pub fn result<T: Any>(&self) -> Option<&T> {
        self.result.as_ref().and_then(|v| v.downcast_ref::<T>())
    }

    /// The decoded error body for a 4xx/5xx response.
    pub fn error<T: Any>(&self) -> Option<&T> {
        self.error.as_ref().and_then(|v| v.downcast_ref::<T>())
    }
}

pub(crate) fn response_logger(client: &Client, response: &mut Response) -> Result<()> {
    if client.is_debug() {
        client.log(Level::Info, &logging::response_block(response));
    }
    Ok(())
}

/// Decode JSON or XML bodies into the requested result or error type.
pub(crate) fn parse_response_body(client: &Client, response: &mut Response) -> Result<()> {
    let content_type = response
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !is_structured(&content_type) {
        return Ok(());
    }

    if response.is_success() {
        if let Some(target) = response.result_target {
            response.result = Some(target.decode(&content_type, &response.body)?);
        }
    }

    if response.is_error() {
        if let Some(target) = response.error_target.or(client.error_target()) {
            response.error = Some(target.decode(&content_type, &response.body)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde::Deserialize;
    use url::Url;

    use super::*;
    use crate::error::Error;
    use crate::http::HttpMethod;
    use crate::params::Params;

    #[derive(Debug, Deserialize, PartialEq)]
    struct AuthSuccess {
        id: String,
        message: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct AuthError {
        id: String,
        message: String,
    }

    fn response(status: u16, content_type: &str, body: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        let request = HttpRequest {
            method: HttpMethod::Post,
            url: Url::parse("http://localhost/login").unwrap(),
            headers: Params::new(),
            body: None,
        };
        let raw = HttpResponse {
            status,
            headers,
            body: body.as_bytes().to_vec(),
        };
        Response::new(request, raw, Duration::from_millis(5))
    }

    fn client() -> Client {
        Client::with_transport(|_: &HttpRequest, _: &crate::transport::TransportOptions| {
            Err::<HttpResponse, _>(crate::transport::TransportError::Other("offline".to_string()))
        })
    }

    #[test]
    fn status_line_and_text() {
        let resp = response(200, "text/plain", "  TestGet: text response \n");
        assert_eq!(resp.status(), "200 OK");
        assert_eq!(resp.text(), "TestGet: text response");
        assert_eq!(response(599, "text/plain", "").status(), "599");
    }

    #[test]
    fn success_body_lands_in_result() {
        let mut resp = response(200, "application/json", r#"{"id":"success","message":"login successful"}"#);
        resp.result_target = Some(Target::of::<AuthSuccess>());
        parse_response_body(&client(), &mut resp).unwrap();
        let result = resp.result::<AuthSuccess>().unwrap();
        assert_eq!(result.id, "success");
        assert_eq!(result.message, "login successful");
        assert!(resp.error::<AuthError>().is_none());
    }

    #[test]
    fn error_body_uses_client_default_error_type() {
        let mut client = client();
        client.set_error::<AuthError>();
        let mut resp = response(
            401,
            "application/xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><AuthError><id>unauthorized</id><message>Invalid credentials</message></AuthError>"#,
        );
        parse_response_body(&client, &mut resp).unwrap();
        assert_eq!(resp.error::<AuthError>().unwrap().id, "unauthorized");
    }

    #[test]
    fn request_error_type_wins_over_client_default() {
        #[derive(Debug, Deserialize)]
        struct Detailed {
            message: String,
        }

        let mut client = client();
        client.set_error::<AuthError>();
        let mut resp = response(500, "application/json", r#"{"id":"x","message":"boom"}"#);
        resp.error_target = Some(Target::of::<Detailed>());
        parse_response_body(&client, &mut resp).unwrap();
        assert_eq!(resp.error::<Detailed>().unwrap().message, "boom");
        assert!(resp.error::<AuthError>().is_none());
    }

    #[test]
    fn opaque_and_redirect_bodies_pass_through() {
        let mut resp = response(200, "text/plain", "not json");
        resp.result_target = Some(Target::of::<AuthSuccess>());
        parse_response_body(&client(), &mut resp).unwrap();
        assert!(resp.result::<AuthSuccess>().is_none());

        let mut resp = response(302, "application/json", "{}");
        resp.result_target = Some(Target::of::<AuthSuccess>());
        parse_response_body(&client(), &mut resp).unwrap();
        assert!(resp.result::<AuthSuccess>().is_none());
    }

    #[test]
    fn malformed_success_body_is_a_decoding_error() {
        let mut resp = response(200, "application/json", r#"{ "id": "success", }"#);
        resp.result_target = Some(Target::of::<AuthSuccess>());
        let err = parse_response_body(&client(), &mut resp).unwrap_err();
        assert!(matches!(err, Error::Decoding { .. }));
    }
}
