//! Long-lived client configuration and the call pipeline.
//!
//! # Design
//! A `Client` holds everything shared between calls: host URL, default
//! headers, query and form fields, credentials, cookies, transport settings,
//! redirect policies and the two middleware chains. Setters take `&mut self`
//! and return `&mut Self` so configuration reads as a chain; a call only
//! needs `&self`, so one client can serve many threads once configured.
//!
//! `execute` runs the pre-request chain, sends the wire request (following
//! redirects the policies allow), wraps the answer in a `Response` and runs
//! the post-response chain.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::Level;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::codec::Target;
use crate::error::{Error, Result};
use crate::http::{Cookie, HttpRequest};
use crate::logging::{LogCrateSink, LogSink};
use crate::middleware::{
    self, RequestChain, RequestMiddleware, ResponseChain, ResponseMiddleware,
};
use crate::params::Params;
use crate::redirect::{self, FlexibleRedirect, NoRedirect, RedirectPolicy};
use crate::request::Request;
use crate::response::Response;
use crate::transport::{Transport, TransportOptions};

/// Username and password for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic <base64(username:password)>`
    pub fn header_value(&self) -> String {
        format!(
            "Basic {}",
            BASE64.encode(format!("{}:{}", self.username, self.password))
        )
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Redirect behaviour preset.
///
/// `Rest` refuses redirects, `Http` follows up to ten hops like a browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Rest,
    Http,
}

pub struct Client {
    host_url: String,
    headers: Params,
    query_params: Params,
    form_data: Params,
    basic_auth: Option<BasicAuth>,
    auth_token: Option<String>,
    cookies: Vec<Cookie>,
    error_target: Option<Target>,
    debug: bool,
    content_length: bool,
    log_sink: Arc<dyn LogSink>,
    mode: Mode,
    redirect_policies: Vec<Arc<dyn RedirectPolicy>>,
    transport: Arc<dyn Transport>,
    transport_options: TransportOptions,
    before_request: RequestChain,
    after_response: ResponseChain,
}

impl Client {
    /// A client in REST mode backed by the blocking `ureq` transport.
    #[cfg(feature = "ureq-transport")]
    pub fn new() -> Self {
        Self::with_transport(crate::transport::UreqTransport::new())
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            host_url: String::new(),
            headers: Params::new(),
            query_params: Params::new(),
            form_data: Params::new(),
            basic_auth: None,
            auth_token: None,
            cookies: Vec::new(),
            error_target: None,
            debug: false,
            content_length: false,
            log_sink: Arc::new(LogCrateSink),
            mode: Mode::Rest,
            redirect_policies: vec![Arc::new(NoRedirect)],
            transport: Arc::new(transport),
            transport_options: TransportOptions::default(),
            before_request: middleware::builtin_request_chain(),
            after_response: middleware::builtin_response_chain(),
        }
    }

    /// Start describing a call.
    pub fn request(&self) -> Request<'_> {
        Request::new(self)
    }

    /// Base URL for relative request URLs. A trailing `/` is dropped.
    pub fn set_host_url(&mut self, url: &str) -> &mut Self {
        self.host_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn headers(&self) -> &Params {
        &self.headers
    }

    pub fn set_query_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query_params.set(name, value);
        self
    }

    pub fn set_query_params<I, K, V>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params.extend(params);
        self
    }

    pub fn query_params(&self) -> &Params {
        &self.query_params
    }

    pub fn set_form_data<I, K, V>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form_data.extend(fields);
        self
    }

    pub fn form_data(&self) -> &Params {
        &self.form_data
    }

    pub fn set_basic_auth(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.basic_auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn basic_auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref()
    }

    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub fn set_auth_token(&mut self, token: impl Into<String>) -> &mut Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn set_cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.cookies.push(cookie);
        self
    }

    pub fn set_cookies(&mut self, cookies: impl IntoIterator<Item = Cookie>) -> &mut Self {
        self.cookies.extend(cookies);
        self
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Default type for 4xx/5xx JSON or XML bodies when the request names
    /// none.
    pub fn set_error<T: DeserializeOwned + Send + Sync + 'static>(&mut self) -> &mut Self {
        self.error_target = Some(Target::of::<T>());
        self
    }

    pub fn error_target(&self) -> Option<Target> {
        self.error_target
    }

    /// Write a request and a response block to the log sink for every call.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn set_content_length(&mut self, enabled: bool) -> &mut Self {
        self.content_length = enabled;
        self
    }

    pub fn is_content_length(&self) -> bool {
        self.content_length
    }

    pub fn set_log_sink(&mut self, sink: impl LogSink + 'static) -> &mut Self {
        self.log_sink = Arc::new(sink);
        self
    }

    pub(crate) fn log(&self, level: Level, message: &str) {
        self.log_sink.log(level, message);
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.transport_options.timeout = Some(timeout);
        self
    }

    /// Route calls through `proxy`. An unparsable URL is logged and leaves
    /// the client without a proxy.
    pub fn set_proxy(&mut self, proxy: &str) -> &mut Self {
        match Url::parse(proxy) {
            Ok(url) => self.transport_options.proxy = Some(url),
            Err(e) => {
                self.log(Level::Error, &format!("invalid proxy url '{proxy}': {e}"));
                self.transport_options.proxy = None;
            }
        }
        self
    }

    pub fn remove_proxy(&mut self) -> &mut Self {
        self.transport_options.proxy = None;
        self
    }

    pub fn set_insecure_skip_verify(&mut self, skip: bool) -> &mut Self {
        self.transport_options.insecure_skip_verify = skip;
        self
    }

    pub fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }

    pub fn set_transport(&mut self, transport: impl Transport + 'static) -> &mut Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Replace all redirect policies with `policy`.
    pub fn set_redirect_policy(&mut self, policy: impl RedirectPolicy + 'static) -> &mut Self {
        self.redirect_policies = vec![Arc::new(policy)];
        self
    }

    pub fn add_redirect_policy(&mut self, policy: impl RedirectPolicy + 'static) -> &mut Self {
        self.redirect_policies.push(Arc::new(policy));
        self
    }

    /// Drop every redirect policy; redirects then follow the default hop
    /// limit.
    pub fn clear_redirect_policies(&mut self) -> &mut Self {
        self.redirect_policies.clear();
        self
    }

    pub fn set_rest_mode(&mut self) -> &mut Self {
        self.mode = Mode::Rest;
        self.set_redirect_policy(NoRedirect)
    }

    pub fn set_http_mode(&mut self) -> &mut Self {
        self.mode = Mode::Http;
        self.set_redirect_policy(FlexibleRedirect::default())
    }

    pub fn set_mode(&mut self, mode: Mode) -> &mut Self {
        match mode {
            Mode::Rest => self.set_rest_mode(),
            Mode::Http => self.set_http_mode(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Append a hook that runs after the built-in pre-request stages.
    pub fn on_before_request(&mut self, hook: impl RequestMiddleware + 'static) -> &mut Self {
        self.before_request.push(Arc::new(hook));
        self
    }

    /// Append a hook that runs after the built-in post-response stages.
    pub fn on_after_response(&mut self, hook: impl ResponseMiddleware + 'static) -> &mut Self {
        self.after_response.push(Arc::new(hook));
        self
    }

    pub(crate) fn before_request(&self) -> &[Arc<dyn RequestMiddleware>] {
        &self.before_request
    }

    pub(crate) fn execute(&self, mut request: Request<'_>) -> Result<Response> {
        if request.multipart && !request.method.allows_multipart() {
            return Err(Error::MultipartNotAllowed(request.method));
        }

        middleware::run_request_chain(&self.before_request, self, &mut request)?;

        let raw = request
            .raw
            .take()
            .ok_or_else(|| Error::middleware("no wire request was constructed"))?;

        let started = Instant::now();
        let final_response = self.send(&raw)?;
        let mut response = Response::new(raw, final_response, started.elapsed());
        response.result_target = request.result_target;
        response.error_target = request.error_target;

        if let Err(err) = middleware::run_response_chain(&self.after_response, self, &mut response) {
            return Err(err.with_response(response));
        }
        Ok(response)
    }

    /// Send `first`, following each redirect the policies accept.
    fn send(&self, first: &HttpRequest) -> Result<crate::http::HttpResponse> {
        let mut via: Vec<HttpRequest> = Vec::new();
        let mut current: Cow<'_, HttpRequest> = Cow::Borrowed(first);
        loop {
            let response = self.transport.send(&current, &self.transport_options)?;
            let Some(next) = redirect::next_hop(&current, &response)? else {
                return Ok(response);
            };
            via.push(current.into_owned());
            redirect::check(&self.redirect_policies, &next, &via)?;
            log::debug!("following redirect {} -> {}", response.status, next.url);
            current = Cow::Owned(next);
        }
    }
}

#[cfg(feature = "ureq-transport")]
impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host_url", &self.host_url)
            .field("headers", &self.headers)
            .field("query_params", &self.query_params)
            .field("form_data", &self.form_data)
            .field("basic_auth", &self.basic_auth)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .field("cookies", &self.cookies)
            .field("error_target", &self.error_target)
            .field("debug", &self.debug)
            .field("content_length", &self.content_length)
            .field("mode", &self.mode)
            .field("redirect_policies", &self.redirect_policies.len())
            .field("transport_options", &self.transport_options)
            .field("before_request", &self.before_request.len())
            .field("after_response", &self.after_response.len())
            .finish()
    }
}
