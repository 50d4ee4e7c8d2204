//! Per-call request description.
//!
//! A `Request` borrows the `Client` it was created from and is consumed by
//! one of the verb methods. Setters take and return `self`, so a call reads
//! as one chain:
//!
//! ```no_run
//! # use rest_core::Client;
//! # fn demo(client: &Client) -> rest_core::Result<()> {
//! let resp = client
//!     .request()
//!     .query_param("page", "2")
//!     .header("Accept", "application/json")
//!     .get("/api/v3/forms/7/entries/count.json")?;
//! # Ok(()) }
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use url::Url;

use crate::client::{BasicAuth, Client};
use crate::codec::{Body, Target};
use crate::error::Result;
use crate::form::FILE_PREFIX;
use crate::http::{HttpMethod, HttpRequest};
use crate::params::Params;
use crate::response::Response;

pub struct Request<'c> {
    client: &'c Client,
    pub(crate) method: HttpMethod,
    pub(crate) url: String,
    pub(crate) headers: Params,
    pub(crate) query_params: Params,
    pub(crate) form_data: Params,
    pub(crate) body: Option<Body>,
    pub(crate) basic_auth: Option<BasicAuth>,
    pub(crate) auth_token: Option<String>,
    pub(crate) result_target: Option<Target>,
    pub(crate) error_target: Option<Target>,
    pub(crate) multipart: bool,
    pub(crate) content_length: bool,

    // Filled in by the pre-request stages.
    pub(crate) resolved_url: Option<Url>,
    pub(crate) body_buf: Option<Vec<u8>>,
    pub(crate) form_encoded: bool,
    pub(crate) raw: Option<HttpRequest>,
}

impl<'c> Request<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self {
            client,
            method: HttpMethod::Get,
            url: String::new(),
            headers: Params::new(),
            query_params: Params::new(),
            form_data: Params::new(),
            body: None,
            basic_auth: None,
            auth_token: None,
            result_target: None,
            error_target: None,
            multipart: false,
            content_length: false,
            resolved_url: None,
            body_buf: None,
            form_encoded: false,
            raw: None,
        }
    }

    pub fn client(&self) -> &'c Client {
        self.client
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The URL as given by the caller, before resolution.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Params {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Params {
        &mut self.headers
    }

    pub fn query_params_mut(&mut self) -> &mut Params {
        &mut self.query_params
    }

    pub fn form_data_mut(&mut self) -> &mut Params {
        &mut self.form_data
    }

    pub fn body_value(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// The serialized body, once the body stage has run.
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body_buf.as_deref()
    }

    /// The wire request, once it has been constructed.
    pub fn raw(&self) -> Option<&HttpRequest> {
        self.raw.as_ref()
    }

    pub fn raw_mut(&mut self) -> Option<&mut HttpRequest> {
        self.raw.as_mut()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn headers_from<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.set(name, value);
        self
    }

    pub fn query_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params.extend(params);
        self
    }

    /// Add the parameters of a raw `a=1&b=2` string. Malformed input is
    /// taken as literally as possible rather than rejected.
    pub fn query_string(mut self, query: &str) -> Self {
        let parsed = Params::parse(query);
        self.query_params.merge(&parsed);
        self
    }

    pub fn form_data<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form_data.extend(fields);
        self
    }

    /// Attach the file at `path` as the multipart field `field`.
    pub fn file(mut self, field: &str, path: impl AsRef<Path>) -> Self {
        self.form_data.set(
            format!("{FILE_PREFIX}{field}"),
            path.as_ref().to_string_lossy(),
        );
        self.multipart = true;
        self
    }

    pub fn files<I, K, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: AsRef<str>,
        P: AsRef<Path>,
    {
        for (field, path) in files {
            self = self.file(field.as_ref(), path);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Decode a 2xx JSON or XML response into `T`.
    pub fn result<T: DeserializeOwned + Send + Sync + 'static>(mut self) -> Self {
        self.result_target = Some(Target::of::<T>());
        self
    }

    /// Decode a 4xx/5xx JSON or XML response into `T`, overriding the
    /// client's default error type.
    pub fn error<T: DeserializeOwned + Send + Sync + 'static>(mut self) -> Self {
        self.error_target = Some(Target::of::<T>());
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn content_length(mut self, enabled: bool) -> Self {
        self.content_length = enabled;
        self
    }

    pub fn get(self, url: &str) -> Result<Response> {
        self.execute(HttpMethod::Get, url)
    }

    pub fn post(self, url: &str) -> Result<Response> {
        self.execute(HttpMethod::Post, url)
    }

    pub fn put(self, url: &str) -> Result<Response> {
        self.execute(HttpMethod::Put, url)
    }

    pub fn delete(self, url: &str) -> Result<Response> {
        self.execute(HttpMethod::Delete, url)
    }

    pub fn patch(self, url: &str) -> Result<Response> {
        self.execute(HttpMethod::Patch, url)
    }

    pub fn head(self, url: &str) -> Result<Response> {
        self.execute(HttpMethod::Head, url)
    }

    pub fn options(self, url: &str) -> Result<Response> {
        self.execute(HttpMethod::Options, url)
    }

    pub fn execute(mut self, method: HttpMethod, url: &str) -> Result<Response> {
        self.method = method;
        self.url = url.to_string();
        let client = self.client;
        client.execute(self)
    }
}

impl std::fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query_params", &self.query_params)
            .field("form_data", &self.form_data)
            .field("multipart", &self.multipart)
            .field("result_target", &self.result_target)
            .field("error_target", &self.error_target)
            .finish_non_exhaustive()
    }
}
