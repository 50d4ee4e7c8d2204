//! Built-in pre-request stages.
//!
//! Each stage takes the client and the in-flight request and fills in one
//! more piece of the wire request. They run in this order before any user
//! hook: URL, headers, body, wire request, credentials, debug log.

use std::borrow::Cow;

use log::Level;
use url::Url;

use crate::client::Client;
use crate::content::FORM_CONTENT_TYPE;
use crate::error::{Error, Result};
use crate::form;
use crate::http::{cookie_header, HttpRequest};
use crate::logging::{self, NO_CONTENT};
use crate::params;
use crate::request::Request;

pub const USER_AGENT: &str = concat!("rest-core/", env!("CARGO_PKG_VERSION"));

/// Resolve the request URL against the client's host URL and merge the
/// query parameters onto it.
pub(crate) fn parse_request_url(client: &Client, request: &mut Request<'_>) -> Result<()> {
    let mut url = match Url::parse(&request.url) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path: Cow<'_, str> = if request.url.starts_with('/') {
                Cow::Borrowed(request.url.as_str())
            } else {
                Cow::Owned(format!("/{}", request.url))
            };
            let full = format!("{}{path}", client.host_url());
            Url::parse(&full).map_err(|e| Error::malformed_url(&full, e))?
        }
        Err(e) => return Err(Error::malformed_url(&request.url, e)),
    };

    // The URL's own query may repeat a key; only keys overridden by client
    // or request parameters are replaced.
    let mut overrides = client.query_params().clone();
    overrides.merge(&request.query_params);
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(k, _)| !k.is_empty() && !overrides.contains(k))
        .collect();
    pairs.extend(overrides.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let encoded = params::encode_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        url.set_query(Some(&encoded));
    }

    request.resolved_url = Some(url);
    Ok(())
}

pub(crate) fn parse_request_header(client: &Client, request: &mut Request<'_>) -> Result<()> {
    let mut headers = client.headers().clone();
    headers.merge(&request.headers);

    if headers.contains("User-Agent") {
        headers.set("X-User-Agent", USER_AGENT);
    } else {
        headers.set("User-Agent", USER_AGENT);
    }

    if !headers.contains("Accept") {
        if let Some(ct) = headers.get("Content-Type").map(str::to_string) {
            headers.set("Accept", ct);
        }
    }

    request.headers = headers;
    Ok(())
}

pub(crate) fn parse_request_body(client: &Client, request: &mut Request<'_>) -> Result<()> {
    if !request.method.allows_body() {
        request.headers.remove("Content-Type");
        return Ok(());
    }

    prepare_body(client, request)?;

    if client.is_content_length() || request.content_length {
        let len = request.body_buf.as_ref().map_or(0, Vec::len);
        request.headers.set("Content-Length", len.to_string());
    }
    Ok(())
}

/// The first matching branch decides the body; later branches are not
/// consulted.
fn prepare_body(client: &Client, request: &mut Request<'_>) -> Result<()> {
    if request.multipart {
        let (content_type, body) = form::multipart_body(client.form_data(), &request.form_data)?;
        request.headers.set("Content-Type", content_type);
        request.body_buf = Some(body);
        return Ok(());
    }

    if !client.form_data().is_empty() || !request.form_data.is_empty() {
        request.body_buf = Some(form::urlencoded_body(client.form_data(), &request.form_data));
        request.headers.set("Content-Type", FORM_CONTENT_TYPE);
        request.form_encoded = true;
        return Ok(());
    }

    let Some(body) = &request.body else {
        return Ok(());
    };
    let content_type = match request.headers.get("Content-Type") {
        Some(ct) => ct.to_string(),
        None => {
            let detected = body.detect_content_type();
            request.headers.set("Content-Type", detected);
            detected.to_string()
        }
    };
    request.body_buf = Some(body.encode(&content_type)?);
    Ok(())
}

pub(crate) fn create_http_request(client: &Client, request: &mut Request<'_>) -> Result<()> {
    let url = request
        .resolved_url
        .clone()
        .ok_or_else(|| Error::malformed_url(&request.url, "url was not resolved"))?;

    let mut headers = request.headers.clone();
    if let Some(cookies) = cookie_header(client.cookies()) {
        let value = match headers.get("Cookie") {
            Some(existing) => format!("{existing}; {cookies}"),
            None => cookies,
        };
        headers.set("Cookie", value);
    }

    log::debug!("assembled {} {}", request.method, url);
    request.raw = Some(HttpRequest {
        method: request.method,
        url,
        headers,
        body: request.body_buf.clone(),
    });
    Ok(())
}

/// Request credentials take precedence over the client's; a bearer token
/// overwrites any basic authorization.
pub(crate) fn add_credentials(client: &Client, request: &mut Request<'_>) -> Result<()> {
    let Some(raw) = request.raw.as_mut() else {
        return Ok(());
    };

    if let Some(auth) = request.basic_auth.as_ref().or(client.basic_auth()) {
        if raw.url.scheme() != "https" {
            client.log(
                Level::Warn,
                "Using basic auth over plain HTTP is not secure, use HTTPS",
            );
        }
        raw.headers.set("Authorization", auth.header_value());
    }

    if let Some(token) = request.auth_token.as_deref().or(client.auth_token()) {
        raw.headers.set("Authorization", format!("Bearer {token}"));
    }
    Ok(())
}

pub(crate) fn request_logger(client: &Client, request: &mut Request<'_>) -> Result<()> {
    if !client.is_debug() {
        return Ok(());
    }
    let Some(raw) = request.raw.as_ref() else {
        return Ok(());
    };
    let body = describe_body(request, raw);
    client.log(Level::Info, &logging::request_block(raw, &body));
    Ok(())
}

fn describe_body(request: &Request<'_>, raw: &HttpRequest) -> String {
    match (&raw.body, &request.body) {
        (None, _) => NO_CONTENT.to_string(),
        (Some(buf), _) if request.multipart || request.form_encoded => {
            String::from_utf8_lossy(buf).into_owned()
        }
        (Some(_), Some(body)) => body.describe(raw.headers.get("Content-Type").unwrap_or_default()),
        (Some(buf), None) => String::from_utf8_lossy(buf).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use serde::Serialize;

    use super::*;
    use crate::codec::Body;
    use crate::http::{Cookie, HttpMethod, HttpResponse};
    use crate::transport::{TransportError, TransportOptions};

    fn client() -> Client {
        let mut client = Client::with_transport(|_: &HttpRequest, _: &TransportOptions| {
            Err::<HttpResponse, _>(TransportError::Other("offline".to_string()))
        });
        client.set_host_url("http://localhost:8080/");
        client
    }

    fn prepare(request: &mut Request<'_>, method: HttpMethod, url: &str) -> Result<()> {
        let client = request.client();
        request.method = method;
        request.url = url.to_string();
        parse_request_url(client, request)?;
        parse_request_header(client, request)?;
        parse_request_body(client, request)?;
        create_http_request(client, request)?;
        add_credentials(client, request)
    }

    fn wire<'a>(request: &'a Request<'_>) -> &'a HttpRequest {
        request.raw().unwrap()
    }

    #[derive(Serialize)]
    struct User {
        username: String,
        password: String,
    }

    #[test]
    fn relative_url_gets_leading_slash() {
        let client = client();
        let mut request = client.request();
        prepare(&mut request, HttpMethod::Get, "mypage").unwrap();
        assert_eq!(wire(&request).url.as_str(), "http://localhost:8080/mypage");
    }

    #[test]
    fn absolute_url_ignores_host() {
        let client = client();
        let mut request = client.request();
        prepare(&mut request, HttpMethod::Get, "https://example.com/a").unwrap();
        assert_eq!(wire(&request).url.as_str(), "https://example.com/a");
    }

    #[test]
    fn unparsable_urls_are_malformed() {
        let mut client = client();
        client.set_host_url("");
        let mut request = client.request();
        let err = prepare(&mut request, HttpMethod::Get, "/no-host").unwrap_err();
        assert!(matches!(err, Error::MalformedUrl { .. }));

        let mut request = client.request();
        let err = prepare(&mut request, HttpMethod::Get, "http://[::1").unwrap_err();
        assert!(matches!(err, Error::MalformedUrl { .. }));
    }

    #[test]
    fn request_query_overrides_client_and_keeps_url_query() {
        let mut client = client();
        client.set_query_param("req_1", "client").set_query_param("req_3", "3");
        let mut request = client
            .request()
            .query_param("req_1", "request")
            .query_string("req_2=two words");
        prepare(&mut request, HttpMethod::Get, "/search?keep=me").unwrap();
        assert_eq!(
            wire(&request).url.query(),
            Some("keep=me&req_1=request&req_2=two+words&req_3=3")
        );
    }

    #[test]
    fn url_query_keeps_repeated_keys() {
        let client = client();
        let mut request = client.request();
        prepare(&mut request, HttpMethod::Get, "/search?id=1&id=2&Tag=a&tag=b").unwrap();
        assert_eq!(
            wire(&request).url.query(),
            Some("Tag=a&id=1&id=2&tag=b")
        );
    }

    #[test]
    fn overridden_url_query_key_drops_every_occurrence() {
        let mut client = client();
        client.set_query_param("page", "9");
        let mut request = client.request().query_param("ID", "3");
        prepare(&mut request, HttpMethod::Get, "/search?id=1&page=1&id=2&keep=a&keep=b").unwrap();
        assert_eq!(
            wire(&request).url.query(),
            Some("ID=3&keep=a&keep=b&page=9")
        );
    }

    #[test]
    fn request_headers_override_client_headers() {
        let mut client = client();
        client.set_header("X-Custom", "client").set_header("X-Other", "kept");
        let mut request = client.request().header("x-custom", "request");
        prepare(&mut request, HttpMethod::Get, "/").unwrap();
        let headers = &wire(&request).headers;
        assert_eq!(headers.get("X-Custom"), Some("request"));
        assert_eq!(headers.get("X-Other"), Some("kept"));
    }

    #[test]
    fn user_agent_default_moves_aside_for_caller_value() {
        let client = client();
        let mut request = client.request();
        prepare(&mut request, HttpMethod::Get, "/").unwrap();
        assert_eq!(wire(&request).headers.get("User-Agent"), Some(USER_AGENT));

        let mut request = client.request().header("User-Agent", "custom-agent/1.0");
        prepare(&mut request, HttpMethod::Get, "/").unwrap();
        let headers = &wire(&request).headers;
        assert_eq!(headers.get("User-Agent"), Some("custom-agent/1.0"));
        assert_eq!(headers.get("X-User-Agent"), Some(USER_AGENT));
    }

    #[test]
    fn accept_defaults_to_declared_content_type() {
        let client = client();
        let mut request = client
            .request()
            .header("Content-Type", "application/xml")
            .body("<a/>");
        prepare(&mut request, HttpMethod::Post, "/").unwrap();
        assert_eq!(wire(&request).headers.get("Accept"), Some("application/xml"));
    }

    #[test]
    fn get_strips_content_type_and_sends_no_body() {
        let client = client();
        let mut request = client
            .request()
            .header("Content-Type", "application/json")
            .body("{}")
            .content_length(true);
        prepare(&mut request, HttpMethod::Get, "/").unwrap();
        let raw = wire(&request);
        assert!(raw.body.is_none());
        assert!(!raw.headers.contains("Content-Type"));
        assert!(!raw.headers.contains("Content-Length"));
    }

    #[test]
    fn form_fields_win_over_body_value() {
        let mut client = client();
        client.set_form_data([("zip_code", "00000"), ("city", "Los Angeles")]);
        let mut request = client
            .request()
            .form_data([("first_name", "Ada"), ("zip_code", "00001")])
            .body("ignored");
        prepare(&mut request, HttpMethod::Post, "/profile").unwrap();
        let raw = wire(&request);
        assert_eq!(raw.headers.get("Content-Type"), Some(FORM_CONTENT_TYPE));
        assert_eq!(
            raw.body.as_deref(),
            Some(&b"city=Los+Angeles&first_name=Ada&zip_code=00001"[..])
        );
    }

    #[test]
    fn structured_body_defaults_to_json() {
        let client = client();
        let user = User {
            username: "testuser".to_string(),
            password: "testpass".to_string(),
        };
        let mut request = client.request().body(Body::record(&user));
        prepare(&mut request, HttpMethod::Post, "/login").unwrap();
        let raw = wire(&request);
        assert_eq!(
            raw.headers.get("Content-Type"),
            Some(crate::content::JSON_CONTENT_TYPE)
        );
        assert_eq!(
            raw.body.as_deref(),
            Some(&br#"{"username":"testuser","password":"testpass"}"#[..])
        );
    }

    #[test]
    fn map_body_cannot_be_xml() {
        let client = client();
        let mut map = BTreeMap::new();
        map.insert("username", "testuser");
        let mut request = client
            .request()
            .header("Content-Type", "application/xml")
            .body(Body::map(&map));
        let err = prepare(&mut request, HttpMethod::Post, "/login").unwrap_err();
        assert!(matches!(err, Error::UnsupportedBodyType(_)));
    }

    #[test]
    fn content_length_for_body_verbs() {
        let mut client = client();
        client.set_content_length(true);
        let mut request = client.request().body("hello");
        prepare(&mut request, HttpMethod::Put, "/plaintext").unwrap();
        assert_eq!(wire(&request).headers.get("Content-Length"), Some("5"));

        let mut request = client.request();
        prepare(&mut request, HttpMethod::Post, "/empty").unwrap();
        assert_eq!(wire(&request).headers.get("Content-Length"), Some("0"));
    }

    #[test]
    fn cookies_are_one_header() {
        let mut client = client();
        client
            .set_cookie(Cookie::new("session-1", "This is cookie 1 value"))
            .set_cookie(Cookie::new("session-2", "two"));
        let mut request = client.request();
        prepare(&mut request, HttpMethod::Get, "/").unwrap();
        assert_eq!(
            wire(&request).headers.get("Cookie"),
            Some("session-1=\"This is cookie 1 value\"; session-2=two")
        );
    }

    #[test]
    fn request_basic_auth_wins_and_warns_over_http() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&warnings);
        let mut client = client();
        client
            .set_basic_auth("client", "secret")
            .set_log_sink(move |level: Level, msg: &str| {
                captured.lock().unwrap().push((level, msg.to_string()));
            });
        let mut request = client.request().basic_auth("myuser", "basicauth");
        prepare(&mut request, HttpMethod::Post, "/auth/login").unwrap();
        assert_eq!(
            wire(&request).headers.get("Authorization"),
            Some("Basic bXl1c2VyOmJhc2ljYXV0aA==")
        );
        let warnings = warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].0, Level::Warn);
    }

    #[test]
    fn token_overrides_basic_auth() {
        let mut client = client();
        client
            .set_basic_auth("myuser", "basicauth")
            .set_auth_token("client-token");
        let mut request = client
            .request()
            .auth_token("004DDB79-6801-4587-B976-F093E6AC44FF");
        prepare(&mut request, HttpMethod::Get, "https://example.com/auth/profile").unwrap();
        assert_eq!(
            wire(&request).headers.get("Authorization"),
            Some("Bearer 004DDB79-6801-4587-B976-F093E6AC44FF")
        );
    }

    #[test]
    fn debug_log_describes_body() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        let mut client = client();
        client
            .set_debug(true)
            .set_log_sink(move |_: Level, msg: &str| captured.lock().unwrap().push(msg.to_string()));
        let mut request = client
            .request()
            .header("Content-Type", "application/json")
            .body(r#"{"a":1}"#);
        prepare(&mut request, HttpMethod::Post, "/json").unwrap();
        request_logger(&client, &mut request).unwrap();
        let lines = lines.lock().unwrap();
        assert!(lines[0].contains("POST  /json  HTTP/1.1"));
        assert!(lines[0].contains("{\n  \"a\": 1\n}"));
    }
}
