use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Form, Multipart, Path},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION, WWW_AUTHENTICATE},
        HeaderMap, Method, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::{any, get, options, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const BASIC_AUTH_HEADER: &str = "Basic bXl1c2VyOmJhc2ljYXV0aA==";
pub const BEARER_TOKEN: &str = "004DDB79-6801-4587-B976-F093E6AC44FF";
pub const ENTRY_COUNT: &str = "12";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthSuccess {
    pub id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthError {
    pub id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryCount {
    #[serde(rename = "EntryCount")]
    pub entry_count: String,
}

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(|| async { "TestGet: text response" }))
        .route("/mypage", get(mypage))
        .route("/mypage2", get(|| async { "TestGet: text response from mypage2" }))
        .route("/set-timeout-test", get(slow))
        .route("/echo", any(echo))
        .route("/login", post(login))
        .route("/auth/login", post(basic_login))
        .route("/auth/profile", get(bearer_profile))
        .route("/profile", post(profile_form))
        .route("/upload", post(upload))
        .route("/raw-upload", put(raw_upload))
        .route("/plaintext", put(plaintext))
        .route("/json", put(json_echo))
        .route("/xml", put(xml_echo))
        .route("/patch", patch(patch_resource))
        .route("/options", options(cors_preflight))
        .route("/redirect/{n}", get(redirect_chain))
        .route("/redirect-host-check", get(redirect_off_host))
        .route("/api/v3/forms/{id}/entries/count.json", get(entry_count))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("mock server listening on {addr}");
    }
    axum::serve(listener, app()).await
}

fn is_xml(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("xml"))
}

fn xml_reply<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match quick_xml::se::to_string(value) {
        Ok(body) => (
            status,
            [(CONTENT_TYPE, "application/xml")],
            format!("{XML_HEADER}{body}"),
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn reply<T: Serialize>(xml: bool, status: StatusCode, value: &T) -> Response {
    if xml {
        xml_reply(status, value)
    } else {
        (status, Json(value)).into_response()
    }
}

fn success(message: &str) -> AuthSuccess {
    AuthSuccess {
        id: "success".to_string(),
        message: message.to_string(),
    }
}

fn failure(id: &str, message: &str) -> AuthError {
    AuthError {
        id: id.to_string(),
        message: message.to_string(),
    }
}

async fn mypage() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "TestGet: text response from mypage")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "TestGet: text response"
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        seen.entry(name.as_str().to_string())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert(value);
    }
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// JSON or XML login. `testuser`/`testpass` succeeds; the password
/// `invalidjson` answers 200 with a body that does not parse.
async fn login(headers: HeaderMap, body: Bytes) -> Response {
    let xml = is_xml(&headers);
    let parsed = if xml {
        std::str::from_utf8(&body)
            .map_err(|e| e.to_string())
            .and_then(|s| quick_xml::de::from_str::<Credentials>(s).map_err(|e| e.to_string()))
    } else {
        serde_json::from_slice::<Credentials>(&body).map_err(|e| e.to_string())
    };

    let creds = match parsed {
        Ok(creds) => creds,
        Err(e) => {
            log::debug!("unreadable login body: {e}");
            return reply(
                xml,
                StatusCode::BAD_REQUEST,
                &failure("bad_request", "Unable to read user info"),
            );
        }
    };

    match (creds.username.as_str(), creds.password.as_str()) {
        ("testuser", "testpass") => reply(xml, StatusCode::OK, &success("login successful")),
        ("testuser", "invalidjson") => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/json")],
            r#"{ "id": "success", "message": "login successful", }"#,
        )
            .into_response(),
        _ => reply(
            xml,
            StatusCode::UNAUTHORIZED,
            &failure("unauthorized", "Invalid credentials"),
        ),
    }
}

fn authorization(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn basic_login(headers: HeaderMap) -> Response {
    if authorization(&headers) == BASIC_AUTH_HEADER {
        return Json(success("login successful")).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, r#"Basic realm="mock-server""#)],
        Json(failure("unauthorized", "Invalid credentials")),
    )
        .into_response()
}

async fn bearer_profile(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {BEARER_TOKEN}");
    if authorization(&headers) == expected {
        return Json(success("profile fetched successfully")).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(failure("unauthorized", "Invalid token")),
    )
        .into_response()
}

async fn profile_form(Form(fields): Form<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(fields)
}

/// One line per part: files report their size, fields their value.
async fn upload(mut multipart: Multipart) -> Result<String, MultipartError> {
    let mut out = String::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await?;
        match file_name {
            Some(file_name) => {
                out.push_str(&format!("File: {file_name}, size: {}\n", data.len()));
            }
            None => {
                out.push_str(&format!("Field: {name}={}\n", String::from_utf8_lossy(&data)));
            }
        }
    }
    Ok(out)
}

async fn raw_upload(body: Bytes) -> String {
    format!("File uploaded successfully, file size: {}", body.len())
}

async fn plaintext(body: String) -> String {
    body
}

async fn json_echo(Json(value): Json<serde_json::Value>) -> Json<serde_json::Value> {
    Json(value)
}

async fn xml_echo(headers: HeaderMap, body: Bytes) -> Response {
    if !is_xml(&headers) {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected an XML body").into_response();
    }
    ([(CONTENT_TYPE, "application/xml")], body).into_response()
}

async fn patch_resource(body: Bytes) -> Json<AuthSuccess> {
    Json(success(&format!("patched {} bytes", body.len())))
}

async fn cors_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            ("Allow", "GET, POST, PUT, PATCH, DELETE, OPTIONS".to_string()),
            ("Access-Control-Expose-Headers", "X-Request-Id".to_string()),
            ("X-Request-Id", Uuid::new_v4().to_string()),
        ],
    )
}

async fn redirect_chain(Path(n): Path<usize>) -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, format!("/redirect/{}", n + 1))])
}

async fn redirect_off_host() -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(LOCATION, "http://not-allowed.invalid/landing")],
    )
}

async fn entry_count(Path(_form_id): Path<String>) -> Json<EntryCount> {
    Json(EntryCount {
        entry_count: ENTRY_COUNT.to_string(),
    })
}
