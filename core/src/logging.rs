//! Log sink and the debug blocks written for each call.

use std::fmt::Write as _;

use log::Level;

use crate::http::HttpRequest;
use crate::response::Response;

pub(crate) const NO_CONTENT: &str = "***** NO CONTENT *****";

/// Destination for the client's debug blocks and warnings.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(Level, &str) + Send + Sync,
{
    fn log(&self, level: Level, message: &str) {
        self(level, message)
    }
}

/// Forwards to the `log` facade under the `rest_core` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "rest_core", level, "{message}");
    }
}

pub(crate) fn request_block(request: &HttpRequest, body: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "---------------------- REQUEST LOG -----------------------");
    let _ = writeln!(out, "{}  {}  HTTP/1.1", request.method, request.request_uri());
    let _ = writeln!(out, "HOST   : {}", request.host());
    let _ = writeln!(out, "HEADERS:");
    for (name, value) in request.headers.iter() {
        let _ = writeln!(out, "{name:>25}: {value}");
    }
    let _ = writeln!(out, "BODY   :\n{body}");
    out.push_str("----------------------------------------------------------");
    out
}

pub(crate) fn response_block(response: &Response) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "---------------------- RESPONSE LOG -----------------------");
    let _ = writeln!(out, "STATUS : {}", response.status());
    let _ = writeln!(out, "TIME   : {:?}", response.elapsed());
    let _ = writeln!(out, "HEADERS:");
    for (name, value) in response.headers() {
        let _ = writeln!(
            out,
            "{:>30}: {}",
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes())
        );
    }
    let _ = writeln!(out, "BODY   :\n{}", response_body_string(response));
    out.push_str("----------------------------------------------------------");
    out
}

fn response_body_string(response: &Response) -> String {
    if response.body().is_empty() {
        return NO_CONTENT.to_string();
    }
    let content_type = response.header("Content-Type").unwrap_or_default();
    if crate::content::is_json_type(content_type) {
        if let Some(pretty) = crate::codec::pretty_json(response.body()) {
            return pretty;
        }
    }
    String::from_utf8_lossy(response.body()).into_owned()
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::http::HttpMethod;
    use crate::params::Params;

    #[test]
    fn request_block_lists_request_line_host_and_headers() {
        let mut headers = Params::new();
        headers.set("Accept", "application/json");
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: Url::parse("http://localhost:8080/forms/1?x=1").unwrap(),
            headers,
            body: None,
        };
        let block = request_block(&request, NO_CONTENT);
        assert!(block.contains("GET  /forms/1?x=1  HTTP/1.1"));
        assert!(block.contains("HOST   : localhost:8080"));
        assert!(block.contains("Accept: application/json"));
        assert!(block.contains(NO_CONTENT));
    }

    #[test]
    fn closures_are_sinks() {
        use std::sync::{Arc, Mutex};

        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        let sink = move |level: Level, msg: &str| {
            captured.lock().unwrap().push((level, msg.to_string()));
        };
        sink.log(Level::Warn, "careful");
        assert_eq!(lines.lock().unwrap()[0], (Level::Warn, "careful".to_string()));
    }
}
