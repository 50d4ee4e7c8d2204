//! Request body values and response decoding.
//!
//! # Design
//! A request body is a closed set of shapes: raw bytes, text, or a
//! structured value. Structured values are serialized when they are attached
//! (JSON always, XML only for records), so the pipeline only has to pick the
//! encoding that matches the final content type. Response decoding goes the
//! other way through a `Target`, which remembers the Rust type a caller wants
//! and produces a boxed value the `Response` hands back by downcast.

use std::any::Any;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::content::{self, is_json_type, is_xml_type};
use crate::error::{Error, Result};

/// Whether a structured value is a record (struct) or a free-form map.
/// XML bodies require a record because the type name becomes the root tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Record,
    Map,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Record => f.write_str("record"),
            Shape::Map => f.write_str("map"),
        }
    }
}

/// A serialized structured value waiting for its content type.
#[derive(Debug, Clone)]
pub struct Structured {
    shape: Shape,
    json: std::result::Result<Vec<u8>, String>,
    xml: Option<std::result::Result<String, String>>,
}

impl Structured {
    pub fn shape(&self) -> Shape {
        self.shape
    }

    fn pretty_json(&self) -> Option<String> {
        let bytes = self.json.as_ref().ok()?;
        pretty_json(bytes)
    }
}

/// The body attached to a request.
#[derive(Debug, Clone)]
pub enum Body {
    Raw(Vec<u8>),
    Text(String),
    Structured(Structured),
}

impl Body {
    /// A struct-like value; encodes as JSON or XML.
    pub fn record<T: Serialize + ?Sized>(value: &T) -> Self {
        Body::Structured(Structured {
            shape: Shape::Record,
            json: serde_json::to_vec(value).map_err(|e| e.to_string()),
            xml: Some(quick_xml::se::to_string(value).map_err(|e| e.to_string())),
        })
    }

    /// A map-like value; encodes as JSON only.
    pub fn map<T: Serialize + ?Sized>(value: &T) -> Self {
        Body::Structured(Structured {
            shape: Shape::Map,
            json: serde_json::to_vec(value).map_err(|e| e.to_string()),
            xml: None,
        })
    }

    /// Content type used when the request does not declare one.
    pub fn detect_content_type(&self) -> &'static str {
        match self {
            Body::Raw(bytes) => content::sniff(bytes),
            Body::Text(_) => content::PLAIN_TEXT_TYPE,
            Body::Structured(_) => content::JSON_CONTENT_TYPE,
        }
    }

    /// Serialize the body for `content_type`.
    pub fn encode(&self, content_type: &str) -> Result<Vec<u8>> {
        match self {
            Body::Structured(s) if is_json_type(content_type) => {
                s.json.clone().map_err(Error::Encoding)
            }
            Body::Structured(s) if is_xml_type(content_type) && s.shape == Shape::Record => {
                match &s.xml {
                    Some(Ok(xml)) => Ok(xml.clone().into_bytes()),
                    Some(Err(e)) => Err(Error::Encoding(e.clone())),
                    None => Err(Error::Encoding("value has no XML form".to_string())),
                }
            }
            Body::Text(text) => Ok(text.clone().into_bytes()),
            Body::Raw(bytes) => Ok(bytes.clone()),
            Body::Structured(s) => Err(Error::UnsupportedBodyType(format!(
                "{} value cannot be sent as '{content_type}'",
                s.shape
            ))),
        }
    }

    /// Human-readable rendering for debug logs.
    pub(crate) fn describe(&self, content_type: &str) -> String {
        match self {
            Body::Structured(s) if is_json_type(content_type) => {
                s.pretty_json().unwrap_or_default()
            }
            Body::Structured(s) if is_xml_type(content_type) => match &s.xml {
                Some(Ok(xml)) => xml.clone(),
                _ => String::new(),
            },
            Body::Structured(_) => String::new(),
            Body::Text(text) if is_json_type(content_type) => {
                pretty_json(text.as_bytes()).unwrap_or_else(|| text.clone())
            }
            Body::Text(text) => text.clone(),
            Body::Raw(bytes) => BASE64.encode(bytes),
        }
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Body::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Body::Raw(value)
    }
}

impl From<&[u8]> for Body {
    fn from(value: &[u8]) -> Self {
        Body::Raw(value.to_vec())
    }
}

/// Indent a JSON document, or `None` if it does not parse.
pub(crate) fn pretty_json(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// Deserialize `body` according to `content_type`.
pub fn unmarshal<T: DeserializeOwned>(content_type: &str, body: &[u8]) -> Result<T> {
    if is_json_type(content_type) {
        return serde_json::from_slice(body).map_err(|e| Error::decoding(e.to_string()));
    }
    if is_xml_type(content_type) {
        let text = std::str::from_utf8(body).map_err(|e| Error::decoding(e.to_string()))?;
        return quick_xml::de::from_str(text).map_err(|e| Error::decoding(e.to_string()));
    }
    Err(Error::decoding(format!(
        "content type '{content_type}' is not JSON or XML"
    )))
}

pub(crate) type Decoded = Box<dyn Any + Send + Sync>;

/// The Rust type a response body should be decoded into.
#[derive(Clone, Copy)]
pub struct Target {
    type_name: &'static str,
    decode: fn(&str, &[u8]) -> Result<Decoded>,
}

impl Target {
    pub fn of<T: DeserializeOwned + Send + Sync + 'static>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            decode: decode_boxed::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn decode(&self, content_type: &str, body: &[u8]) -> Result<Decoded> {
        (self.decode)(content_type, body)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Target").field(&self.type_name).finish()
    }
}

fn decode_boxed<T: DeserializeOwned + Send + Sync + 'static>(
    content_type: &str,
    body: &[u8],
) -> Result<Decoded> {
    unmarshal::<T>(content_type, body).map(|v| Box::new(v) as Decoded)
}
