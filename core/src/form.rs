//! Multipart and URL-encoded form bodies.
//!
//! Form keys starting with `@` are file attachments: the key minus the `@`
//! is the field name and the value is a filesystem path.

use std::fs;
use std::path::Path;

use uuid::Uuid;

use crate::content::OCTET_STREAM_TYPE;
use crate::error::{Error, Result};
use crate::params::Params;

pub(crate) const FILE_PREFIX: char = '@';

/// Writes `multipart/form-data` parts into a buffer.
pub struct MultipartWriter {
    boundary: String,
    buf: Vec<u8>,
    parts: usize,
}

impl MultipartWriter {
    pub fn new() -> Self {
        Self::with_boundary(Uuid::new_v4().simple().to_string())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            buf: Vec::new(),
            parts: 0,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn write_field(&mut self, name: &str, value: &str) {
        self.begin_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        ));
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_file(&mut self, name: &str, file_name: &str, content: &[u8]) {
        self.begin_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {OCTET_STREAM_TYPE}",
            escape_quotes(name),
            escape_quotes(file_name)
        ));
        self.buf.extend_from_slice(content);
    }

    /// Emit the closing boundary and return the body.
    pub fn finish(mut self) -> Vec<u8> {
        if self.parts > 0 {
            self.buf.extend_from_slice(b"\r\n");
        }
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.buf
    }

    fn begin_part(&mut self, headers: &str) {
        if self.parts > 0 {
            self.buf.extend_from_slice(b"\r\n");
        }
        self.parts += 1;
        self.buf
            .extend_from_slice(format!("--{}\r\n{headers}\r\n\r\n", self.boundary).as_bytes());
    }
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Quote-escape a header parameter. Line breaks are percent-encoded so a
/// name cannot start a new part header.
fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Build a multipart body from the client's default fields followed by the
/// request's fields. Returns the content type and the encoded body.
pub fn multipart_body(client_fields: &Params, request_fields: &Params) -> Result<(String, Vec<u8>)> {
    let mut writer = MultipartWriter::new();

    for (name, value) in client_fields.iter() {
        writer.write_field(name, value);
    }

    for (name, value) in request_fields.iter() {
        match name.strip_prefix(FILE_PREFIX) {
            Some(field) => attach_file(&mut writer, field, Path::new(value))?,
            None => writer.write_field(name, value),
        }
    }

    let content_type = writer.content_type();
    Ok((content_type, writer.finish()))
}

fn attach_file(writer: &mut MultipartWriter, field: &str, path: &Path) -> Result<()> {
    let content = fs::read(path).map_err(|source| Error::FileAttachment {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| field.to_string());
    log::trace!("attaching {} ({} bytes) as '{field}'", path.display(), content.len());
    writer.write_file(field, &file_name, &content);
    Ok(())
}

/// URL-encode the merged form fields; request fields win.
pub fn urlencoded_body(client_fields: &Params, request_fields: &Params) -> Vec<u8> {
    let mut merged = client_fields.clone();
    merged.merge(request_fields);
    merged.encode().into_bytes()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn part_names_cannot_break_out_of_their_header() {
        let mut writer = MultipartWriter::new();
        writer.write_field("a\r\nX-Injected: 1", "v");
        writer.write_file("f", "evil\n\"name\".txt", b"data");
        let body = String::from_utf8(writer.finish()).unwrap();
        assert!(!body.contains("\r\nX-Injected"));
        assert!(body.contains("name=\"a%0D%0AX-Injected: 1\""));
        assert!(body.contains("filename=\"evil%0A\\\"name\\\".txt\""));
    }

    #[test]
    fn writer_frames_parts_and_closes() {
        let mut writer = MultipartWriter::with_boundary("XYZ");
        writer.write_field("zip_code", "00001");
        writer.write_file("notes", "text-file.txt", b"hello");
        let body = String::from_utf8(writer.finish()).unwrap();
        assert_eq!(
            body,
            "--XYZ\r\nContent-Disposition: form-data; name=\"zip_code\"\r\n\r\n00001\r\n\
             --XYZ\r\nContent-Disposition: form-data; name=\"notes\"; filename=\"text-file.txt\"\r\n\
             Content-Type: application/octet-stream\r\n\r\nhello\r\n--XYZ--\r\n"
        );
    }

    #[test]
    fn empty_writer_only_closes() {
        let writer = MultipartWriter::with_boundary("B");
        assert_eq!(writer.finish(), b"--B--\r\n".to_vec());
    }

    #[test]
    fn quotes_in_names_are_escaped() {
        assert_eq!(escape_quotes(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn multipart_body_writes_client_fields_then_request_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG\r\n\x1a\n").unwrap();

        let client: Params = [("city", "Los Angeles")].into_iter().collect();
        let mut request = Params::new();
        request.set("first_name", "Ada");
        request.set("@profile_img", file.path().to_string_lossy());

        let (content_type, body) = multipart_body(&client, &request).unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let text = String::from_utf8_lossy(&body);
        let city = text.find("name=\"city\"").unwrap();
        let first = text.find("name=\"first_name\"").unwrap();
        let img = text.find("name=\"profile_img\"; filename=").unwrap();
        assert!(city < first && first < img);
        assert!(text.trim_end().ends_with("--"));
    }

    #[test]
    fn missing_file_is_a_file_attachment_error() {
        let mut request = Params::new();
        request.set("@profile_img", "/definitely/not/here.png");
        let err = multipart_body(&Params::new(), &request).unwrap_err();
        match err {
            Error::FileAttachment { path, .. } => {
                assert_eq!(path, Path::new("/definitely/not/here.png"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn urlencoded_request_fields_override_client_fields() {
        let client: Params = [("zip_code", "00000"), ("city", "Los Angeles")].into_iter().collect();
        let request: Params = [("first_name", "Ada"), ("zip_code", "00001")]
            .into_iter()
            .collect();
        let body = urlencoded_body(&client, &request);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "city=Los+Angeles&first_name=Ada&zip_code=00001"
        );
    }
}
