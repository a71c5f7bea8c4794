//! Delivery of cached files to HTTP clients
//!
//! The orchestrator decides between redirecting, answering "not modified"
//! and sending the file; a [`Responder`] turns that decision into bytes.
//! `CgiResponder` writes CGI-style responses, which is what the `send`
//! subcommand uses.

use crate::error::{ImagixError, ImagixResult};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of a send request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The requested path is stale; the client should go here instead
    Redirect(String),
    /// The client's copy is current
    NotModified(PathBuf),
    /// The file was sent
    File(PathBuf),
}

/// HTTP response collaborator
pub trait Responder {
    /// Whether the client already holds a copy modified at `modified`
    fn is_unmodified_since(&self, modified: SystemTime) -> bool;

    /// Redirect to `location` with the given status code
    fn send_redirect(&mut self, location: &str, status: u16) -> ImagixResult<()>;

    /// Answer a conditional request without a body
    fn send_not_modified(&mut self, path: &Path, modified: SystemTime) -> ImagixResult<()>;

    /// Send the file at `path`
    fn send_file(&mut self, path: &Path, modified: SystemTime) -> ImagixResult<()>;
}

/// Seconds since the epoch, clamping pre-epoch times to zero
pub fn epoch_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`)
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Parse an HTTP date header value
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).into())
}

/// MIME type from a file extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        Some("tif" | "tiff") => "image/tiff",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// Writes CGI-style responses (`Status:` header, blank line, body)
pub struct CgiResponder<W: Write> {
    out: W,
    if_modified_since: Option<SystemTime>,
    cache_control: Option<String>,
}

impl<W: Write> CgiResponder<W> {
    /// Create a responder writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            if_modified_since: None,
            cache_control: None,
        }
    }

    /// Honour the client's `If-Modified-Since` header
    pub fn with_if_modified_since(mut self, since: Option<SystemTime>) -> Self {
        self.if_modified_since = since;
        self
    }

    /// Emit a `Cache-Control` header with every file response
    pub fn with_cache_control(mut self, value: Option<String>) -> Self {
        self.cache_control = value.filter(|v| !v.is_empty());
        self
    }

    /// Answer with a bodiless error status
    pub fn send_error(&mut self, status: u16) -> ImagixResult<()> {
        self.write_head(status, &[("Content-Length", "0".to_string())])
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_head(&mut self, status: u16, headers: &[(&str, String)]) -> ImagixResult<()> {
        let mut head = format!("Status: {} {}\r\n", status, reason_phrase(status));
        for (name, value) in headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        self.out
            .write_all(head.as_bytes())
            .map_err(|e| ImagixError::io("writing response headers", e))
    }
}

impl<W: Write> Responder for CgiResponder<W> {
    fn is_unmodified_since(&self, modified: SystemTime) -> bool {
        // HTTP dates have second precision
        self.if_modified_since
            .is_some_and(|since| epoch_secs(modified) <= epoch_secs(since))
    }

    fn send_redirect(&mut self, location: &str, status: u16) -> ImagixResult<()> {
        self.write_head(status, &[("Location", location.to_string())])
    }

    fn send_not_modified(&mut self, _path: &Path, modified: SystemTime) -> ImagixResult<()> {
        self.write_head(304, &[("Last-Modified", format_http_date(modified))])
    }

    fn send_file(&mut self, path: &Path, modified: SystemTime) -> ImagixResult<()> {
        let body = fs::read(path)
            .map_err(|e| ImagixError::io(format!("reading {}", path.display()), e))?;

        let mut headers = vec![
            ("Content-Type", content_type(path).to_string()),
            ("Content-Length", body.len().to_string()),
            ("Last-Modified", format_http_date(modified)),
        ];
        if let Some(cache_control) = self.cache_control.clone() {
            headers.push(("Cache-Control", cache_control));
        }

        self.write_head(200, &headers)?;
        self.out
            .write_all(&body)
            .and_then(|()| self.out.flush())
            .map_err(|e| ImagixError::io("writing response body", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn http_date_round_trip() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let formatted = format_http_date(time);
        assert_eq!(formatted, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&formatted), Some(time));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type(Path::new("/a@x@1.PNG")), "image/png");
        assert_eq!(content_type(Path::new("/a@x@1.jpeg")), "image/jpeg");
        assert_eq!(content_type(Path::new("/a@x@1")), "application/octet-stream");
    }

    #[test]
    fn unmodified_since_uses_whole_seconds() {
        let modified = UNIX_EPOCH + Duration::from_millis(1_000_500);
        let responder = CgiResponder::new(Vec::new())
            .with_if_modified_since(Some(UNIX_EPOCH + Duration::from_secs(1_000)));
        assert!(responder.is_unmodified_since(modified));
        assert!(!responder.is_unmodified_since(UNIX_EPOCH + Duration::from_secs(1_001)));
        assert!(!CgiResponder::new(Vec::new()).is_unmodified_since(modified));
    }

    #[test]
    fn redirect_writes_location() {
        let mut responder = CgiResponder::new(Vec::new());
        responder.send_redirect("/favicon@foo@1.png", 301).unwrap();

        let out = String::from_utf8(responder.into_inner()).unwrap();
        assert_eq!(
            out,
            "Status: 301 Moved Permanently\r\nLocation: /favicon@foo@1.png\r\n\r\n"
        );
    }

    #[test]
    fn error_status_has_empty_body() {
        let mut responder = CgiResponder::new(Vec::new());
        responder.send_error(404).unwrap();

        let out = String::from_utf8(responder.into_inner()).unwrap();
        assert_eq!(out, "Status: 404 Not Found\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn send_file_writes_headers_and_body() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a@x@1.png");
        fs::write(&path, b"PNGDATA").unwrap();

        let mut responder =
            CgiResponder::new(Vec::new()).with_cache_control(Some("max-age=60".to_string()));
        responder.send_file(&path, UNIX_EPOCH).unwrap();

        let out = String::from_utf8(responder.into_inner()).unwrap();
        assert!(out.starts_with("Status: 200 OK\r\n"));
        assert!(out.contains("Content-Type: image/png\r\n"));
        assert!(out.contains("Content-Length: 7\r\n"));
        assert!(out.contains("Cache-Control: max-age=60\r\n"));
        assert!(out.ends_with("\r\n\r\nPNGDATA"));
    }
}
