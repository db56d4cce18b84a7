//! Outgoing HTTP response type.
//!
//! A handler receives a `&mut Response`, sets the status and headers, and
//! writes the body through it. Where those bytes go is decided by the
//! response's [`ResponseWriter`], which middleware may wrap.

use std::io::{self, Write};
use std::mem;

use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

use crate::writer::ResponseWriter;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::bytes`].
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use tsu_log::Response;
/// use http::StatusCode;
///
/// let mut res = Response::new(Vec::new());
/// res.set_status(StatusCode::CREATED);
/// res.header("location", "/users/42");
/// res.json(br#"{"id":42}"#).unwrap();
/// res.close().unwrap();
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    writer: Box<dyn ResponseWriter>,
    closed: bool,
}

impl Response {
    /// `200 OK`, no headers, body going to `writer`.
    pub fn new(writer: impl ResponseWriter + 'static) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            writer: Box::new(writer),
            closed: false,
        }
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn is_closed(&self) -> bool { self.closed }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Appends a header. Names or values that are not valid HTTP are skipped
    /// with a warning rather than failing the request.
    pub fn header(&mut self, name: &str, value: &str) {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = name, "skipping invalid response header"),
        }
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
    }

    /// Replaces the active writer with one built around it.
    ///
    /// This is how middleware decorates the output: `wrap` receives the
    /// current writer by value and returns its replacement.
    pub fn wrap_writer<F>(&mut self, wrap: F)
    where
        F: FnOnce(Box<dyn ResponseWriter>) -> Box<dyn ResponseWriter>,
    {
        let inner = mem::replace(&mut self.writer, Box::new(io::sink()));
        self.writer = wrap(inner);
    }

    /// Writes a `text/plain; charset=utf-8` body.
    pub fn text(&mut self, body: &str) -> io::Result<()> {
        self.bytes(ContentType::Text, body.as_bytes())
    }

    /// Writes an `application/json` body.
    pub fn json(&mut self, body: &[u8]) -> io::Result<()> {
        self.bytes(ContentType::Json, body)
    }

    /// Writes a typed body. Use this for XML, HTML, binary, SSE, etc.
    pub fn bytes(&mut self, content_type: ContentType, body: &[u8]) -> io::Result<()> {
        self.set_content_type(content_type);
        self.write_all(body)
    }

    /// Finishes the response, running the active writer's
    /// [`close`](ResponseWriter::close).
    ///
    /// Only the first call reaches the writer; later calls return `Ok(())`.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // The writer is lent out for the duration of the call so that it can
        // look at the response it belongs to.
        let mut writer = mem::replace(&mut self.writer, Box::new(io::sink()));
        let result = writer.close(self);
        self.writer = writer;
        result
    }

    pub(crate) fn into_parts(self) -> (StatusCode, HeaderMap) {
        (self.status, self.headers)
    }
}

impl Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(&mut self.writer, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
