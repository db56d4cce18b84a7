//! Common and combined log format.
//!
//! ```text
//! common:   127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326
//! combined: <common> "http://www.example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)"
//! ```
//!
//! Free-text fields are escaped: `"` and `\` get a backslash, control
//! characters become `\xHH`, so a hostile header cannot forge a second line.

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use http::Method;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// `strftime` layout of the bracketed timestamp.
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Builds the log line for a finished request.
///
/// Lines are built when the response is closed, so everything the handler
/// did is visible. `body` is the complete response body as written.
pub type Formatter = fn(DateTime<FixedOffset>, &Response, &Request, &[u8]) -> String;

/// Common Log Format: `host ident user [time] "request line" status bytes`.
pub fn common(now: DateTime<FixedOffset>, response: &Response, request: &Request, body: &[u8]) -> String {
    let host = request.remote_addr().map(|addr| addr.ip().to_string());
    let user = request.basic_auth_user();

    format!(
        "{} - {} [{}] \"{} {} {:?}\" {} {}",
        host.as_deref().unwrap_or("-"),
        escape(user.as_deref().unwrap_or("-")),
        now.format(TIMESTAMP_FORMAT),
        escape(request.method().as_str()),
        escape(&request_target(request)),
        request.version(),
        response.status().as_u16(),
        body.len(),
    )
}

/// Combined Log Format: common, followed by the quoted referer and user agent.
pub fn combined(now: DateTime<FixedOffset>, response: &Response, request: &Request, body: &[u8]) -> String {
    let mut line = common(now, response, request, body);
    let _ = write!(
        line,
        " \"{}\" \"{}\"",
        escape(&header_lossy(request, "referer")),
        escape(&header_lossy(request, "user-agent")),
    );
    line
}

/// What the client asked for, as it appeared in the request line.
fn request_target(request: &Request) -> Cow<'_, str> {
    let uri = request.uri();
    if request.method() == Method::CONNECT {
        return match uri.authority() {
            Some(authority) => Cow::Borrowed(authority.as_str()),
            None => Cow::Borrowed(request.header("host").unwrap_or("-")),
        };
    }
    if uri.scheme().is_some() {
        return Cow::Owned(uri.to_string());
    }
    Cow::Borrowed(uri.path_and_query().map_or("/", |pq| pq.as_str()))
}

/// Header value with non-UTF-8 bytes replaced; empty when absent.
fn header_lossy<'a>(request: &'a Request, name: &str) -> Cow<'a, str> {
    request
        .headers()
        .get(name)
        .map_or(Cow::Borrowed(""), |value| String::from_utf8_lossy(value.as_bytes()))
}

fn escape(s: &str) -> Cow<'_, str> {
    if !s.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_control() => {
                let mut buf = [0; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "\\x{byte:02X}");
                }
            }
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

// ── Format ────────────────────────────────────────────────────────────────────

/// A named preset formatter, for choosing the format from configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    #[default]
    Common,
    Combined,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Common   => "common",
            Self::Combined => "combined",
        }
    }

    pub fn formatter(self) -> Formatter {
        match self {
            Self::Common   => common,
            Self::Combined => combined,
        }
    }
}

/// Parses `"common"` or `"combined"`, ignoring ASCII case.
impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("common") {
            Ok(Self::Common)
        } else if s.eq_ignore_ascii_case("combined") {
            Ok(Self::Combined)
        } else {
            Err(Error::UnknownFormat(s.to_owned()))
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
