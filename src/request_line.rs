use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ParseError;
use crate::headers::find_crlf;

// ---------------------------------------------------------------------------
// HttpVersion
// ---------------------------------------------------------------------------

/// Protocol versions accepted on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    /// HTTP/1.0
    Http10,
    /// HTTP/1.1
    Http11,
    /// HTTP/2.0
    Http20,
    /// HTTP/3.0
    Http30,
}

impl HttpVersion {
    /// Parse the part after `HTTP/` (e.g. `b"1.1"`).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"1.0" => Some(Self::Http10),
            b"1.1" => Some(Self::Http11),
            b"2.0" => Some(Self::Http20),
            b"3.0" => Some(Self::Http30),
            _ => None,
        }
    }

    /// The bare version number, e.g. `"1.1"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http10 => "1.0",
            Self::Http11 => "1.1",
            Self::Http20 => "2.0",
            Self::Http30 => "3.0",
        }
    }
}

/// Formats as the wire token, e.g. `HTTP/1.1`.
impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}", self.as_str())
    }
}

impl Serialize for HttpVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestLine
// ---------------------------------------------------------------------------

/// The first line of a request: `METHOD SP TARGET SP HTTP/VERSION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestLine {
    /// Uppercase method token, e.g. `GET`.
    pub method: String,
    /// Request target exactly as sent, query string included.
    pub target: String,
    pub version: HttpVersion,
}

impl RequestLine {
    /// The target up to (not including) any `?`.
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.method, self.target, self.version)
    }
}

/// Scan a request line from the front of `buf`.
///
/// Returns `Ok(None)` while no CRLF has arrived yet. On success the length
/// returned is that of the line itself; the caller skips the CRLF.
///
/// # Errors
///
/// [`ParseError::MalformedRequestLine`] unless the line has exactly three
/// whitespace-separated tokens, then [`ParseError::InvalidMethod`],
/// [`ParseError::InvalidTarget`] or [`ParseError::UnsupportedVersion`] for
/// the offending token.
pub fn parse_request_line(buf: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(line_len) = find_crlf(buf) else {
        return Ok(None);
    };
    let line = &buf[..line_len];

    let tokens: Vec<&[u8]> = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    let [method, target, version] = tokens[..] else {
        return Err(ParseError::MalformedRequestLine(lossy(line)));
    };

    if !method.iter().all(u8::is_ascii_uppercase) {
        return Err(ParseError::InvalidMethod(lossy(method)));
    }

    if !target.starts_with(b"/") {
        return Err(ParseError::InvalidTarget(lossy(target)));
    }

    let version = version
        .strip_prefix(b"HTTP/")
        .and_then(HttpVersion::from_bytes)
        .ok_or_else(|| ParseError::UnsupportedVersion(lossy(version)))?;

    let request_line = RequestLine {
        method: lossy(method),
        target: lossy(target),
        version,
    };
    Ok(Some((request_line, line_len)))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
