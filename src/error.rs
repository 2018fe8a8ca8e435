use std::io;

/// Errors that can occur while reading and parsing an HTTP request.
///
/// Every variant is fatal to the request being parsed; the parser never
/// tries to resynchronize on a malformed stream.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The request line did not split into exactly three tokens.
    #[error("malformed request line: '{0}'")]
    MalformedRequestLine(String),
    /// The method token contains something other than uppercase ASCII letters.
    #[error("invalid HTTP method: '{0}'")]
    InvalidMethod(String),
    /// The request target does not start with `/`.
    #[error("invalid request target: '{0}'")]
    InvalidTarget(String),
    /// The version token is not `HTTP/1.0`, `HTTP/1.1`, `HTTP/2.0` or `HTTP/3.0`.
    #[error("unsupported HTTP version: '{0}'")]
    UnsupportedVersion(String),
    /// A field line has no colon, or whitespace sits right before the colon.
    #[error("malformed header line: '{0}'")]
    MalformedHeaderLine(String),
    /// A field name contains a non-token character.
    #[error("invalid header field name: '{0}'")]
    InvalidFieldName(String),
    /// The header section as a whole violates a framing rule.
    #[error("malformed headers: {0}")]
    MalformedHeaders(&'static str),
    /// The `Content-Length` value is not a non-negative integer.
    #[error("invalid Content-Length: '{0}'")]
    InvalidContentLength(String),
    /// The peer sent more body bytes than `Content-Length` declared.
    #[error("body length mismatch: expected {expected} bytes, received at least {received}")]
    BodyLengthMismatch {
        /// Declared `Content-Length`.
        expected: usize,
        /// Body bytes seen so far, including the excess.
        received: usize,
    },
    /// The stream ended before a complete request was parsed.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,
    /// The read buffer filled up without the parser making progress.
    #[error("request exceeds the {capacity}-byte read buffer")]
    RequestTooLarge {
        /// Capacity of the driver's read buffer.
        capacity: usize,
    },
    /// The byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from serving a single connection.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The request could not be read; nothing was written back.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The handler or the response write failed.
    #[error("response failed: {0}")]
    Respond(#[from] io::Error),
}
