use serde::{Serialize, Serializer};
use tracing::{debug, trace};

use crate::error::ParseError;
use crate::headers::{CRLF, Headers};
use crate::request_line::{RequestLine, parse_request_line};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Knobs for the parser and the stream driver.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Size of the driver's read buffer (default: 1 024). A request line or
    /// header line that does not fit is rejected as too large.
    pub buffer_capacity: usize,
    /// Reject requests without a `Host` field (default: `false`).
    pub require_host: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1_024,
            require_host: false,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the parser is within the message. Progression is strictly forward:
/// `Init → Headers → (BodyFixed →) Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParserState {
    /// Waiting for the request line.
    Init,
    /// Reading field lines.
    Headers,
    /// Reading a body of known length.
    BodyFixed,
    /// A complete request has been parsed.
    Done,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request under construction, and the finished product once
/// [`is_done`](Self::is_done) returns `true`.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub request_line: Option<RequestLine>,
    pub headers: Headers,
    #[serde(serialize_with = "serialize_body")]
    pub body: Vec<u8>,
    #[serde(skip)]
    body_length: usize,
    #[serde(skip)]
    require_host: bool,
    #[serde(skip)]
    state: ParserState,
}

/// Serialize body bytes as a UTF-8 string (lossy) for JSON output.
fn serialize_body<S: Serializer>(body: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(body))
}

impl Request {
    /// Create an empty request in the `Init` state.
    pub fn new() -> Self {
        Self::with_config(&ParserConfig::default())
    }

    pub fn with_config(config: &ParserConfig) -> Self {
        Self {
            request_line: None,
            headers: Headers::new(),
            body: Vec::new(),
            body_length: 0,
            require_host: config.require_host,
            state: ParserState::Init,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Method token, or `""` before the request line is parsed.
    pub fn method(&self) -> &str {
        self.request_line.as_ref().map_or("", |l| l.method.as_str())
    }

    /// Request target, or `""` before the request line is parsed.
    pub fn target(&self) -> &str {
        self.request_line.as_ref().map_or("", |l| l.target.as_str())
    }

    /// Request target without its query string.
    pub fn path(&self) -> &str {
        self.request_line.as_ref().map_or("", RequestLine::path)
    }

    /// Declared `Content-Length`, once the headers are complete.
    pub fn body_length(&self) -> usize {
        self.body_length
    }

    /// Return the body as a UTF-8 `&str` if it is valid UTF-8.
    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Consume as much of `data` as currently possible.
    ///
    /// `data` must start at the first byte not consumed by an earlier call.
    /// Returns the number of bytes consumed; anything after that offset has
    /// to be offered again once more data is available.
    ///
    /// # Errors
    ///
    /// Any [`ParseError`] raised by the request-line scanner, the header
    /// parser, the header gate or the body accounting. The request must be
    /// discarded after an error.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut read = 0;

        loop {
            match self.state {
                ParserState::Init => {
                    let Some((line, len)) = parse_request_line(&data[read..])? else {
                        break;
                    };
                    trace!(request_line = %line, "parsed request line");
                    self.request_line = Some(line);
                    read += len + CRLF.len();
                    self.state = ParserState::Headers;
                }

                ParserState::Headers => {
                    let progress = self.headers.parse(&data[read..])?;
                    read += progress.consumed;
                    if progress.complete {
                        read += CRLF.len();
                        self.finish_headers()?;
                    }
                    // Header bytes and body bytes are never accounted in the
                    // same call.
                    return Ok(read);
                }

                ParserState::BodyFixed => {
                    let remaining = self.body_length - self.body.len();
                    let available = data.len() - read;
                    if available > remaining {
                        return Err(ParseError::BodyLengthMismatch {
                            expected: self.body_length,
                            received: self.body.len() + available,
                        });
                    }
                    if available == 0 {
                        break;
                    }

                    self.body.extend_from_slice(&data[read..]);
                    read += available;
                    trace!(received = self.body.len(), expected = self.body_length, "body bytes");

                    if self.body.len() == self.body_length {
                        self.state = ParserState::Done;
                    }
                }

                ParserState::Done => break,
            }
        }

        Ok(read)
    }

    /// Run the header gate and choose the state that follows the header
    /// section.
    fn finish_headers(&mut self) -> Result<(), ParseError> {
        self.headers.validate_framing()?;
        if self.require_host && !self.headers.contains("host") {
            return Err(ParseError::MalformedHeaders("missing Host header"));
        }

        if let Some(value) = self.headers.get("content-length") {
            // `1*DIGIT` only; `str::parse` would also take a leading `+`.
            let length: usize = Some(value)
                .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| ParseError::InvalidContentLength(value.to_string()))?;

            if length == 0 {
                self.state = ParserState::Done;
            } else {
                self.body_length = length;
                // Cap the up-front allocation; the peer may be lying.
                self.body.reserve(length.min(65_536));
                self.state = ParserState::BodyFixed;
            }
        } else if self.headers.contains("transfer-encoding") {
            // Chunked bodies are not decoded. Stopping here keeps the body
            // from being read as another message.
            debug!("Transfer-Encoding present, body left unread");
            self.state = ParserState::Done;
        } else {
            self.state = ParserState::Done;
        }

        debug!(state = ?self.state, headers = self.headers.len(), "header section complete");
        Ok(())
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
