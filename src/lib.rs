//! # wirestream
//!
//! An **incremental HTTP/1.1 request parser** driven by a byte stream, plus
//! the small blocking server built around it.
//!
//! Requests are reconstructed from reads of any size: the request line,
//! header section and a `Content-Length` body are consumed as they arrive,
//! without waiting for the whole message to be buffered. Chunked bodies are
//! detected but not decoded.
//!
//! ## Quick start — reading from a stream
//!
//! ```rust
//! use wirestream::read_request;
//!
//! let raw: &[u8] = b"POST /tiny HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
//! let request = read_request(raw).expect("valid request");
//! assert_eq!(request.method(), "POST");
//! assert_eq!(request.headers.get("content-length"), Some("5"));
//! assert_eq!(request.body, b"hello");
//! ```
//!
//! ## Quick start — feeding the parser by hand
//!
//! ```rust
//! use wirestream::{ParserState, Request};
//!
//! let mut request = Request::new();
//!
//! assert_eq!(request.feed(b"GET / HTTP/1.1\r\nHo").unwrap(), 16);
//! assert_eq!(request.state(), ParserState::Headers);
//!
//! request.feed(b"Host: example.com\r\n\r\n").unwrap();
//! assert!(request.is_done());
//! assert_eq!(request.target(), "/");
//! ```
//!
//! ## Serving
//!
//! ```no_run
//! use std::sync::Arc;
//! use wirestream::{Request, ResponseWriter, Router, Server, ServerConfig};
//!
//! let router = Arc::new(Router::new());
//! router.handle("/", |w: &mut dyn ResponseWriter, _req: &Request| {
//!     w.write(b"Hello World!\n").map(|_| ())
//! });
//! Server::bind(ServerConfig::default(), router)?.serve()?;
//! # Ok::<(), std::io::Error>(())
//! ```

mod error;
mod headers;
mod output;
mod parser;
mod reader;
mod request_line;
mod response;
mod router;
mod server;

// Re-export public API.
pub use error::{ParseError, ServeError};
pub use headers::{HeaderProgress, Headers};
pub use output::{format_debug, format_headers_only, format_json};
pub use parser::{ParserConfig, ParserState, Request};
pub use reader::{read_request, read_request_with_config};
pub use request_line::{HttpVersion, RequestLine, parse_request_line};
pub use response::{Response, ResponseWriter, reason_phrase};
pub use router::{Handler, Router};
pub use server::{Server, ServerConfig, serve_connection};

/// Parse a **complete** request held in memory.
///
/// This is a convenience wrapper around [`read_request_with_config`] with
/// the default limits.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed or ends early.
pub fn parse_request(data: &[u8]) -> Result<Request, ParseError> {
    read_request(data)
}
