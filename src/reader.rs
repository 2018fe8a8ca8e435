use std::io::{ErrorKind, Read};

use tracing::trace;

use crate::error::ParseError;
use crate::parser::{ParserConfig, ParserState, Request};

/// Read one request from `source` using the default [`ParserConfig`].
///
/// # Errors
///
/// See [`read_request_with_config`].
pub fn read_request<R: Read>(source: R) -> Result<Request, ParseError> {
    read_request_with_config(source, &ParserConfig::default())
}

/// Read one request from `source`, feeding the parser as bytes arrive.
///
/// The driver owns a buffer of `config.buffer_capacity` bytes. Consumed
/// bytes are dropped from the front after every parser pass. The request
/// line and header section together must fit in that capacity; the body may
/// be any length. Bytes following a complete request are left unread or
/// discarded.
///
/// # Errors
///
/// - [`ParseError::UnexpectedEndOfStream`] if `source` ends first.
/// - [`ParseError::RequestTooLarge`] if the request line and header section
///   outgrow the buffer.
/// - [`ParseError::Io`] for read failures other than `Interrupted`.
/// - Any error produced by [`Request::feed`].
pub fn read_request_with_config<R: Read>(
    mut source: R,
    config: &ParserConfig,
) -> Result<Request, ParseError> {
    let capacity = config.buffer_capacity.max(1);
    let mut buf = vec![0u8; capacity];
    let mut filled = 0;
    let mut head_bytes = 0;
    let mut request = Request::with_config(config);

    while !request.is_done() {
        if filled == capacity {
            return Err(ParseError::RequestTooLarge { capacity });
        }

        let n = match source.read(&mut buf[filled..]) {
            Ok(0) => return Err(ParseError::UnexpectedEndOfStream),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        filled += n;
        trace!(read = n, buffered = filled, "read from source");

        // Keep feeding until the parser stalls: one read may carry the
        // request line, the header section and part of the body.
        loop {
            let in_head = is_head(&request);
            let consumed = request.feed(&buf[..filled])?;
            if in_head {
                head_bytes += consumed;
            }
            if consumed > 0 {
                buf.copy_within(consumed..filled, 0);
                filled -= consumed;
            }
            if consumed == 0 || request.is_done() {
                break;
            }
        }

        if is_head(&request) && head_bytes + filled >= capacity {
            return Err(ParseError::RequestTooLarge { capacity });
        }
    }

    Ok(request)
}

fn is_head(request: &Request) -> bool {
    matches!(request.state(), ParserState::Init | ParserState::Headers)
}
