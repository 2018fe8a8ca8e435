use std::io::{self, Read};

use proptest::prelude::*;

use wirestream::{
    HttpVersion, ParseError, ParserConfig, ParserState, Request, format_debug,
    format_headers_only, format_json, parse_request, parse_request_line, read_request,
    read_request_with_config,
};

/// Serves `data` at most `chunk_size` bytes per read, then reports EOF.
struct ChunkReader<'a> {
    data: &'a [u8],
    chunk_size: usize,
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    fn new(data: &'a [u8], chunk_size: usize) -> Self {
        Self {
            data,
            chunk_size,
            pos: 0,
        }
    }
}

impl Read for ChunkReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self
            .chunk_size
            .min(buf.len())
            .min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn read_chunked(data: &[u8], chunk_size: usize) -> Result<Request, ParseError> {
    read_request(ChunkReader::new(data, chunk_size))
}

// =========================================================================
// Request line
// =========================================================================

#[test]
fn request_line_fed_one_byte_at_a_time() {
    let req = read_chunked(b"GET / HTTP/1.1\r\n\r\n", 1).expect("should parse");
    let line = req.request_line.as_ref().expect("request line");
    assert_eq!(line.method, "GET");
    assert_eq!(line.target, "/");
    assert_eq!(line.version, HttpVersion::Http11);
    assert!(req.headers.is_empty());
    assert_eq!(req.state(), ParserState::Done);
}

#[test]
fn request_line_with_path() {
    let raw = b"GET /coffee HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n";
    let req = read_chunked(raw, 3).expect("should parse");
    assert_eq!(req.method(), "GET");
    assert_eq!(req.target(), "/coffee");
}

#[test]
fn request_line_with_query_params() {
    let req = read_chunked(b"GET /search?q=test&lang=en HTTP/1.1\r\n\r\n", 1)
        .expect("should parse");
    assert_eq!(req.target(), "/search?q=test&lang=en");
    assert_eq!(req.path(), "/search");
}

#[test]
fn http_10_version() {
    let req = read_chunked(b"GET /legacy HTTP/1.0\r\n\r\n", 4).expect("should parse");
    assert_eq!(
        req.request_line.as_ref().map(|l| l.version),
        Some(HttpVersion::Http10)
    );
}

#[test]
fn invalid_number_of_parts() {
    let err = read_chunked(b"/coffee HTTP/1.1\r\nHost: localhost\r\n\r\n", 3).unwrap_err();
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));

    let err = read_chunked(b"GET /coffee HTTP/1.1 trailing\r\n\r\n", 3).unwrap_err();
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));
}

#[test]
fn lowercase_method_rejected() {
    let err = read_chunked(b"get / HTTP/1.1\r\n\r\n", 2).unwrap_err();
    assert!(matches!(err, ParseError::InvalidMethod(_)));
}

#[test]
fn target_must_start_with_slash() {
    let err = read_chunked(b"GET coffee HTTP/1.1\r\n\r\n", 2).unwrap_err();
    assert!(matches!(err, ParseError::InvalidTarget(_)));
}

#[test]
fn unsupported_version_rejected() {
    let err = read_chunked(b"GET / HTTP/1.5\r\n\r\n", 2).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedVersion(_)));
}

// =========================================================================
// Headers
// =========================================================================

#[test]
fn standard_headers() {
    let raw = b"GET / HTTP/1.1\r\nHost: localhost:42069\r\nUser-Agent: curl/7.81.0\r\nAccept: */*\r\n\r\n";
    let req = read_chunked(raw, 3).expect("should parse");
    assert_eq!(req.headers.get("host"), Some("localhost:42069"));
    assert_eq!(req.headers.get("user-agent"), Some("curl/7.81.0"));
    assert_eq!(req.headers.get("accept"), Some("*/*"));
}

#[test]
fn header_lookup_is_case_insensitive() {
    let req = parse_request(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();
    for name in ["HOST", "host", "Host"] {
        assert_eq!(req.headers.get(name), Some("example.com"));
    }
}

#[test]
fn repeated_headers_are_merged() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\nAccept: text/html\r\naccept: application/json\r\n\r\n";
    let req = read_chunked(raw, 5).expect("should parse");
    assert_eq!(req.headers.get("Accept"), Some("text/html, application/json"));
}

#[test]
fn space_before_colon_rejected() {
    let err = read_chunked(b"GET / HTTP/1.1\r\nHost : x\r\n\r\n", 3).unwrap_err();
    assert!(matches!(err, ParseError::MalformedHeaderLine(_)));
}

#[test]
fn no_space_after_colon_accepted() {
    let req = read_chunked(b"GET / HTTP/1.1\r\nHost:x\r\n\r\n", 3).expect("should parse");
    assert_eq!(req.headers.get("host"), Some("x"));
}

#[test]
fn header_value_ows_is_trimmed() {
    let req = parse_request(b"GET / HTTP/1.1\r\nHost:   example.com \t \r\n\r\n").unwrap();
    assert_eq!(req.headers.get("Host"), Some("example.com"));
}

#[test]
fn invalid_field_name_rejected() {
    let err = parse_request(b"GET / HTTP/1.1\r\nBad[Name]: v\r\n\r\n").unwrap_err();
    assert!(matches!(err, ParseError::InvalidFieldName(_)));
}

#[test]
fn missing_end_of_headers_is_unexpected_eof() {
    let err = read_chunked(b"GET / HTTP/1.1\r\nHost: h\r\n", 3).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEndOfStream));
}

#[test]
fn duplicate_host_rejected_by_header_gate() {
    let err = parse_request(b"GET / HTTP/1.1\r\nHost: a\r\nHost: b\r\n\r\n").unwrap_err();
    assert!(matches!(err, ParseError::MalformedHeaders(_)));
}

#[test]
fn missing_host_only_rejected_when_required() {
    let raw = b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n";
    assert!(parse_request(raw).is_ok());

    let config = ParserConfig {
        require_host: true,
        ..ParserConfig::default()
    };
    let err = read_request_with_config(&raw[..], &config).unwrap_err();
    assert!(matches!(err, ParseError::MalformedHeaders(_)));
}

// =========================================================================
// Body (Content-Length)
// =========================================================================

#[test]
fn tiny_body() {
    let raw = b"POST /tiny HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    for chunk_size in [1, 3, raw.len()] {
        let req = read_chunked(raw, chunk_size).expect("should parse");
        assert_eq!(req.body, b"hello");
        assert_eq!(req.headers.get("content-length"), Some("5"));
    }
}

#[test]
fn standard_body() {
    let raw = b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 13\r\n\r\nhello world!\n";
    let req = read_chunked(raw, 3).expect("should parse");
    assert_eq!(req.body_as_str(), Some("hello world!\n"));
}

#[test]
fn empty_body_with_zero_content_length() {
    let raw = b"POST /empty HTTP/1.1\r\nHost: h\r\nContent-Length: 0\r\n\r\n";
    let req = read_chunked(raw, 3).expect("should parse");
    assert!(req.is_done());
    assert!(req.body.is_empty());
}

#[test]
fn no_content_length_means_no_body() {
    let req = read_chunked(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n", 3).expect("should parse");
    assert!(req.body.is_empty());
}

#[test]
fn body_shorter_than_content_length() {
    let raw = b"POST /submit HTTP/1.1\r\nHost: localhost:42069\r\nContent-Length: 20\r\n\r\npartial content";
    let err = read_chunked(raw, 3).unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedEndOfStream));
}

#[test]
fn body_longer_than_content_length() {
    let raw = b"POST /submit HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\n\r\nabcdef";
    let err = read_chunked(raw, raw.len()).unwrap_err();
    assert!(matches!(
        err,
        ParseError::BodyLengthMismatch { expected: 3, .. }
    ));
}

#[test]
fn invalid_content_length_rejected() {
    for value in ["abc", "-1", "1.5", "+3"] {
        let raw = format!("POST / HTTP/1.1\r\nHost: h\r\nContent-Length: {value}\r\n\r\n");
        let err = parse_request(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength(_)), "{value}");
    }
}

#[test]
fn signed_content_length_does_not_frame_a_body() {
    let raw = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: +3\r\n\r\nabc";
    let err = parse_request(&raw[..]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidContentLength(ref v) if v == "+3"), "{err}");
}

#[test]
fn large_body_spans_many_reads() {
    let body = "X".repeat(100_000);
    let raw = format!(
        "POST / HTTP/1.1\r\n\
         Host: h\r\n\
         Content-Length: {}\r\n\r\n\
         {}",
        body.len(),
        body
    );
    let req = parse_request(raw.as_bytes()).unwrap();
    assert_eq!(req.body_as_str(), Some(body.as_str()));
}

// =========================================================================
// Transfer-Encoding
// =========================================================================

#[test]
fn chunked_body_is_detected_not_decoded() {
    let raw = b"POST /upload HTTP/1.1\r\n\
        Host: example.com\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        5\r\nHello\r\n0\r\n\r\n";
    let req = read_chunked(raw, 7).expect("should parse");
    assert!(req.is_done());
    assert!(req.body.is_empty());
    assert_eq!(req.headers.get("transfer-encoding"), Some("chunked"));
}

#[test]
fn content_length_with_transfer_encoding_rejected() {
    let raw = b"POST / HTTP/1.1\r\n\
        Host: h\r\n\
        Content-Length: 999\r\n\
        Transfer-Encoding: chunked\r\n\r\n\
        3\r\nabc\r\n0\r\n\r\n";
    let err = parse_request(raw).unwrap_err();
    assert!(matches!(err, ParseError::MalformedHeaders(_)));
}

// =========================================================================
// Buffer limits
// =========================================================================

#[test]
fn header_block_larger_than_buffer() {
    let mut raw = String::from("GET / HTTP/1.1\r\nHost: h\r\n");
    for i in 0..100 {
        raw.push_str(&format!("X-Header-{i}: value-{i}\r\n"));
    }
    raw.push_str("\r\n");

    let err = read_chunked(raw.as_bytes(), 64).unwrap_err();
    assert!(matches!(err, ParseError::RequestTooLarge { capacity: 1024 }));

    let config = ParserConfig {
        buffer_capacity: 8 * 1024,
        ..ParserConfig::default()
    };
    let req = read_request_with_config(raw.as_bytes(), &config).unwrap();
    assert_eq!(req.headers.len(), 101);
}

// =========================================================================
// Bytes after the request
// =========================================================================

#[test]
fn trailing_request_is_ignored() {
    let raw = b"GET / HTTP/1.1\r\nHost: h\r\n\r\nGET /next HTTP/1.1\r\n\r\n";
    let req = parse_request(raw).unwrap();
    assert_eq!(req.target(), "/");
}

// =========================================================================
// Output formatting
// =========================================================================

#[test]
fn json_output_compact() {
    let req = parse_request(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
    let json = format_json(&req, false);
    assert!(json.contains("\"method\":\"GET\""));
    assert!(json.contains("\"target\":\"/\""));
    assert!(json.contains("\"version\":\"1.1\""));
    assert!(json.contains("\"headers\":{\"host\":\"h\"}"));
}

#[test]
fn json_output_pretty() {
    let req = parse_request(b"GET /pretty HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
    let json = format_json(&req, true);
    assert!(json.contains('\n'));
    assert!(json.contains("  "));
}

#[test]
fn debug_output_contains_sections() {
    let req = parse_request(b"GET /test HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
    let dbg = format_debug(&req);
    assert!(dbg.contains("=== HTTP Request ==="));
    assert!(dbg.contains("Target:  /test"));
    assert!(dbg.contains("--- Headers (1) ---"));
    assert!(dbg.contains("--- No Body ---"));
}

#[test]
fn headers_only_output() {
    let req = parse_request(b"GET /path HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n")
        .unwrap();
    assert_eq!(
        format_headers_only(&req),
        "GET /path HTTP/1.1\nhost: example.com\naccept: */*\n"
    );
}

// =========================================================================
// Properties
// =========================================================================

fn version_strategy() -> impl Strategy<Value = HttpVersion> {
    prop_oneof![
        Just(HttpVersion::Http10),
        Just(HttpVersion::Http11),
        Just(HttpVersion::Http20),
        Just(HttpVersion::Http30),
    ]
}

fn message_strategy() -> impl Strategy<Value = Vec<u8>> {
    (
        "[A-Z]{1,8}",
        "/[a-z0-9/?=&%.-]{0,24}",
        prop::collection::vec(("X-[A-Za-z0-9-]{1,10}", "[ -~]{0,20}"), 0..6),
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(method, target, headers, body)| {
            let mut raw = format!("{method} {target} HTTP/1.1\r\nHost: example.com\r\n");
            for (name, value) in headers {
                raw.push_str(&format!("{name}: {value}\r\n"));
            }
            raw.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
            let mut raw = raw.into_bytes();
            raw.extend_from_slice(&body);
            raw
        })
}

proptest! {
    #[test]
    fn request_line_round_trips(
        method in "[A-Z]{1,12}",
        target in "/[!-~]{0,40}",
        version in version_strategy(),
    ) {
        let raw = format!("{method} {target} {version}\r\n");
        let (line, len) = parse_request_line(raw.as_bytes()).unwrap().unwrap();
        prop_assert_eq!(&line.method, &method);
        prop_assert_eq!(&line.target, &target);
        prop_assert_eq!(line.version, version);
        prop_assert_eq!(len, raw.len() - 2);
    }

    #[test]
    fn result_is_independent_of_chunk_size(
        raw in message_strategy(),
        chunk_size in 1usize..64,
    ) {
        let whole = read_chunked(&raw, raw.len()).unwrap();
        let split = read_chunked(&raw, chunk_size).unwrap();
        let trickled = read_chunked(&raw, 1).unwrap();

        prop_assert_eq!(&whole.request_line, &split.request_line);
        prop_assert_eq!(&whole.headers, &split.headers);
        prop_assert_eq!(&whole.body, &split.body);
        prop_assert_eq!(&whole.request_line, &trickled.request_line);
        prop_assert_eq!(&whole.headers, &trickled.headers);
        prop_assert_eq!(&whole.body, &trickled.body);
    }
}
