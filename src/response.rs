use std::io::{self, Write};

use crate::headers::Headers;

/// Reason phrase for the status codes this server emits. Anything else is
/// sent as `OK`.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// What a handler writes its response through.
pub trait ResponseWriter {
    /// Headers to send; changes after the header block went out are ignored.
    fn headers_mut(&mut self) -> &mut Headers;

    /// Write the status line and header block. Only the first call has any
    /// effect.
    fn write_header(&mut self, status: u16) -> io::Result<()>;

    /// Write body bytes, sending a `200` header block first if none was
    /// written yet.
    fn write(&mut self, body: &[u8]) -> io::Result<usize>;
}

/// [`ResponseWriter`] that writes straight to the connection.
#[derive(Debug)]
pub struct Response<W: Write> {
    out: W,
    headers: Headers,
    status: Option<u16>,
}

impl<W: Write> Response<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            headers: Headers::new(),
            status: None,
        }
    }

    /// Status that was sent, if the header block has been written.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_header_written(&self) -> bool {
        self.status.is_some()
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> ResponseWriter for Response<W> {
    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn write_header(&mut self, status: u16) -> io::Result<()> {
        if self.status.is_some() {
            return Ok(());
        }

        let mut head = format!("HTTP/1.1 {status} {}\r\n", reason_phrase(status));
        for (name, value) in self.headers.iter() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        self.out.write_all(head.as_bytes())?;
        self.status = Some(status);
        Ok(())
    }

    fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(200)?;
        }
        self.out.write_all(body)?;
        Ok(body.len())
    }
}
