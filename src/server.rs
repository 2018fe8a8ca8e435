use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::ServeError;
use crate::parser::ParserConfig;
use crate::reader::read_request_with_config;
use crate::response::{Response, ResponseWriter};
use crate::router::Handler;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Listener settings. Deserializable so the server binary can load them
/// from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on (default: `127.0.0.1:8000`).
    pub addr: String,
    /// Per-connection read deadline in milliseconds (default: 30 000).
    /// `None` waits forever on a silent peer.
    pub read_timeout_ms: Option<u64>,
    pub parser: ParserConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            read_timeout_ms: Some(30_000),
            parser: ParserConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Blocking HTTP server: one thread per accepted connection, one request
/// per connection.
pub struct Server {
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    config: ServerConfig,
}

impl Server {
    /// Bind `config.addr`. Requests are dispatched to `handler`, usually a
    /// shared [`Router`](crate::Router).
    pub fn bind(config: ServerConfig, handler: Arc<dyn Handler>) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.addr)?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Self {
            listener,
            handler,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails permanently.
    ///
    /// Failed accepts are logged and skipped; each connection is handled on
    /// its own thread.
    pub fn serve(self) -> io::Result<()> {
        let mut failures = 0;
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => {
                    failures = 0;
                    stream
                }
                Err(e) => {
                    failures += 1;
                    let pause = accept_backoff(failures);
                    error!(error = %e, failures, ?pause, "accept failed");
                    thread::sleep(pause);
                    continue;
                }
            };

            let handler = Arc::clone(&self.handler);
            let config = self.config.clone();
            thread::spawn(move || handle_stream(stream, handler.as_ref(), &config));
        }
        Ok(())
    }
}

/// Pause after the `failures`-th consecutive accept error: 10 ms doubling up
/// to one second, so errors such as EMFILE do not spin the loop.
fn accept_backoff(failures: u32) -> Duration {
    let ms = 10u64.saturating_mul(1u64 << failures.saturating_sub(1).min(7));
    Duration::from_millis(ms.min(1_000))
}

fn handle_stream(stream: TcpStream, handler: &dyn Handler, config: &ServerConfig) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_string(), |a| a.to_string());
    debug!(%peer, "accepted connection");

    if let Err(e) = stream.set_read_timeout(config.read_timeout()) {
        warn!(%peer, error = %e, "could not set read timeout");
    }

    match serve_connection(&stream, handler, &config.parser) {
        Ok(()) => debug!(%peer, "connection finished"),
        Err(ServeError::Parse(e)) => warn!(%peer, error = %e, "rejected request"),
        Err(e) => warn!(%peer, error = %e, "connection failed"),
    }
}

/// Read one request from `stream`, dispatch it, and write the response back.
///
/// A request that fails to parse gets no response at all; the caller is
/// expected to close the connection. If the handler writes nothing, an empty
/// `200 OK` is sent.
///
/// # Errors
///
/// [`ServeError::Parse`] when the request is rejected, [`ServeError::Respond`]
/// when the handler or a write fails.
pub fn serve_connection<S>(
    mut stream: S,
    handler: &dyn Handler,
    config: &ParserConfig,
) -> Result<(), ServeError>
where
    S: Read + Write,
{
    let request = read_request_with_config(&mut stream, config)?;
    info!(method = request.method(), target = request.target(), "request");

    let mut response = Response::new(&mut stream);
    handler.serve(&mut response, &request)?;
    if !response.is_header_written() {
        response.write_header(200)?;
    }
    response.into_inner()?;
    Ok(())
}
