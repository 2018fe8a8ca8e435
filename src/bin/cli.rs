use std::io::{self, IsTerminal, Read};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{CommandFactory, Parser as ClapParser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wirestream::{
    ParserConfig, Request, format_debug, format_headers_only, format_json,
    read_request_with_config,
};

/// wirestream CLI — incremental HTTP/1.1 request parser.
///
/// Reads a raw HTTP request from a file, --raw string, or stdin and outputs
/// a structured representation in the chosen format. With --listen it
/// accepts TCP connections instead and prints every request it receives.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted so
/// you can pass a full HTTP request as a single shell argument.
#[derive(ClapParser)]
#[command(name = "wirestream-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw HTTP request.
    /// Reads from stdin when neither FILE, --raw nor --listen is given.
    #[arg(value_name = "FILE", conflicts_with = "listen")]
    file: Option<PathBuf>,

    /// Raw HTTP request string (escape sequences \r \n \t \\ are expanded).
    #[arg(long, conflicts_with = "listen")]
    raw: Option<String>,

    /// Accept connections on this address and print each parsed request.
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Hand the input to the parser at most this many bytes per read.
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Read buffer capacity; the request line and headers must fit in it.
    #[arg(long, default_value = "1024")]
    buffer_size: usize,

    /// Reject requests without a Host header.
    #[arg(long)]
    require_host: bool,

    /// With --listen, drop a connection that sends nothing for this many
    /// milliseconds (0 waits forever).
    #[arg(long, value_name = "MS", default_value = "30000")]
    read_timeout_ms: u64,
}

impl Cli {
    fn read_timeout(&self) -> Option<Duration> {
        Some(self.read_timeout_ms)
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable debug output
    Debug,
    /// Request-line + headers only
    Headers,
}

/// Hands out at most `chunk` bytes per `read` call.
struct Trickle<R> {
    inner: R,
    chunk: usize,
}

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ParserConfig {
        buffer_capacity: cli.buffer_size,
        require_host: cli.require_host,
    };

    if let Some(addr) = &cli.listen {
        if let Err(e) = listen(addr, &cli, &config) {
            eprintln!("Error listening on {addr}: {e}");
            process::exit(1);
        }
        return;
    }

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let data = match read_input(&cli) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    if data.is_empty() {
        eprintln!("Error: empty input");
        process::exit(1);
    }

    let source = Trickle {
        inner: data.as_slice(),
        chunk: cli.chunk_size.unwrap_or(usize::MAX).max(1),
    };

    let request = match read_request_with_config(source, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Parse error: {e}");
            process::exit(2);
        }
    };

    print!("{}", render(&cli, &request));
}

/// Print every request received on `addr`, one connection at a time. A
/// silent client is dropped after `--read-timeout-ms`.
fn listen(addr: &str, cli: &Cli, config: &ParserConfig) -> io::Result<()> {
    let listener = TcpListener::bind(addr)?;
    info!(addr = %listener.local_addr()?, "listening");

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        info!(peer = ?stream.peer_addr().ok(), "connection accepted");

        if let Err(e) = stream.set_read_timeout(cli.read_timeout()) {
            warn!(error = %e, "could not set read timeout");
        }

        match read_request_with_config(&stream, config) {
            Ok(request) => print!("{}", render(cli, &request)),
            Err(e) => warn!(error = %e, "could not parse request"),
        }
    }
    Ok(())
}

fn render(cli: &Cli, request: &Request) -> String {
    match cli.format {
        OutputFormat::Json => format!("{}\n", format_json(request, cli.pretty)),
        OutputFormat::Debug => format_debug(request),
        OutputFormat::Headers => format_headers_only(request),
    }
}

/// Read raw HTTP bytes from --raw, a file, or stdin.
fn read_input(cli: &Cli) -> Result<Vec<u8>, io::Error> {
    if let Some(raw) = &cli.raw {
        return Ok(unescape(raw).into_bytes());
    }
    match &cli.file {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
