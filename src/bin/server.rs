use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser as ClapParser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wirestream::{Request, ResponseWriter, Router, Server, ServerConfig};

/// wirestream server — answers `/` and echoes bodies posted to `/upload`.
#[derive(ClapParser)]
#[command(name = "wirestream-server", version, about, long_about = None)]
struct Cli {
    /// JSON file with a server configuration; flags override its fields.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    addr: Option<String>,

    /// Per-connection read timeout in milliseconds (0 disables it).
    #[arg(long, value_name = "MS")]
    read_timeout_ms: Option<u64>,

    /// Read buffer capacity; the request line and headers must fit in it.
    #[arg(long)]
    buffer_size: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let router = Arc::new(Router::new());
    router.handle("/", hello);
    router.handle("/upload", upload);

    let server = match Server::bind(config, router) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "could not bind");
            process::exit(1);
        }
    };

    if let Err(e) = server.serve() {
        error!(error = %e, "server stopped");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = &cli.addr {
        config.addr.clone_from(addr);
    }
    if let Some(ms) = cli.read_timeout_ms {
        config.read_timeout_ms = Some(ms);
    }
    if let Some(size) = cli.buffer_size {
        config.parser.buffer_capacity = size;
    }
    Ok(config)
}

fn hello(w: &mut dyn ResponseWriter, _req: &Request) -> io::Result<()> {
    w.headers_mut().replace("Content-Type", "text/plain");
    w.write_header(201)?;
    w.write(b"Hello World!\n")?;
    Ok(())
}

fn upload(w: &mut dyn ResponseWriter, req: &Request) -> io::Result<()> {
    info!(bytes = req.body.len(), "upload received");
    w.headers_mut().replace("Content-Type", "text/plain");
    w.write_header(201)?;
    w.write(b"I received your data: ")?;
    w.write(&req.body)?;
    Ok(())
}
