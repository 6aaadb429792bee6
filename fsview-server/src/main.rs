use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use fsview_core::config::SearchBackendKind;
use fsview_core::{Config, ToolRegistry};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// External grep process
    Grep,
    /// In-process regex scan
    Regex,
}

impl From<Backend> for SearchBackendKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Grep => SearchBackendKind::Grep,
            Backend::Regex => SearchBackendKind::Regex,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "fsview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Read-only filesystem inspection tools over line-delimited JSON")]
struct Args {
    /// Config file (defaults to ~/.fsview/config.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory every tool is confined to
    #[arg(long, value_name = "DIR")]
    base_path: Option<PathBuf>,

    /// Largest file read_file_contents will return, in bytes
    #[arg(long, value_name = "BYTES")]
    max_file_size: Option<u64>,

    /// Serve over TCP on this address instead of stdio
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Per-query search timeout in seconds
    #[arg(long, value_name = "SECS")]
    search_timeout: Option<u64>,

    /// Search implementation
    #[arg(long, value_enum)]
    backend: Option<Backend>,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let args = Args::parse();
    let config = Arc::new(load_config(args)?);

    info!(
        base_path = %config.base_path.display(),
        max_file_size = config.max_file_size,
        backend = ?config.search_backend,
        "Configuration loaded"
    );

    let registry = Arc::new(ToolRegistry::for_config(config.clone()));

    match &config.listen {
        Some(addr) => fsview_server::serve_tcp(addr, registry).await,
        None => fsview_server::serve_stdio(registry).await,
    }
}

fn load_config(args: Args) -> Result<Config> {
    let path = match args.config {
        Some(path) => Some(path),
        None => Config::default_path().ok().filter(|p| p.exists()),
    };

    let mut config = match &path {
        Some(path) => {
            info!(path = %path.display(), "Loading config file");
            Config::load(path)?
        }
        None => Config::default(),
    };

    if let Some(base_path) = args.base_path {
        config.base_path = base_path;
    }
    if let Some(max_file_size) = args.max_file_size {
        config.max_file_size = max_file_size;
    }
    if let Some(listen) = args.listen {
        config.listen = Some(listen);
    }
    if let Some(secs) = args.search_timeout {
        config.search_timeout_secs = secs;
    }
    if let Some(backend) = args.backend {
        config.search_backend = backend.into();
    }

    config.validate()
}

fn setup_tracing() {
    use tracing_subscriber::fmt;

    // stdout carries responses
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
