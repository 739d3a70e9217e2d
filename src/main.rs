use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cascii_stream::{StreamConfig, StreamServer};

#[derive(Parser, Debug)]
#[command(name = "cascii-stream", version, about)]
struct Cli {
    /// TOML config file. Defaults apply for anything it leaves out.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080.
    #[arg(long)]
    bind: Option<String>,

    /// Directory of frame files (overrides the primary frame directory).
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Cap on a single stream's lifetime, in milliseconds.
    #[arg(long)]
    max_stream_ms: Option<u64>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = match &cli.config {
        Some(path) => StreamConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => StreamConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(dir) = cli.frames_dir {
        config.frames.primary_dir = dir;
    }
    if let Some(ms) = cli.max_stream_ms {
        config.max_stream_ms = ms;
    }

    let server = StreamServer::bind(config).context("failed to start server")?;
    server.run();
    Ok(())
}
