//! Cross-post detector binary.
//! Loads the configuration, wires feeds, detectors and listeners, and runs
//! the pipeline until Ctrl-C.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crosspost_detector::{app, config, metrics, RunOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "crosspost-detector")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML, or JSON by extension).
    #[arg(short, long, env = config::ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// Stop after processing this many posts.
    #[arg(long)]
    max_posts: Option<usize>,

    /// Serve Prometheus metrics on this address, e.g. 127.0.0.1:9000.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crosspost_detector=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; SMTP_PASS and XPD_CONFIG may come from there.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Some(addr) = cli.metrics_addr {
        metrics::install_exporter(addr)?;
    }

    let path = config::resolve_path(cli.config);
    tracing::info!(config = %path.display(), "starting");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            signal.cancel();
        }
    });

    let opts = RunOptions {
        max_posts: cli.max_posts,
        max_rounds: None,
        shutdown,
    };
    let report = app::run_from_path(&path, opts).await?;

    tracing::info!(
        processed = report.processed,
        duplicates = report.duplicates,
        cross_posts = report.cross_posts,
        "stopped"
    );
    Ok(())
}
