//! paper-feed binary entrypoint.
//! One invocation runs one pass (live by default, `--historical` for the backlog) and exits.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paper_feed::bootstrap::Runtime;
use paper_feed::config::{AppConfig, RunMode};

#[derive(Parser)]
#[command(
    name = "paper-feed",
    version,
    about = "Collect papers linked from a social feed into a spreadsheet"
)]
struct Cli {
    /// Import links from the historical text file instead of polling the feed
    #[arg(long)]
    historical: bool,

    /// Path to config TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Historical text file (overrides HISTORICAL_FILE)
    #[arg(long)]
    historical_file: Option<PathBuf>,
}

/// Compact logs by default; LOG_FORMAT=json switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("paper_feed=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mode = if cli.historical {
        RunMode::Historical
    } else {
        RunMode::Live
    };

    let mut cfg = match AppConfig::load(cli.config.as_deref(), mode) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            return ExitCode::from(2);
        }
    };
    if let Some(path) = cli.historical_file {
        cfg.historical_file = path;
    }

    let runtime = match Runtime::from_config(cfg) {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "startup failed");
            return ExitCode::from(2);
        }
    };

    // Item and feed failures are logged; the process still exits cleanly.
    if let Err(e) = runtime.run(mode).await {
        tracing::error!(error = %format!("{e:#}"), "pass aborted");
    }
    ExitCode::SUCCESS
}
