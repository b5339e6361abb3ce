//! Reel Tracker (reel-tracker) - capture replay tool
//!
//! Replays recorded network exchanges through a page session and prints
//! which media record the tracker would resolve for a given page location.
//! No live page is involved, so only the location-based and recency-based
//! strategies can answer.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reel_common::{time, EventBus, LoggingConfig, TrackerConfig};
use reel_tracker::capture::load_capture;
use reel_tracker::{PageSession, ResolveContext};

/// Command-line arguments for reel-tracker
#[derive(Parser, Debug)]
#[command(name = "reel-tracker")]
#[command(about = "Replay captured responses and resolve the current media record")]
#[command(version)]
struct Args {
    /// Captured exchanges, one JSON object per line ({url, status, body})
    #[arg(short, long)]
    capture: PathBuf,

    /// Page location to resolve against
    #[arg(short, long, default_value = "/")]
    location: String,

    /// Configuration file (overrides REEL_CONFIG)
    #[arg(long, env = "REEL_CONFIG")]
    config: Option<PathBuf>,

    /// Print every stored record instead of resolving
    #[arg(long)]
    dump: bool,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("reel_tracker={0},reel_common={0}", logging.level).into());

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TrackerConfig::resolve_and_load(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    let exchanges = load_capture(&args.capture)
        .with_context(|| format!("Failed to read capture {}", args.capture.display()))?;
    info!(
        "Replaying {} exchanges from {}",
        exchanges.len(),
        args.capture.display()
    );

    let mut session = PageSession::new(config.clone(), EventBus::new(config.event_bus_capacity))
        .context("Invalid tracker configuration")?;
    let observed = exchanges
        .iter()
        .filter(|exchange| session.observe_exchange(exchange).is_some())
        .count();
    info!(
        observed,
        records = session.index().len(),
        "Replay complete"
    );

    let output = if args.dump {
        serde_json::to_value(session.index().records())?
    } else {
        match session.resolve(&ResolveContext::new(&args.location)) {
            Some(resolution) => json!({
                "strategy": resolution.strategy,
                "created_at_utc": resolution
                    .record
                    .created_at
                    .and_then(time::from_unix_seconds)
                    .map(|at| at.to_rfc3339()),
                "record": resolution.record,
            }),
            None => {
                warn!(location = %args.location, "No media record resolved");
                serde_json::Value::Null
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
