//! Quoteboard
//!
//! Live terminal dashboard for the ICP/USD exchange rate. Redraws whenever
//! the rate or the price history changes.
//!
//! Commands on stdin: `r` refreshes the rate now, `q` quits.

use clap::Parser;
use quoteboard::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser)]
#[command(name = "quoteboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live ICP/USD exchange-rate dashboard")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Quote backend URL, overriding the config
    #[arg(long)]
    backend_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = args.backend_url {
        config.backend.url = url;
    }

    logging::init(&config.logging)?;
    tracing::info!("Quoteboard v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Quote backend: {}", config.backend.url);

    let backend = Arc::new(HttpQuoteBackend::new(config.backend.clone())?);
    let state = Arc::new(DisplayState::new());
    let mut changes = state.subscribe();
    let scheduler = RefreshScheduler::new(backend, state.clone(), &config.refresh);

    draw(&state, &config.display).await;
    let handle = scheduler.start()?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(_) | Err(RecvError::Lagged(_)) => draw(&state, &config.display).await,
                Err(RecvError::Closed) => break,
            },
            line = input.next_line(), if input_open => match line? {
                Some(command) => match command.trim() {
                    "r" | "refresh" => {
                        scheduler.refresh_rate_now();
                    }
                    "q" | "quit" => break,
                    "" => {}
                    other => println!("Unknown command: {} (r = refresh rate, q = quit)", other),
                },
                None => {
                    tracing::debug!("stdin closed, Ctrl-C to quit");
                    input_open = false;
                }
            },
            _ = &mut shutdown => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    scheduler.stop(handle).await;
    Ok(())
}

async fn draw(state: &DisplayState, display: &DisplayConfig) {
    let snapshot = state.snapshot().await;

    // Clear screen, cursor home
    print!("\x1B[2J\x1B[H");
    println!("{}", render_dashboard(&snapshot, display));
    println!("[r] refresh rate   [q] quit");
}
