//! Quoteboard CLI
//!
//! One-shot commands against the quote backend:
//! - Print the current rate
//! - Print the price history as a table or chart JSON
//! - Generate a default config file

use clap::{Parser, Subcommand};
use quoteboard::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quoteboard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "One-shot queries against the quote backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Quote backend URL, overriding the config
    #[arg(long, global = true)]
    pub backend_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and print the current rate
    Rate,

    /// Fetch and print the price history
    History {
        /// Print the chart configuration as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Skip unparseable archive entries instead of failing
        #[arg(long)]
        skip_invalid: bool,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = config::generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content)?;
                println!("Wrote default config to {}", path.display());
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = cli.backend_url {
        config.backend.url = url;
    }

    logging::init(&config.logging)?;
    let backend = HttpQuoteBackend::new(config.backend.clone())?;

    match cli.command {
        Commands::Rate => {
            let text =
                QuoteProjector::default().project_rate_response(backend.trigger_manual_fetch().await);
            println!("Current Rate: {}", text);
            if text == RATE_ERROR_TEXT {
                anyhow::bail!("could not fetch the current rate");
            }
        }

        Commands::History { json, skip_invalid } => {
            let policy = if skip_invalid {
                ArchivePolicy::SkipInvalid
            } else {
                config.refresh.archive_policy
            };

            let archive = backend.get_quote_archive().await?;
            let history = QuoteProjector::new(policy).project_archive(&archive)?;
            tracing::info!(entries = archive.len(), points = history.len(), "Archive projected");

            let snapshot = DisplaySnapshot {
                price_history: history,
                ..DisplaySnapshot::default()
            };

            if json {
                let chart = render_chart(&snapshot, &config.display);
                println!("{}", serde_json::to_string_pretty(&chart)?);
            } else {
                println!("{}", config.display.title);
                print!("{}", render_table(&snapshot, &config.display));
            }
        }

        // Written before the config was loaded
        Commands::Config { .. } => {}
    }

    Ok(())
}
