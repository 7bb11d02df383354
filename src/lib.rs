//! # Quoteboard
//!
//! A live dashboard for a single exchange-rate quote (ICP/USD) and its price
//! history, read from a quote backend that fetches and archives quotes.
//!
//! ## Modules
//!
//! - [`quote`]: quote model and payload projection
//! - [`backend`]: the backend contract and its HTTP client
//! - [`dashboard`]: display state, refresh scheduling, rendering
//! - [`config`]: TOML + environment configuration
//! - [`logging`]: tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quoteboard::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let backend = Arc::new(HttpQuoteBackend::new(config.backend.clone())?);
//!     let state = Arc::new(DisplayState::new());
//!
//!     let scheduler = RefreshScheduler::new(backend, state.clone(), &config.refresh);
//!     let handle = scheduler.start()?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     println!("{}", render_dashboard(&state.snapshot().await, &config.display));
//!
//!     scheduler.stop(handle).await;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod logging;
pub mod quote;

pub use backend::{BackendError, BackendResult, HttpQuoteBackend, QuoteBackend};

pub use config::{
    BackendConfig, Config, ConfigError, DisplayConfig, LoggingConfig, RefreshConfig,
};

pub use dashboard::{
    format_timestamp, render_chart, render_dashboard, render_table, ChartConfig, DisplaySnapshot,
    DisplayState, HistoryTable, RefreshHandle, RefreshScheduler, SchedulerError, StateChange,
};

pub use quote::{
    ArchiveEntry, ArchivePolicy, ProjectionError, Quote, QuoteArchive, QuoteProjector,
    LOADING_TEXT, RATE_ERROR_TEXT,
};
