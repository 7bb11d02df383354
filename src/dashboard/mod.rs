//! Quoteboard Dashboard
//!
//! - **state**: the two display slices and change notifications
//! - **scheduler**: periodic and manual refresh of both slices
//! - **render**: chart configuration and price table from a snapshot
//!
//! # Data Flow
//!
//! ```text
//! tick / manual refresh
//!   → QuoteBackend (rate)    → QuoteProjector → current_rate_text
//!   → QuoteBackend (archive) → QuoteProjector → price_history
//!                                                   ↓
//!                                     StateChange → render
//! ```

pub mod render;
pub mod scheduler;
pub mod state;

pub use render::{
    format_timestamp, render_chart, render_dashboard, render_table, ChartConfig, ChartSeries,
    HistoryRow, HistoryTable,
};
pub use scheduler::{RefreshHandle, RefreshScheduler, SchedulerError};
pub use state::{DisplaySnapshot, DisplayState, StateChange};
