//! Display Rendering
//!
//! Pure functions from a [`DisplaySnapshot`] to what the dashboard shows:
//! a chart configuration for a charting library and a price table. Nothing
//! here holds state; everything is recomputed on every change.

use chrono::{Local, TimeZone};
use serde::Serialize;
use std::fmt::{self, Write};

use super::state::DisplaySnapshot;
use crate::config::DisplayConfig;
use crate::quote::{nanos_to_millis, Quote};

/// Line color of the price series
const SERIES_COLOR: &str = "rgb(75, 192, 192)";

/// Line smoothing of the price series
const SERIES_TENSION: f64 = 0.1;

const TIMESTAMP_HEADER: &str = "Timestamp";
const PRICE_HEADER: &str = "Price (USD)";

/// Line chart configuration: x = timestamp labels, y = amounts, one series
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub title: String,
    pub legend_position: String,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartSeries>,
}

/// One line series
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub tension: f64,
}

/// Price history as table rows, in history order
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTable {
    pub rows: Vec<HistoryRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub timestamp: String,
    pub price: String,
}

/// Format a nanosecond capture time as a local-time label.
///
/// An unusable `format` falls back to RFC 3339.
pub fn format_timestamp(capture_time: u64, format: &str) -> String {
    let millis = nanos_to_millis(capture_time);

    let Some(local) = Local.timestamp_millis_opt(millis).single() else {
        return millis.to_string();
    };

    let mut label = String::new();
    if write!(label, "{}", local.format(format)).is_err() {
        tracing::debug!(format, "Invalid timestamp format, using RFC 3339");
        return local.to_rfc3339();
    }
    label
}

/// Build the chart configuration for the price history
pub fn render_chart(snapshot: &DisplaySnapshot, config: &DisplayConfig) -> ChartConfig {
    let history = &snapshot.price_history;

    ChartConfig {
        title: config.title.clone(),
        legend_position: "top".to_string(),
        labels: history
            .iter()
            .map(|quote| format_timestamp(quote.capture_time, &config.timestamp_format))
            .collect(),
        datasets: vec![ChartSeries {
            label: config.series_label.clone(),
            data: history.iter().map(|quote| quote.amount).collect(),
            border_color: SERIES_COLOR.to_string(),
            tension: SERIES_TENSION,
        }],
    }
}

/// Build the price table for the price history
pub fn render_table(snapshot: &DisplaySnapshot, config: &DisplayConfig) -> HistoryTable {
    HistoryTable {
        rows: snapshot
            .price_history
            .iter()
            .map(|quote| row(quote, &config.timestamp_format))
            .collect(),
    }
}

fn row(quote: &Quote, format: &str) -> HistoryRow {
    HistoryRow {
        timestamp: format_timestamp(quote.capture_time, format),
        price: quote.dollars(),
    }
}

/// Full text view: current rate, then the history table
pub fn render_dashboard(snapshot: &DisplaySnapshot, config: &DisplayConfig) -> String {
    format!(
        "Current Rate: {}\n\n{}\n{}",
        snapshot.current_rate_text,
        config.title,
        render_table(snapshot, config)
    )
}

impl fmt::Display for HistoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts_width = self
            .rows
            .iter()
            .map(|r| r.timestamp.chars().count())
            .max()
            .unwrap_or(0)
            .max(TIMESTAMP_HEADER.len());
        let price_width = self
            .rows
            .iter()
            .map(|r| r.price.chars().count())
            .max()
            .unwrap_or(0)
            .max(PRICE_HEADER.len());

        writeln!(f, "{:<ts_width$} | {:>price_width$}", TIMESTAMP_HEADER, PRICE_HEADER)?;
        writeln!(f, "{}-+-{}", "-".repeat(ts_width), "-".repeat(price_width))?;

        if self.rows.is_empty() {
            return writeln!(f, "(no price history yet)");
        }

        for r in &self.rows {
            writeln!(f, "{:<ts_width$} | {:>price_width$}", r.timestamp, r.price)?;
        }
        Ok(())
    }
}
