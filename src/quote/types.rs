//! Core data types for quotes and the quote archive
//!
//! - `Quote`: one price observation (capture time + USD amount)
//! - `ArchiveEntry`: one archived record as the backend returns it, fields undecoded
//! - `RatePayload`: the JSON document carried by both the live rate and archive entries

use serde::Deserialize;
use serde_json::Value;

/// Divisor converting backend capture times (nanoseconds) to milliseconds
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// A single price observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// Capture time in nanoseconds, as reported by the backend
    pub capture_time: u64,
    /// Price in USD
    pub amount: f64,
}

impl Quote {
    pub fn new(capture_time: u64, amount: f64) -> Self {
        Self {
            capture_time,
            amount,
        }
    }

    /// Capture time in milliseconds (truncating)
    pub fn capture_time_millis(&self) -> i64 {
        nanos_to_millis(self.capture_time)
    }

    /// Amount formatted as a dollar string, e.g. `$42.17`
    pub fn dollars(&self) -> String {
        format_dollars(self.amount)
    }
}

impl From<Quote> for (u64, f64) {
    fn from(quote: Quote) -> Self {
        (quote.capture_time, quote.amount)
    }
}

/// An archived quote record as returned by the backend.
///
/// Both fields are kept as raw JSON so that one bad record can be judged by
/// the projector's [`ArchivePolicy`](super::ArchivePolicy) instead of failing
/// the whole archive body. A missing field decodes as `null`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    /// Capture time in nanoseconds, a JSON integer or a decimal string
    #[serde(default)]
    pub capture_time: Value,
    /// The payload exactly as the backend stored it, a JSON string
    #[serde(default)]
    pub raw_json: Value,
}

impl ArchiveEntry {
    pub fn new(capture_time: u64, raw_json: impl Into<String>) -> Self {
        Self {
            capture_time: Value::from(capture_time),
            raw_json: Value::String(raw_json.into()),
        }
    }

    /// Capture time as nanoseconds, if it is a non-negative integer
    pub fn capture_time_nanos(&self) -> Option<u64> {
        match &self.capture_time {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The stored payload text, if `rawJson` is a string
    pub fn raw_json_str(&self) -> Option<&str> {
        self.raw_json.as_str()
    }
}

/// The ordered archive, in backend order
pub type QuoteArchive = Vec<ArchiveEntry>;

/// Rate payload: `{ "data": { "amount": <number>, ... } }`
///
/// Any other fields (`base`, `currency`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RatePayload {
    pub data: RateData,
}

/// Inner `data` object of a rate payload
#[derive(Debug, Clone, Deserialize)]
pub struct RateData {
    pub amount: Amount,
}

/// The `amount` field, which upstream exchanges send either as a number or a string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

/// Convert nanoseconds to milliseconds for display
pub fn nanos_to_millis(nanos: u64) -> i64 {
    (nanos / NANOS_PER_MILLI) as i64
}

/// Format an amount with a dollar prefix and no rounding
pub fn format_dollars(amount: impl std::fmt::Display) -> String {
    format!("${}", amount)
}
