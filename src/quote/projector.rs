//! Quote Projector
//!
//! Converts raw backend payloads into display values. Failures never escape
//! the rate path: they are logged and replaced by a fixed placeholder. The
//! archive path reports failures to its caller according to [`ArchivePolicy`].

use serde::Deserialize;

use super::error::{ProjectionError, ProjectionResult};
use super::types::{format_dollars, Amount, ArchiveEntry, Quote, RatePayload};
use crate::backend::BackendError;

/// Text shown before the first rate arrives
pub const LOADING_TEXT: &str = "Loading...";

/// Text shown when the rate could not be fetched or parsed
pub const RATE_ERROR_TEXT: &str = "Error fetching rate";

/// What to do when some archive entries fail to parse
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePolicy {
    /// Any bad entry discards the whole batch; the previous history stays displayed
    #[default]
    AllOrNothing,
    /// Bad entries are logged and skipped
    SkipInvalid,
}

impl std::str::FromStr for ArchivePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all_or_nothing" | "all-or-nothing" => Ok(ArchivePolicy::AllOrNothing),
            "skip_invalid" | "skip-invalid" => Ok(ArchivePolicy::SkipInvalid),
            other => Err(format!("unknown archive policy: {}", other)),
        }
    }
}

/// Projects backend payloads into display state values
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteProjector {
    policy: ArchivePolicy,
}

impl QuoteProjector {
    pub fn new(policy: ArchivePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ArchivePolicy {
        self.policy
    }

    /// Project a raw rate payload into the current-rate text.
    ///
    /// Returns `"$<amount>"`, or [`RATE_ERROR_TEXT`] if the payload is unusable.
    /// A string amount is shown as sent, so `"8.50"` stays `$8.50`.
    pub fn project_current_rate(&self, raw: &str) -> String {
        match parse_amount_text(raw) {
            Ok(amount) => format_dollars(amount),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to project current rate");
                RATE_ERROR_TEXT.to_string()
            }
        }
    }

    /// Project the outcome of a rate call, folding backend failures into the placeholder
    pub fn project_rate_response(&self, response: Result<String, BackendError>) -> String {
        match response {
            Ok(raw) => self.project_current_rate(&raw),
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch current rate");
                RATE_ERROR_TEXT.to_string()
            }
        }
    }

    /// Project archive entries into an ordered price series.
    ///
    /// Input order and length are preserved; nothing is sorted or deduplicated.
    /// Under [`ArchivePolicy::AllOrNothing`] the first bad entry fails the batch.
    pub fn project_archive(&self, entries: &[ArchiveEntry]) -> ProjectionResult<Vec<Quote>> {
        let mut history = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            match project_entry(entry) {
                Ok(quote) => history.push(quote),
                Err(e) => match self.policy {
                    ArchivePolicy::AllOrNothing => {
                        return Err(ProjectionError::Entry {
                            index,
                            capture_time: entry.capture_time.to_string(),
                            source: Box::new(e),
                        });
                    }
                    ArchivePolicy::SkipInvalid => {
                        tracing::warn!(
                            index,
                            capture_time = %entry.capture_time,
                            error = %e,
                            "Skipping malformed archive entry"
                        );
                    }
                },
            }
        }

        Ok(history)
    }
}

/// Extract `data.amount` from a rate payload
pub fn parse_amount(raw: &str) -> ProjectionResult<f64> {
    let payload: RatePayload = serde_json::from_str(raw)?;
    checked_amount(&payload.data.amount)
}

/// Extract `data.amount` as display text, keeping the precision of a string amount
fn parse_amount_text(raw: &str) -> ProjectionResult<String> {
    let payload: RatePayload = serde_json::from_str(raw)?;
    let amount = checked_amount(&payload.data.amount)?;

    Ok(match payload.data.amount {
        Amount::Number(_) => amount.to_string(),
        Amount::Text(s) => s.trim().to_string(),
    })
}

fn checked_amount(amount: &Amount) -> ProjectionResult<f64> {
    let value = match amount {
        Amount::Number(n) => *n,
        Amount::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ProjectionError::InvalidAmount(s.clone()))?,
    };

    if !value.is_finite() || value < 0.0 {
        return Err(ProjectionError::InvalidAmount(value.to_string()));
    }

    Ok(value)
}

fn project_entry(entry: &ArchiveEntry) -> ProjectionResult<Quote> {
    let capture_time = entry
        .capture_time_nanos()
        .ok_or_else(|| ProjectionError::InvalidCaptureTime(entry.capture_time.to_string()))?;
    let raw = entry.raw_json_str().ok_or_else(|| {
        ProjectionError::Malformed(format!("rawJson is not a string: {}", entry.raw_json))
    })?;

    Ok(Quote::new(capture_time, parse_amount(raw)?))
}
