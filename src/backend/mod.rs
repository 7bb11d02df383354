//! Quote Backend
//!
//! The intermediary service that fetches quotes from the upstream provider
//! and keeps the archive. The dashboard only reads from it.
//!
//! - [`QuoteBackend`]: the two operations the dashboard relies on
//! - [`HttpQuoteBackend`]: reqwest implementation over HTTP

mod client;
mod error;

pub use client::HttpQuoteBackend;
pub use error::{BackendError, BackendResult};

use async_trait::async_trait;

use crate::quote::QuoteArchive;

/// Read-only view of the quote backend
#[async_trait]
pub trait QuoteBackend: Send + Sync {
    /// Ask the backend for the freshest quote.
    ///
    /// Returns the JSON-encoded payload `{ "data": { "amount": ... } }` unparsed.
    async fn trigger_manual_fetch(&self) -> BackendResult<String>;

    /// Fetch the full archive in backend order
    async fn get_quote_archive(&self) -> BackendResult<QuoteArchive>;
}
