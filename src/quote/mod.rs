//! Quote model and projection
//!
//! - **types**: `Quote`, `ArchiveEntry` and the rate payload shape
//! - **projector**: raw payloads → display values
//! - **error**: projection errors

pub mod error;
pub mod projector;
pub mod types;

pub use error::{ProjectionError, ProjectionResult};
pub use projector::{parse_amount, ArchivePolicy, QuoteProjector, LOADING_TEXT, RATE_ERROR_TEXT};
pub use types::{
    format_dollars, nanos_to_millis, ArchiveEntry, Quote, QuoteArchive, NANOS_PER_MILLI,
};
