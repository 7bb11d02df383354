//! Display State
//!
//! The dashboard's in-memory projection of backend data. Two slices, each
//! behind its own lock and written only by its own projection path:
//!
//! - `current_rate_text`: written by the rate path
//! - `price_history`: written by the archive path
//!
//! Every write is announced on a broadcast channel so renderers can redraw.

use tokio::sync::{broadcast, RwLock};

use crate::quote::{Quote, LOADING_TEXT};

/// Capacity of the change notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Which slice of the display state changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    RateUpdated,
    HistoryUpdated,
}

/// Point-in-time copy of the display state, the input to rendering
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub current_rate_text: String,
    pub price_history: Vec<Quote>,
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self {
            current_rate_text: LOADING_TEXT.to_string(),
            price_history: Vec::new(),
        }
    }
}

/// Mutable display state owned by one mounted dashboard
pub struct DisplayState {
    current_rate_text: RwLock<String>,
    price_history: RwLock<Vec<Quote>>,
    changes: broadcast::Sender<StateChange>,
}

impl DisplayState {
    /// Fresh state: `"Loading..."` and an empty history
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            current_rate_text: RwLock::new(LOADING_TEXT.to_string()),
            price_history: RwLock::new(Vec::new()),
            changes,
        }
    }

    pub async fn current_rate_text(&self) -> String {
        self.current_rate_text.read().await.clone()
    }

    pub async fn price_history(&self) -> Vec<Quote> {
        self.price_history.read().await.clone()
    }

    /// Copy both slices for rendering
    pub async fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            current_rate_text: self.current_rate_text().await,
            price_history: self.price_history().await,
        }
    }

    /// Replace the current rate text
    pub async fn set_current_rate_text(&self, text: String) {
        *self.current_rate_text.write().await = text;
        self.notify(StateChange::RateUpdated);
    }

    /// Replace the whole price history
    pub async fn set_price_history(&self, history: Vec<Quote>) {
        *self.price_history.write().await = history;
        self.notify(StateChange::HistoryUpdated);
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StateChange) {
        // No receivers is fine: nobody is rendering
        let _ = self.changes.send(change);
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new()
    }
}
