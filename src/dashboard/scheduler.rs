//! Refresh Scheduler
//!
//! Drives the periodic refresh of both display state slices. `start()` runs
//! one cycle immediately and then one per interval; `stop()` disarms the
//! timer, cancels in-flight refreshes and waits for them, after which the
//! display state is never written again.
//!
//! Each cycle spawns the rate refresh and the history refresh as separate
//! tasks so a slow or failing call on one path never holds up the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::state::DisplayState;
use crate::backend::QuoteBackend;
use crate::config::RefreshConfig;
use crate::quote::QuoteProjector;

/// Scheduler lifecycle errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Refresh scheduler is already running")]
    AlreadyRunning,

    #[error("Refresh scheduler has been stopped")]
    Stopped,
}

/// Drives refresh cycles for one mounted dashboard
pub struct RefreshScheduler {
    refresher: Refresher,
    interval: Duration,
    lifetime: CancellationToken,
    tasks: TaskTracker,
    running: AtomicBool,
}

/// Handle to an armed refresh timer.
///
/// Consumed by [`RefreshScheduler::stop`]. Dropping it without stopping still
/// cancels the timer, but does not wait for in-flight refreshes.
pub struct RefreshHandle {
    token: CancellationToken,
    driver: Option<JoinHandle<()>>,
    tasks: TaskTracker,
}

/// The two refresh paths, cheap to clone into spawned tasks
#[derive(Clone)]
struct Refresher {
    backend: Arc<dyn QuoteBackend>,
    state: Arc<DisplayState>,
    projector: QuoteProjector,
}

impl RefreshScheduler {
    /// Create a scheduler writing into `state`
    pub fn new(
        backend: Arc<dyn QuoteBackend>,
        state: Arc<DisplayState>,
        config: &RefreshConfig,
    ) -> Self {
        let mut interval = config.interval();
        if interval.is_zero() {
            tracing::warn!("Zero refresh interval, using the default cadence");
            interval = RefreshConfig::default().interval();
        }

        Self {
            refresher: Refresher {
                backend,
                state,
                projector: QuoteProjector::new(config.archive_policy),
            },
            interval,
            lifetime: CancellationToken::new(),
            tasks: TaskTracker::new(),
            running: AtomicBool::new(false),
        }
    }

    /// The display state this scheduler writes into
    pub fn state(&self) -> &Arc<DisplayState> {
        &self.refresher.state
    }

    /// Run one refresh cycle now, then arm the recurring timer.
    ///
    /// Only one timer may be armed per scheduler.
    pub fn start(&self) -> Result<RefreshHandle, SchedulerError> {
        if self.lifetime.is_cancelled() {
            return Err(SchedulerError::Stopped);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let token = self.lifetime.clone();
        let tasks = self.tasks.clone();
        let refresher = self.refresher.clone();
        let period = self.interval;

        let driver = tokio::spawn(async move {
            // First tick completes immediately
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::debug!("Starting refresh cycle");
                        tasks.spawn(refresher.clone().refresh_rate(token.clone()));
                        tasks.spawn(refresher.clone().refresh_history(token.clone()));
                    }
                }
            }

            tracing::debug!("Refresh timer disarmed");
        });

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Refresh scheduler started"
        );

        Ok(RefreshHandle {
            token: self.lifetime.clone(),
            driver: Some(driver),
            tasks: self.tasks.clone(),
        })
    }

    /// Disarm the timer and wait for in-flight refreshes to wind down
    pub async fn stop(&self, handle: RefreshHandle) {
        handle.stop().await;
    }

    /// Refresh only the current rate, independent of the timer.
    ///
    /// Returns `None` once the scheduler has been stopped.
    pub fn refresh_rate_now(&self) -> Option<JoinHandle<()>> {
        if self.lifetime.is_cancelled() {
            tracing::debug!("Ignoring manual refresh after teardown");
            return None;
        }

        tracing::debug!("Manual rate refresh requested");
        Some(
            self.tasks
                .spawn(self.refresher.clone().refresh_rate(self.lifetime.clone())),
        )
    }

    /// Run one full cycle and wait for both paths to finish.
    ///
    /// Both paths are tracked like timer cycles, so `stop()` cancels and
    /// awaits them. Does nothing once the scheduler has been stopped.
    pub async fn refresh_once(&self) {
        if self.lifetime.is_cancelled() {
            tracing::debug!("Ignoring refresh cycle after teardown");
            return;
        }

        let rate = self
            .tasks
            .spawn(self.refresher.clone().refresh_rate(self.lifetime.clone()));
        let history = self
            .tasks
            .spawn(self.refresher.clone().refresh_history(self.lifetime.clone()));

        let (rate, history) = tokio::join!(rate, history);
        for result in [rate, history] {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Refresh task ended abnormally");
            }
        }
    }
}

impl RefreshHandle {
    /// Disarm the timer, cancel in-flight refreshes and wait for them
    pub async fn stop(mut self) {
        self.token.cancel();

        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::warn!(error = %e, "Refresh timer task ended abnormally");
            }
        }

        self.tasks.close();
        self.tasks.wait().await;

        tracing::info!("Refresh scheduler stopped");
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl Refresher {
    async fn refresh_rate(self, token: CancellationToken) {
        let started = Instant::now();

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            response = self.backend.trigger_manual_fetch() => response,
        };

        let text = self.projector.project_rate_response(response);
        if token.is_cancelled() {
            return;
        }

        tracing::debug!(
            rate = %text,
            duration_ms = started.elapsed().as_millis() as u64,
            "Current rate refreshed"
        );
        self.state.set_current_rate_text(text).await;
    }

    async fn refresh_history(self, token: CancellationToken) {
        let started = Instant::now();

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            response = self.backend.get_quote_archive() => response,
        };

        let archive = match response {
            Ok(archive) => archive,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch price history");
                return;
            }
        };

        match self.projector.project_archive(&archive) {
            Ok(history) => {
                if token.is_cancelled() {
                    return;
                }
                tracing::debug!(
                    points = history.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Price history refreshed"
                );
                self.state.set_price_history(history).await;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    entries = archive.len(),
                    "Discarding price history batch, keeping previous history"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendResult};
    use crate::quote::{ArchiveEntry, ArchivePolicy, Quote, QuoteArchive};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    const RATE_523: &str = r#"{"data":{"amount":5.23}}"#;

    fn rate(amount: f64) -> String {
        format!(r#"{{"data":{{"amount":{}}}}}"#, amount)
    }

    fn archive_523() -> QuoteArchive {
        vec![ArchiveEntry::new(1_000_000_000, RATE_523)]
    }

    /// Backend replaying scripted (delay, response) pairs, then a fixed default
    struct ScriptedBackend {
        rates: Mutex<VecDeque<(Duration, BackendResult<String>)>>,
        archives: Mutex<VecDeque<(Duration, BackendResult<QuoteArchive>)>>,
        default_delay: Duration,
        rate_calls: AtomicUsize,
        archive_calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self::with_delay(Duration::ZERO)
        }

        fn with_delay(default_delay: Duration) -> Self {
            Self {
                rates: Mutex::new(VecDeque::new()),
                archives: Mutex::new(VecDeque::new()),
                default_delay,
                rate_calls: AtomicUsize::new(0),
                archive_calls: AtomicUsize::new(0),
            }
        }

        fn script_rate(self, delay: Duration, response: BackendResult<String>) -> Self {
            self.rates.lock().unwrap().push_back((delay, response));
            self
        }

        fn script_archive(self, delay: Duration, response: BackendResult<QuoteArchive>) -> Self {
            self.archives.lock().unwrap().push_back((delay, response));
            self
        }

        fn calls(&self) -> (usize, usize) {
            (
                self.rate_calls.load(Ordering::SeqCst),
                self.archive_calls.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait]
    impl QuoteBackend for ScriptedBackend {
        async fn trigger_manual_fetch(&self) -> BackendResult<String> {
            self.rate_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.rates.lock().unwrap().pop_front();
            let (delay, response) =
                next.unwrap_or_else(|| (self.default_delay, Ok(RATE_523.to_string())));
            tokio::time::sleep(delay).await;
            response
        }

        async fn get_quote_archive(&self) -> BackendResult<QuoteArchive> {
            self.archive_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.archives.lock().unwrap().pop_front();
            let (delay, response) = next.unwrap_or_else(|| (self.default_delay, Ok(archive_523())));
            tokio::time::sleep(delay).await;
            response
        }
    }

    fn scheduler_with(backend: Arc<ScriptedBackend>) -> RefreshScheduler {
        RefreshScheduler::new(
            backend,
            Arc::new(DisplayState::new()),
            &RefreshConfig::default(),
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_immediate_cycle() {
        let backend = Arc::new(ScriptedBackend::new());
        let scheduler = scheduler_with(backend.clone());

        let handle = scheduler.start().unwrap();
        settle().await;

        let snapshot = scheduler.state().snapshot().await;
        assert_eq!(snapshot.current_rate_text, "$5.23");
        assert_eq!(snapshot.price_history, vec![Quote::new(1_000_000_000, 5.23)]);
        assert_eq!(backend.calls(), (1, 1));

        scheduler.stop(handle).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_repeats_every_interval() {
        let backend = Arc::new(ScriptedBackend::new());
        let scheduler = scheduler_with(backend.clone());

        let handle = scheduler.start().unwrap();
        settle().await;
        assert_eq!(backend.calls(), (1, 1));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.calls(), (2, 2));

        tokio::time::sleep(Duration::from_secs(58)).await;
        assert_eq!(backend.calls(), (2, 2));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(backend.calls(), (3, 3));

        scheduler.stop(handle).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop_leaves_state_untouched() {
        let backend = Arc::new(ScriptedBackend::with_delay(Duration::from_secs(10)));
        let scheduler = scheduler_with(backend.clone());

        let handle = scheduler.start().unwrap();
        scheduler.stop(handle).await;
        let calls_at_stop = backend.calls();

        tokio::time::sleep(Duration::from_secs(600)).await;

        let snapshot = scheduler.state().snapshot().await;
        assert_eq!(snapshot.current_rate_text, "Loading...");
        assert!(snapshot.price_history.is_empty());
        assert_eq!(backend.calls(), calls_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_in_flight_cycle() {
        let backend = Arc::new(ScriptedBackend::with_delay(Duration::from_secs(10)));
        let scheduler = scheduler_with(backend.clone());

        let handle = scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.calls(), (1, 1));

        scheduler.stop(handle).await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        let snapshot = scheduler.state().snapshot().await;
        assert_eq!(snapshot.current_rate_text, "Loading...");
        assert!(snapshot.price_history.is_empty());
        assert_eq!(backend.calls(), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_timer_per_scheduler() {
        let scheduler = scheduler_with(Arc::new(ScriptedBackend::new()));

        let handle = scheduler.start().unwrap();
        assert_eq!(scheduler.start().err(), Some(SchedulerError::AlreadyRunning));

        scheduler.stop(handle).await;
        assert_eq!(scheduler.start().err(), Some(SchedulerError::Stopped));
        assert!(scheduler.refresh_rate_now().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_full_cycle_in_flight() {
        let backend = Arc::new(ScriptedBackend::with_delay(Duration::from_secs(10)));
        let scheduler = Arc::new(scheduler_with(backend.clone()));

        let handle = scheduler.start().unwrap();
        let cycle = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.refresh_once().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.calls(), (2, 2));

        scheduler.stop(handle).await;
        cycle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;

        let snapshot = scheduler.state().snapshot().await;
        assert_eq!(snapshot.current_rate_text, "Loading...");
        assert!(snapshot.price_history.is_empty());

        scheduler.refresh_once().await;
        assert_eq!(backend.calls(), (2, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_disarms_timer() {
        let backend = Arc::new(ScriptedBackend::new());
        let scheduler = scheduler_with(backend.clone());

        let handle = scheduler.start().unwrap();
        settle().await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(backend.calls(), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_last_completion_wins() {
        // Issued first, completes last
        let backend = Arc::new(
            ScriptedBackend::new()
                .script_rate(Duration::from_millis(200), Ok(rate(1.5)))
                .script_rate(Duration::from_millis(50), Ok(rate(2.5))),
        );
        let scheduler = scheduler_with(backend.clone());

        let first = scheduler.refresh_rate_now().unwrap();
        let second = scheduler.refresh_rate_now().unwrap();
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(scheduler.state().current_rate_text().await, "$1.5");
        assert_eq!(backend.calls(), (2, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_in_order_completion() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .script_rate(Duration::from_millis(50), Ok(rate(1.5)))
                .script_rate(Duration::from_millis(200), Ok(rate(2.5))),
        );
        let scheduler = scheduler_with(backend);

        let first = scheduler.refresh_rate_now().unwrap();
        let second = scheduler.refresh_rate_now().unwrap();
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(scheduler.state().current_rate_text().await, "$2.5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_failure_does_not_block_history() {
        let backend = Arc::new(
            ScriptedBackend::new().script_rate(Duration::ZERO, Err(BackendError::Unavailable)),
        );
        let scheduler = scheduler_with(backend);

        scheduler.refresh_once().await;

        let snapshot = scheduler.state().snapshot().await;
        assert_eq!(snapshot.current_rate_text, "Error fetching rate");
        assert_eq!(snapshot.price_history, vec![Quote::new(1_000_000_000, 5.23)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_rate_payload() {
        let backend = Arc::new(
            ScriptedBackend::new().script_rate(Duration::ZERO, Ok("<html>502</html>".to_string())),
        );
        let scheduler = scheduler_with(backend);

        scheduler.refresh_once().await;
        assert_eq!(
            scheduler.state().current_rate_text().await,
            "Error fetching rate"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_failure_keeps_previous_history() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .script_archive(Duration::ZERO, Ok(archive_523()))
                .script_archive(
                    Duration::ZERO,
                    Ok(vec![
                        ArchiveEntry::new(2_000_000_000, rate(6.0)),
                        ArchiveEntry::new(3_000_000_000, "not json"),
                    ]),
                )
                .script_archive(Duration::ZERO, Err(BackendError::Timeout))
                .script_rate(Duration::ZERO, Ok(rate(1.0)))
                .script_rate(Duration::ZERO, Ok(rate(2.0)))
                .script_rate(Duration::ZERO, Ok(rate(3.0))),
        );
        let scheduler = scheduler_with(backend);
        let expected = vec![Quote::new(1_000_000_000, 5.23)];

        scheduler.refresh_once().await;
        assert_eq!(scheduler.state().price_history().await, expected);

        // Partially bad batch is discarded as a whole
        scheduler.refresh_once().await;
        assert_eq!(scheduler.state().price_history().await, expected);
        assert_eq!(scheduler.state().current_rate_text().await, "$2");

        // Backend failure leaves history alone too
        scheduler.refresh_once().await;
        assert_eq!(scheduler.state().price_history().await, expected);
        assert_eq!(scheduler.state().current_rate_text().await, "$3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_invalid_policy() {
        let backend = Arc::new(ScriptedBackend::new().script_archive(
            Duration::ZERO,
            Ok(vec![
                ArchiveEntry::new(1, rate(1.0)),
                ArchiveEntry::new(2, "{}"),
                ArchiveEntry::new(3, rate(3.0)),
            ]),
        ));
        let config = RefreshConfig {
            archive_policy: ArchivePolicy::SkipInvalid,
            ..RefreshConfig::default()
        };
        let scheduler = RefreshScheduler::new(backend, Arc::new(DisplayState::new()), &config);

        scheduler.refresh_once().await;
        assert_eq!(
            scheduler.state().price_history().await,
            vec![Quote::new(1, 1.0), Quote::new(3, 3.0)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_history_does_not_delay_rate() {
        let backend = Arc::new(
            ScriptedBackend::new().script_archive(Duration::from_secs(30), Ok(archive_523())),
        );
        let scheduler = scheduler_with(backend);

        let handle = scheduler.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(scheduler.state().current_rate_text().await, "$5.23");
        assert!(scheduler.state().price_history().await.is_empty());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(scheduler.state().price_history().await.len(), 1);

        scheduler.stop(handle).await;
    }
}
