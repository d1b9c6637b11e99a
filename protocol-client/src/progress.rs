//! Simulated upload progress.
//!
//! The backend reports nothing while it analyzes a document, so progress is a
//! ticker: every [`TICK_PERIOD`] it adds [`TICK_STEP`] percent, stopping at
//! [`TICK_CEILING`]. Only completion moves it to 100.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

pub const TICK_PERIOD: Duration = Duration::from_millis(500);
pub const TICK_STEP: u8 = 10;
pub const TICK_CEILING: u8 = 90;
pub const COMPLETE: u8 = 100;

#[derive(Debug, Default)]
struct ProgressState {
    percent: AtomicU8,
    running: AtomicBool,
}

/// Shared progress percentage and "analyzing" flag. Clones observe the same
/// state.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<ProgressState>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> u8 {
        self.0.percent.load(Ordering::Acquire)
    }

    /// `true` while an upload is in flight.
    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.0.running.store(running, Ordering::Release);
    }

    pub(crate) fn set(&self, value: u8) {
        self.0.percent.store(value.min(COMPLETE), Ordering::Release);
    }

    pub(crate) fn reset(&self) {
        self.set(0);
    }

    /// Adds `step`, never passing `ceiling`. A value already above the
    /// ceiling is left alone.
    pub(crate) fn advance(&self, step: u8, ceiling: u8) {
        let _ = self
            .0
            .percent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < ceiling).then(|| current.saturating_add(step).min(ceiling))
            });
    }
}

/// Background task driving a [`Progress`]. Aborted on `stop` or drop.
#[derive(Debug)]
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    pub fn start(progress: Progress) -> Self {
        Self::with_period(progress, TICK_PERIOD)
    }

    pub fn with_period(progress: Progress, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                progress.advance(TICK_STEP, TICK_CEILING);
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_respects_ceiling() {
        let progress = Progress::new();
        for _ in 0..20 {
            progress.advance(TICK_STEP, TICK_CEILING);
        }
        assert_eq!(progress.value(), 90);

        progress.set(95);
        progress.advance(TICK_STEP, TICK_CEILING);
        assert_eq!(progress.value(), 95);
    }

    #[test]
    fn test_set_clamps_to_complete() {
        let progress = Progress::new();
        progress.set(250);
        assert_eq!(progress.value(), 100);
        progress.reset();
        assert_eq!(progress.value(), 0);
        assert!(!progress.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_climbs_to_ceiling_and_stops() {
        let progress = Progress::new();
        let ticker = ProgressTicker::start(progress.clone());

        tokio::time::sleep(Duration::from_millis(1_250)).await;
        assert_eq!(progress.value(), 20);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(progress.value(), 90);

        ticker.stop();
        progress.reset();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(progress.value(), 0);
    }
}
