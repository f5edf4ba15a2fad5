use crate::error::PhaseError;
use crate::gate::PhaseGate;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default settle time after the last seed write.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(120);

/// Default spacing between progress reports while settling.
pub const DEFAULT_SETTLE_INTERVAL: Duration = Duration::from_secs(10);

/// Receives progress while a [`TimedSettle`] gate sleeps.
pub trait ProgressSink: Send + Sync {
    fn report(&self, elapsed: Duration, remaining: Duration);
}

/// Logs settle progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, elapsed: Duration, remaining: Duration) {
        info!(
            "Waited {}s, {}s remaining",
            elapsed.as_secs(),
            remaining.as_secs()
        );
    }
}

/// Sleeps for a fixed upper bound on replication convergence time.
///
/// The sleep is split into `interval` slices with a progress report after
/// each; an interval of zero (or one at least as long as the total) sleeps
/// in one go. The slicing only affects what gets reported.
#[derive(Clone)]
pub struct TimedSettle {
    total: Duration,
    interval: Duration,
    progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for TimedSettle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedSettle")
            .field("total", &self.total)
            .field("interval", &self.interval)
            .finish()
    }
}

impl Default for TimedSettle {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE, DEFAULT_SETTLE_INTERVAL)
    }
}

impl TimedSettle {
    pub fn new(total: Duration, interval: Duration) -> Self {
        Self {
            total,
            interval,
            progress: Arc::new(TracingProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn total(&self) -> Duration {
        self.total
    }
}

#[async_trait]
impl PhaseGate for TimedSettle {
    fn describe(&self) -> String {
        format!("timed settle of {}s", self.total.as_secs())
    }

    async fn wait(&self) -> Result<(), PhaseError> {
        info!("Waiting {}s for replication to settle", self.total.as_secs());
        let step = if self.interval.is_zero() {
            self.total
        } else {
            self.interval.min(self.total)
        };

        let mut elapsed = Duration::ZERO;
        while elapsed < self.total {
            let slice = step.min(self.total - elapsed);
            tokio::time::sleep(slice).await;
            elapsed += slice;
            self.progress.report(elapsed, self.total - elapsed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    impl ProgressSink for Recorder {
        fn report(&self, _elapsed: Duration, remaining: Duration) {
            self.0.lock().unwrap().push(remaining.as_secs());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_reports_each_interval() {
        let recorder = Arc::new(Recorder::default());
        let gate = TimedSettle::new(Duration::from_secs(30), Duration::from_secs(10))
            .with_progress(recorder.clone());

        let started = tokio::time::Instant::now();
        gate.wait().await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(*recorder.0.lock().unwrap(), vec![20, 10, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uneven_interval_ends_on_total() {
        let recorder = Arc::new(Recorder::default());
        TimedSettle::new(Duration::from_secs(25), Duration::from_secs(10))
            .with_progress(recorder.clone())
            .wait()
            .await
            .unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec![15, 5, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_sleeps_once() {
        let recorder = Arc::new(Recorder::default());
        TimedSettle::new(Duration::from_secs(5), Duration::ZERO)
            .with_progress(recorder.clone())
            .wait()
            .await
            .unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_zero_total_returns_immediately() {
        TimedSettle::new(Duration::ZERO, Duration::from_secs(10))
            .wait()
            .await
            .unwrap();
    }
}
