use crate::error::PhaseError;
use crate::gate::PhaseGate;
use async_trait::async_trait;
use replcheck_core::{KvStore, StoreError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const MARKER_EXPIRY: Duration = Duration::from_secs(600);

/// An explicit signal that the target has caught up with the source.
#[async_trait]
pub trait ConvergenceProbe: Send + Sync {
    /// Called once before polling starts.
    async fn prepare(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn converged(&self) -> Result<bool, StoreError>;
}

/// Writes a unique marker to the source and reports convergence once the
/// target holds the same value.
///
/// Replication engines apply writes in order, so seeing the marker on the
/// target implies every earlier source write has been applied too. Each
/// `prepare` writes a fresh token, so a marker replicated by an earlier wait
/// never satisfies a later one.
pub struct MarkerProbe {
    source: Arc<dyn KvStore>,
    target: Arc<dyn KvStore>,
    key: String,
    token: Mutex<String>,
}

impl MarkerProbe {
    pub fn new(source: Arc<dyn KvStore>, target: Arc<dyn KvStore>, prefix: &str) -> Self {
        Self {
            source,
            target,
            key: format!("{prefix}marker:{}", uuid::Uuid::new_v4()),
            token: Mutex::new(String::new()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn token(&self) -> String {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ConvergenceProbe for MarkerProbe {
    async fn prepare(&self) -> Result<(), StoreError> {
        let token = uuid::Uuid::new_v4().to_string();
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token.clone();
        debug!("Writing convergence marker {} = {}", self.key, token);
        self.source
            .set(&self.key, token.as_bytes(), Some(MARKER_EXPIRY))
            .await
    }

    async fn converged(&self) -> Result<bool, StoreError> {
        let token = self.token();
        if token.is_empty() {
            return Ok(false);
        }
        let seen = self.target.get(&self.key).await?;
        Ok(seen.as_deref() == Some(token.as_bytes()))
    }
}

/// Polls a [`ConvergenceProbe`] until it converges or `timeout` elapses.
///
/// Running out of time is an error, never a silent pass. No sleep runs past
/// the timeout, whatever the interval.
pub struct PolledConvergence<P> {
    probe: P,
    interval: Duration,
    timeout: Duration,
}

impl<P: ConvergenceProbe> PolledConvergence<P> {
    pub fn new(probe: P, interval: Duration, timeout: Duration) -> Self {
        Self {
            probe,
            interval,
            timeout,
        }
    }
}

#[async_trait]
impl<P: ConvergenceProbe> PhaseGate for PolledConvergence<P> {
    fn describe(&self) -> String {
        format!(
            "convergence poll every {}ms (up to {}s)",
            self.interval.as_millis(),
            self.timeout.as_secs()
        )
    }

    async fn wait(&self) -> Result<(), PhaseError> {
        self.probe.prepare().await?;
        let started = Instant::now();
        loop {
            if self.probe.converged().await? {
                info!("Replication converged after {:?}", started.elapsed());
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(PhaseError::ConvergenceTimeout { waited });
            }
            debug!("Not converged yet after {:?}", waited);
            tokio::time::sleep(self.interval.min(self.timeout - waited)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replcheck_core::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountdownProbe {
        remaining: AtomicUsize,
    }

    #[async_trait]
    impl ConvergenceProbe for CountdownProbe {
        async fn converged(&self) -> Result<bool, StoreError> {
            let left = self.remaining.load(Ordering::SeqCst);
            if left == 0 {
                return Ok(true);
            }
            self.remaining.store(left - 1, Ordering::SeqCst);
            Ok(false)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_converged() {
        let gate = PolledConvergence::new(
            CountdownProbe {
                remaining: AtomicUsize::new(3),
            },
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        let started = Instant::now();
        gate.wait().await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_an_error() {
        let gate = PolledConvergence::new(
            CountdownProbe {
                remaining: AtomicUsize::new(usize::MAX),
            },
            Duration::from_secs(1),
            Duration::from_secs(5),
        );
        match gate.wait().await {
            Err(PhaseError::ConvergenceTimeout { waited }) => {
                assert!(waited >= Duration::from_secs(5))
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_marker_probe_follows_replication() {
        let source = Arc::new(MemoryStore::new("source"));
        let target = Arc::new(MemoryStore::new("target"));
        let probe = MarkerProbe::new(source.clone(), target.clone(), "p:");

        probe.prepare().await.unwrap();
        assert!(source.exists(probe.key()).await.unwrap());
        assert!(!probe.converged().await.unwrap());

        source.replicate_to(&target, "p:");
        assert!(probe.converged().await.unwrap());
    }

    #[tokio::test]
    async fn test_probe_fault_surfaces() {
        let source = Arc::new(MemoryStore::new("source"));
        let target = Arc::new(MemoryStore::new("target"));
        let probe = MarkerProbe::new(source.clone(), target, "p:");
        source.inject_fault(probe.key().to_string(), "READONLY");

        let gate = PolledConvergence::new(probe, Duration::from_millis(10), Duration::from_secs(1));
        assert!(matches!(gate.wait().await, Err(PhaseError::Probe(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_never_overshoots_timeout() {
        let gate = PolledConvergence::new(
            CountdownProbe {
                remaining: AtomicUsize::new(usize::MAX),
            },
            Duration::from_secs(10),
            Duration::from_secs(2),
        );
        let started = Instant::now();
        match gate.wait().await {
            Err(PhaseError::ConvergenceTimeout { waited }) => {
                assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3))
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    fn replicate_after(source: &Arc<MemoryStore>, target: &Arc<MemoryStore>, delay: Duration) {
        let (source, target) = (source.clone(), target.clone());
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            source.replicate_to(&target, "p:");
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_wait_needs_its_own_replication() {
        let source = Arc::new(MemoryStore::new("source"));
        let target = Arc::new(MemoryStore::new("target"));
        let gate = PolledConvergence::new(
            MarkerProbe::new(source.clone(), target.clone(), "p:"),
            Duration::from_secs(1),
            Duration::from_secs(5),
        );

        replicate_after(&source, &target, Duration::from_secs(2));
        gate.wait().await.unwrap();

        // The first marker is already on the target; it must not open the gate again.
        source.set("p:second", b"v", None).await.unwrap();
        assert!(matches!(
            gate.wait().await,
            Err(PhaseError::ConvergenceTimeout { .. })
        ));
        assert!(!target.exists("p:second").await.unwrap());

        replicate_after(&source, &target, Duration::from_secs(2));
        let started = Instant::now();
        gate.wait().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(target.exists("p:second").await.unwrap());
    }
}
