use async_trait::async_trait;
use replcheck_core::{KvStore, MemoryStore};
use replcheck_phase::{PhaseError, PhaseGate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("replcheck=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
    (
        Arc::new(MemoryStore::new("source")),
        Arc::new(MemoryStore::new("target")),
    )
}

/// Opens by copying every key under `prefix` from source to target.
pub struct MirrorGate {
    source: Arc<MemoryStore>,
    target: Arc<MemoryStore>,
    prefix: String,
    /// Deleted from the target after each mirror.
    lost: Vec<String>,
    /// Faulted on the source once the gate has opened for the first time.
    source_fault: Option<String>,
    waits: AtomicUsize,
}

impl MirrorGate {
    pub fn new(source: &Arc<MemoryStore>, target: &Arc<MemoryStore>, prefix: &str) -> Self {
        Self {
            source: source.clone(),
            target: target.clone(),
            prefix: prefix.to_string(),
            lost: Vec::new(),
            source_fault: None,
            waits: AtomicUsize::new(0),
        }
    }

    pub fn losing(mut self, key: impl Into<String>) -> Self {
        self.lost.push(key.into());
        self
    }

    pub fn faulting_source(mut self, key: impl Into<String>) -> Self {
        self.source_fault = Some(key.into());
        self
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhaseGate for MirrorGate {
    fn describe(&self) -> String {
        format!("mirror {}* to target", self.prefix)
    }

    async fn wait(&self) -> Result<(), PhaseError> {
        self.source.replicate_to(&self.target, &self.prefix);
        if !self.lost.is_empty() {
            self.target.delete(&self.lost).await?;
        }
        if self.waits.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(key) = &self.source_fault {
                self.source.inject_fault(key.clone(), "READONLY You can't write against a read only replica");
            }
        }
        Ok(())
    }
}

/// Gate that always fails.
pub struct BrokenGate;

#[async_trait]
impl PhaseGate for BrokenGate {
    fn describe(&self) -> String {
        "broken".to_string()
    }

    async fn wait(&self) -> Result<(), PhaseError> {
        Err(PhaseError::AcknowledgementClosed)
    }
}
