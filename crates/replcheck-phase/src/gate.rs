use crate::error::PhaseError;
use async_trait::async_trait;

/// A synchronization point between two phases of a harness run.
///
/// `wait` returns only once the gate's policy is satisfied; verification must
/// not start before it does.
#[async_trait]
pub trait PhaseGate: Send + Sync {
    /// Human readable description, used in logs.
    fn describe(&self) -> String;

    async fn wait(&self) -> Result<(), PhaseError>;
}

/// Gate that is always open.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGate;

#[async_trait]
impl PhaseGate for NoopGate {
    fn describe(&self) -> String {
        "no wait".to_string()
    }

    async fn wait(&self) -> Result<(), PhaseError> {
        Ok(())
    }
}

#[async_trait]
impl<G: PhaseGate + ?Sized> PhaseGate for Box<G> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn wait(&self) -> Result<(), PhaseError> {
        (**self).wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_gate_returns_immediately() {
        let gate: Box<dyn PhaseGate> = Box::new(NoopGate);
        gate.wait().await.unwrap();
        assert_eq!(gate.describe(), "no wait");
    }
}
