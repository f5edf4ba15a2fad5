use crate::error::PhaseError;
use crate::gate::PhaseGate;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::info;

/// Waits for an operator to press Enter (any line on the input).
///
/// Gates derived with [`ManualGate::with_prompt`] read from the same input,
/// so buffered lines are never lost between them.
pub struct ManualGate<R> {
    prompt: String,
    input: Arc<Mutex<R>>,
}

impl ManualGate<BufReader<Stdin>> {
    /// Gate reading acknowledgements from standard input.
    pub fn stdin(prompt: impl Into<String>) -> Self {
        Self::new(prompt, BufReader::new(tokio::io::stdin()))
    }
}

impl<R> ManualGate<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(prompt: impl Into<String>, input: R) -> Self {
        Self {
            prompt: prompt.into(),
            input: Arc::new(Mutex::new(input)),
        }
    }

    /// Another gate with its own prompt, sharing this gate's input.
    pub fn with_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            input: Arc::clone(&self.input),
        }
    }
}

#[async_trait]
impl<R> PhaseGate for ManualGate<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn describe(&self) -> String {
        "operator acknowledgement".to_string()
    }

    async fn wait(&self) -> Result<(), PhaseError> {
        info!("{}", self.prompt);
        let mut line = String::new();
        let read = self.input.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(PhaseError::AcknowledgementClosed);
        }
        info!("Acknowledged, continuing");
        Ok(())
    }
}
