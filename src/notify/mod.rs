use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("notification to {destination} failed: {reason}")]
pub struct NotifyError {
    pub destination: String,
    pub reason: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, code: &str, destination: &str) -> Result<(), NotifyError>;
}

// Never logs the code itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, code: &str, destination: &str) -> Result<(), NotifyError> {
        info!(destination = %destination, code_len = code.len(), "simulated code dispatch");
        Ok(())
    }
}
