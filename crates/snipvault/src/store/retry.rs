use crate::error::{Result, SnipError};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Fixed retry budget shared by the reader and the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never less than 1.
    pub attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// budget is spent. An exhausted budget escalates to [`SnipError::Fatal`].
    pub async fn run<T, F, Fut>(&self, operation: &'static str, path: &Path, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) if attempt >= attempts => {
                    tracing::error!(
                        operation,
                        path = %path.display(),
                        attempts,
                        error = %err,
                        "retry budget exhausted"
                    );
                    return Err(SnipError::Fatal {
                        operation,
                        path: path.to_path_buf(),
                        attempts,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        operation,
                        path = %path.display(),
                        attempt,
                        error = %err,
                        "transient failure, retrying in {:?}",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
