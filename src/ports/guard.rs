//! Per-call timeout and cancellation for tracker requests.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::PortError;

/// Failure of a single guarded tracker call.
#[derive(Debug, Error)]
pub enum CallError {
    /// The run was cancelled while the call was outstanding.
    #[error("cancelled")]
    Cancelled,
    /// The call did not complete within the configured timeout.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    /// The tracker reported an error.
    #[error(transparent)]
    Failed(PortError),
}

impl CallError {
    /// Returns `true` if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Applies one cancellation token and one request timeout to every tracker call.
///
/// Cloning a guard shares its cancellation token.
#[derive(Debug, Clone)]
pub struct CallGuard {
    cancel: CancellationToken,
    timeout: Duration,
}

impl CallGuard {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a guard with the given token and timeout.
    #[must_use]
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self { cancel, timeout }
    }

    /// The token observed by every guarded call.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call`, failing early on cancellation or timeout.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Cancelled`] if the token fires first,
    /// [`CallError::TimedOut`] if the timeout elapses first, or
    /// [`CallError::Failed`] with the tracker's own error.
    pub async fn run<T, F>(&self, call: F) -> Result<T, CallError>
    where
        F: Future<Output = Result<T, PortError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(CallError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, call) => match outcome {
                Ok(result) => result.map_err(CallError::Failed),
                Err(_) => Err(CallError::TimedOut(self.timeout)),
            },
        }
    }
}

impl Default for CallGuard {
    fn default() -> Self {
        Self::new(CancellationToken::new(), Self::DEFAULT_TIMEOUT)
    }
}
