//! Cancellation signal that remembers why it fired

use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

const DEFAULT_CAUSE: &str = "operation cancelled";

/// Cloneable cancellation signal shared between `main` and long waits.
///
/// The first cause passed to [`CancelSignal::cancel`] wins; later calls still
/// cancel but keep the original cause.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<String>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, cause: impl Into<String>) {
        let _ = self.cause.set(cause.into());
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why the signal fired, or a generic cause if none was given.
    pub fn cause(&self) -> String {
        self.cause
            .get()
            .cloned()
            .unwrap_or_else(|| DEFAULT_CAUSE.to_string())
    }

    /// Completes once the signal has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
