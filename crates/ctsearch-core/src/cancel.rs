// ── Cancel-with-cause ───────────────────────────────────────────────────────
// Tokio's `CancellationToken` tells you *that* you were cancelled, not *why*.
// Distinguishes "externally cancelled" from "cancelled because one of our
// sources failed under the Cancel policy".
//
// We wrap a token with a cause cell, written at most once via
// `OnceLock::set` (a compare-and-set), and read back on the return path.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::error::CtSearchError;

#[derive(Clone)]
pub struct CancelWithCause {
    token: CancellationToken,
    cause: Arc<OnceLock<CtSearchError>>,
}

impl CancelWithCause {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            cause: Arc::new(OnceLock::new()),
        }
    }

    /// Cancel with a specific cause. If the token was already cancelled
    /// (externally or by an earlier source failure), the first cause wins.
    pub fn cancel(&self, cause: CtSearchError) {
        let _ = self.cause.set(cause);
        self.token.cancel();
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// The cause of cancellation, if any was ever recorded, returned as the
    /// same variant it was stored as — callers rely on `matches!`ing the
    /// result to tell an external cancellation apart from a triggering
    /// source error. If the token is cancelled but no cause was set (e.g.
    /// the caller cancelled the original context directly), substitutes
    /// `CtSearchError::Cancelled`.
    pub fn cause(&self) -> CtSearchError {
        match self.cause.get() {
            Some(CtSearchError::Http(e)) => CtSearchError::Decode(e.to_string()),
            Some(CtSearchError::Status { url, status }) => CtSearchError::Status {
                url: url.clone(),
                status: *status,
            },
            Some(CtSearchError::Decode(msg)) => CtSearchError::Decode(msg.clone()),
            Some(CtSearchError::Checkpoint(msg)) => CtSearchError::Checkpoint(msg.clone()),
            Some(CtSearchError::Entry(msg)) => CtSearchError::Entry(msg.clone()),
            Some(CtSearchError::CertParse(msg)) => CtSearchError::CertParse(msg.clone()),
            Some(CtSearchError::TimeOutOfRange) => CtSearchError::TimeOutOfRange,
            Some(CtSearchError::Config(msg)) => CtSearchError::Config(msg.clone()),
            Some(CtSearchError::Source(msg)) => CtSearchError::Source(msg.clone()),
            Some(CtSearchError::Cancelled) => CtSearchError::Cancelled,
            None => CtSearchError::Cancelled,
        }
    }
}

impl Default for CancelWithCause {
    fn default() -> Self {
        Self::new()
    }
}
