// ── Retry Policy ────────────────────────────────────────────────────────────
// Deadline-bounded exponential backoff with an attempt cap, consumed by the
// tiled log client when fetching tiles.
//
// Backoff shape: doubling per attempt, capped at a maximum interval,
// jittered by ±25% to avoid a thundering herd. The cap and the overall
// deadline come from a caller-supplied policy instead of hardcoded
// constants.

use std::time::{Duration, Instant};

use crate::error::CtSearchError;

/// Exponential backoff bounded by an attempt cap and an overall deadline.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    max_interval: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    /// Construct a policy, validating: `max_attempts >= 1`, `max_interval >
    /// 0`, `timeout > max_interval`.
    pub fn new(
        max_attempts: u32,
        max_interval: Duration,
        timeout: Duration,
    ) -> Result<Self, CtSearchError> {
        if max_attempts < 1 {
            return Err(CtSearchError::Config(
                "RetryPolicy: max_attempts must be >= 1".into(),
            ));
        }
        if max_interval.is_zero() {
            return Err(CtSearchError::Config(
                "RetryPolicy: max_interval must be > 0".into(),
            ));
        }
        if timeout.is_zero() {
            return Err(CtSearchError::Config(
                "RetryPolicy: timeout must be > 0".into(),
            ));
        }
        if timeout <= max_interval {
            return Err(CtSearchError::Config(
                "RetryPolicy: timeout must be > max_interval".into(),
            ));
        }
        Ok(Self {
            max_attempts,
            max_interval,
            timeout,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay before retry attempt `attempt` (0-based: the delay before the
    /// *second* try is `backoff(0)`), capped at `max_interval` and jittered
    /// by +/-25%.
    fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = 1_000u64.saturating_mul(1u64 << attempt.min(20));
        let capped_ms = base_ms.min(self.max_interval.as_millis() as u64);
        Duration::from_millis(apply_jitter(capped_ms))
    }

    /// Drive `op` under this policy: up to `max_attempts` tries, stopping
    /// early if the overall `timeout` elapses or `cancelled` resolves.
    /// Cancellation aborts immediately regardless of remaining budget.
    pub async fn retry<F, Fut, T>(
        &self,
        cancel: &tokio_util::sync::CancellationToken,
        mut op: F,
    ) -> Result<T, CtSearchError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CtSearchError>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut last_err = None;
        for attempt in 0..self.max_attempts {
            if cancel.is_cancelled() {
                return Err(CtSearchError::Cancelled);
            }
            if Instant::now() >= deadline {
                break;
            }
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => last_err = Some(e),
            }
            if attempt + 1 >= self.max_attempts {
                break;
            }
            let delay = self.backoff(attempt);
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(delay.min(remaining)) => {}
                _ = cancel.cancelled() => return Err(CtSearchError::Cancelled),
            }
        }
        Err(last_err.unwrap_or(CtSearchError::Config(
            "RetryPolicy: exhausted with no attempts made".into(),
        )))
    }
}

impl Default for RetryPolicy {
    /// Default policy when none is configured or an invalid one is
    /// supplied: 5 attempts, 1s max interval, 5s overall timeout.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            max_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }
}

fn apply_jitter(base_ms: u64) -> u64 {
    let jitter_range = (base_ms / 4) as i64;
    if jitter_range == 0 {
        return base_ms.max(1);
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as i64;
    let offset = (nanos % (2 * jitter_range + 1)) - jitter_range;
    (base_ms as i64 + offset).max(1) as u64
}
