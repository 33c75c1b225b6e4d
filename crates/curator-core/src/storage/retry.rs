//! Retry utilities for transient upload failures.
//!
//! Uploads target immutable, identity-scoped keys, so repeating a PUT is
//! idempotent and safe to retry.

use crate::error::PipelineError;
use std::time::Duration;

/// Determine whether a pipeline error is worth retrying.
///
/// Retryable: timeouts and upload errors the store flagged as transient
/// (transport failures, 429, 5xx). Everything else fails the item at once.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } => true,
        PipelineError::Upload { retryable, .. } => *retryable,
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}
