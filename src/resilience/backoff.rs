//! Exponential backoff with jitter for the client-layer retry.

use rand::Rng;
use std::time::Duration;

/// Delay to wait after the `attempt`-th failure (1-based).
///
/// Doubles from `base_ms`, is capped at `max_ms`, then gains up to 10% jitter
/// so clients that failed together do not retry together.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 || base_ms == 0 {
        return Duration::ZERO;
    }

    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let spread = capped / 10;
    let jitter = if spread > 0 {
        rand::thread_rng().gen_range(0..=spread)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
