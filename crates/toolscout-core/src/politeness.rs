//! Randomized pause between consecutive requests of one worker slot.
//!
//! Every worker sleeps a uniformly random duration in `[min, max]` after it
//! finishes processing a page and before it dispatches the next one, so the
//! pool never hits a listing site in a tight, regular rhythm.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use toolscout_core::politeness::PolitenessDelay;
//!
//! let delay = PolitenessDelay::new(Duration::from_millis(500), Duration::from_millis(1500));
//! let d = delay.next_delay();
//! assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
//! ```

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Bounds of the randomized inter-request delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolitenessDelay {
    pub min: Duration,
    pub max: Duration,
}

impl PolitenessDelay {
    /// Create a delay range. Bounds given in the wrong order are swapped.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No delay at all (tests, local fixtures).
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draw one delay uniformly from `[min, max]`.
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }

    /// Sleep for one drawn delay, returning early if `cancel` fires.
    pub async fn wait(&self, cancel: &CancellationToken) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        tracing::trace!(delay_ms = %delay.as_millis(), "Politeness delay");
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => {}
        }
    }
}

impl Default for PolitenessDelay {
    /// 500 to 1500 ms.
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(1500))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn delay_is_bounded() {
        let delay = PolitenessDelay::new(Duration::from_millis(100), Duration::from_millis(150));
        for _ in 0..100 {
            let d = delay.next_delay();
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let delay = PolitenessDelay::new(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(delay.min, Duration::from_secs(1));
        assert_eq!(delay.max, Duration::from_secs(2));
    }

    #[test]
    fn default_range_is_half_to_one_and_a_half_seconds() {
        let delay = PolitenessDelay::default();
        assert_eq!(delay.min, Duration::from_millis(500));
        assert_eq!(delay.max, Duration::from_millis(1500));
        assert_eq!(PolitenessDelay::none().next_delay(), Duration::ZERO);
    }

    #[tokio::test]
    async fn wait_sleeps_at_least_min() {
        let delay = PolitenessDelay::new(Duration::from_millis(50), Duration::from_millis(60));
        let start = Instant::now();
        delay.wait(&CancellationToken::new()).await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn wait_returns_early_on_cancel() {
        let delay = PolitenessDelay::new(Duration::from_secs(10), Duration::from_secs(10));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let start = Instant::now();
        delay.wait(&cancel).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
