//! Randomized pause taken before a session's first request.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Default lower bound of the pre-request pause (2 seconds).
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(2);

/// Default upper bound of the pre-request pause (5 seconds).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Inclusive range a pause is drawn from, uniformly at millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DELAY,
            max: DEFAULT_MAX_DELAY,
        }
    }
}

impl DelayRange {
    /// Creates a range; bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// A range that never pauses.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a pause from the range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample(&self) -> Duration {
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        if min_ms == max_ms {
            return Duration::from_millis(min_ms);
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(min_ms..=max_ms))
    }

    /// Sleeps for a freshly drawn pause.
    pub async fn wait(&self) {
        let delay = self.sample();
        if delay.is_zero() {
            return;
        }
        debug!(delay_ms = delay.as_millis(), "pausing before request");
        tokio::time::sleep(delay).await;
    }
}
