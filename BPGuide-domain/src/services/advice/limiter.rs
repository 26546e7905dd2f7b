use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep_until, Instant};

/// Default spacing between the starts of two inference calls
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Exclusive right to issue the next inference call
///
/// Dropping the permit releases the slot to the next waiter.
pub struct RatePermit {
    _guard: OwnedMutexGuard<Option<Instant>>,
}

impl std::fmt::Debug for RatePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatePermit").finish()
    }
}

/// Process-wide admission control for inference calls
///
/// At most one permit is held at a time and consecutive permits are granted
/// at least `min_interval` apart. Waiters are admitted in arrival order
/// because the tokio mutex queues them fairly.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    /// Start time of the most recently granted permit
    last_start: Arc<Mutex<Option<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Arc::new(Mutex::new(None)),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait for the slot and the minimum interval, then grant a permit
    pub async fn acquire(&self) -> RatePermit {
        let mut guard = self.last_start.clone().lock_owned().await;
        if let Some(last) = *guard {
            sleep_until(last + self.min_interval).await;
        }
        *guard = Some(Instant::now());
        RatePermit { _guard: guard }
    }

    /// True while a permit is held or being waited for
    pub fn is_busy(&self) -> bool {
        self.last_start.try_lock().is_err()
    }
}
