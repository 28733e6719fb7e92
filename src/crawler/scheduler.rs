//! Concurrency limiting and request pacing
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Randomized pacing delays between requests
//!
//! The limiter caps how many chapter fetches are in flight at once; pacing
//! spaces out consecutive requests so the target site sees a human-ish rate.

use crate::config::{validate_pacing, CrawlerConfig};
use crate::ConfigResult;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded-concurrency limiter shared by fetch workers
#[derive(Debug, Clone)]
pub struct FetchLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl FetchLimiter {
    /// Creates a limiter admitting at most `capacity` concurrent holders
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot
    ///
    /// The slot is released when the returned permit is dropped. Returns
    /// None only if the limiter has been closed.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().acquire_owned().await.ok()
    }

    /// Maximum number of concurrent holders
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently free slots
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Randomized delay range applied between requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    min_secs: f64,
    max_secs: f64,
}

impl Pacing {
    /// Creates a pacing range, validating that `0 <= min <= max` and that `max`
    /// stays within [`crate::config::MAX_PACING_SECS`]
    pub fn new(min_secs: f64, max_secs: f64) -> ConfigResult<Self> {
        validate_pacing(min_secs, max_secs)?;
        Ok(Self { min_secs, max_secs })
    }

    /// Pacing that never waits
    pub fn none() -> Self {
        Self {
            min_secs: 0.0,
            max_secs: 0.0,
        }
    }

    /// Pacing range taken from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> ConfigResult<Self> {
        Self::new(config.pacing_min_secs, config.pacing_max_secs)
    }

    pub fn min_secs(&self) -> f64 {
        self.min_secs
    }

    pub fn max_secs(&self) -> f64 {
        self.max_secs
    }

    /// Draws a delay uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs_f64(self.min_secs);
        }
        let mut rng = rand::thread_rng();
        Duration::from_secs_f64(rng.gen_range(self.min_secs..=self.max_secs))
    }

    /// Sleeps for a randomly drawn delay
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::trace!("Pacing for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default()).unwrap_or_else(|_| Self::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_limiter_capacity() {
        let limiter = FetchLimiter::new(3);
        assert_eq!(limiter.capacity(), 3);
        assert_eq!(limiter.available(), 3);

        assert_eq!(FetchLimiter::new(0).capacity(), 1);
    }

    #[tokio::test]
    async fn test_permits_are_released_on_drop() {
        let limiter = FetchLimiter::new(2);

        let first = limiter.acquire().await.unwrap();
        let _second = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);

        drop(first);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_capacity() {
        let limiter = FetchLimiter::new(2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tasks.spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while tasks.join_next().await.is_some() {}

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pacing_sample_within_range() {
        let pacing = Pacing::new(0.01, 0.05).unwrap();
        for _ in 0..100 {
            let delay = pacing.sample();
            assert!(delay >= Duration::from_secs_f64(0.01));
            assert!(delay <= Duration::from_secs_f64(0.05));
        }
    }

    #[test]
    fn test_pacing_fixed_and_none() {
        let fixed = Pacing::new(0.5, 0.5).unwrap();
        assert_eq!(fixed.sample(), Duration::from_millis(500));
        assert_eq!(Pacing::none().sample(), Duration::ZERO);
    }

    #[test]
    fn test_pacing_rejects_inverted_range() {
        assert!(Pacing::new(3.0, 1.0).is_err());
        assert!(Pacing::new(-1.0, 1.0).is_err());
    }

    #[test]
    fn test_pacing_rejects_unrepresentable_delay() {
        assert!(Pacing::new(1e30, 1e31).is_err());
    }

    #[test]
    fn test_default_pacing_matches_config() {
        let pacing = Pacing::default();
        assert_eq!(pacing.min_secs(), 1.0);
        assert_eq!(pacing.max_secs(), 3.0);
    }
}
