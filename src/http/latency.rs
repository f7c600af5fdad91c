//! Artificial latency for load-testing scenarios.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::LatencyConfig;

/// Draws delays uniformly from a fixed millisecond window.
///
/// One generator is seeded from OS entropy when the server starts and shared
/// by every request.
pub struct LatencyInjector {
    window_ms: Option<Range<u64>>,
    rng: Mutex<StdRng>,
}

impl LatencyInjector {
    pub fn new(config: &LatencyConfig) -> Self {
        let window_ms = (config.enabled && config.min_ms < config.max_ms)
            .then(|| config.min_ms..config.max_ms);
        Self {
            window_ms,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            window_ms: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Next delay, or `None` when injection is off.
    pub fn sample(&self) -> Option<Duration> {
        let window = self.window_ms.clone()?;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Some(Duration::from_millis(rng.gen_range(window)))
    }

    /// Sleep for the next delay. Only the calling task is suspended.
    pub async fn inject(&self) -> Option<Duration> {
        let delay = self.sample()?;
        tokio::time::sleep(delay).await;
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_half_open_window() {
        let injector = LatencyInjector::new(&LatencyConfig::default());
        for _ in 0..2_000 {
            let delay = injector.sample().unwrap();
            assert!(delay >= Duration::from_millis(10));
            assert!(delay < Duration::from_millis(2_000));
        }
    }

    #[test]
    fn samples_are_not_constant() {
        let injector = LatencyInjector::new(&LatencyConfig::default());
        let first = injector.sample().unwrap();
        assert!((0..100).any(|_| injector.sample().unwrap() != first));
    }

    #[test]
    fn disabled_injects_nothing() {
        let config = LatencyConfig {
            enabled: false,
            ..LatencyConfig::default()
        };
        assert!(LatencyInjector::new(&config).sample().is_none());
        assert!(LatencyInjector::disabled().sample().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn inject_sleeps_for_the_sampled_delay() {
        let config = LatencyConfig {
            enabled: true,
            min_ms: 100,
            max_ms: 101,
        };
        let injector = LatencyInjector::new(&config);

        let started = tokio::time::Instant::now();
        let delay = injector.inject().await.unwrap();

        assert_eq!(delay, Duration::from_millis(100));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
