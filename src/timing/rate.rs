//! Rolling frame-rate estimation over recent arrival times

use std::collections::VecDeque;
use std::time::Instant;

/// Number of arrival timestamps kept in the window
pub const RATE_WINDOW: usize = 100;

/// Frame rate derived from a bounded window of arrival timestamps
///
/// Samples must be recorded in arrival order. The rate is
/// `(n - 1) / (newest - oldest)` over the `n` samples in the window.
#[derive(Debug, Clone)]
pub struct RollingRateEstimator {
    window: VecDeque<Instant>,
    capacity: usize,
}

impl RollingRateEstimator {
    pub fn new() -> Self {
        Self::with_capacity(RATE_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an arrival timestamp, evicting the oldest one on overflow
    pub fn record(&mut self, timestamp: Instant) {
        self.window.push_back(timestamp);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    /// Frames per second over the current window, 0 when undefined
    pub fn current_rate(&self) -> f64 {
        let n = self.window.len();
        if n < 2 {
            return 0.0;
        }
        let (Some(oldest), Some(newest)) = (self.window.front(), self.window.back()) else {
            return 0.0;
        };
        let elapsed = newest.saturating_duration_since(*oldest).as_secs_f64();
        if elapsed > 0.0 {
            (n - 1) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl Default for RollingRateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rate_undefined_below_two_samples() {
        let mut est = RollingRateEstimator::new();
        assert_eq!(est.current_rate(), 0.0);
        est.record(Instant::now());
        assert_eq!(est.current_rate(), 0.0);
    }

    #[test]
    fn test_two_samples_one_second_apart() {
        let t0 = Instant::now();
        let mut est = RollingRateEstimator::new();
        est.record(t0);
        est.record(t0 + Duration::from_secs(1));
        assert!((est.current_rate() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_elapsed_is_zero_rate() {
        let t0 = Instant::now();
        let mut est = RollingRateEstimator::new();
        est.record(t0);
        est.record(t0);
        est.record(t0);
        assert_eq!(est.current_rate(), 0.0);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let t0 = Instant::now();
        let mut est = RollingRateEstimator::new();
        // 150 samples 10ms apart; only the last 100 remain, spanning 990ms
        for i in 0..150u64 {
            est.record(t0 + Duration::from_millis(i * 10));
        }
        assert_eq!(est.len(), RATE_WINDOW);
        assert!((est.current_rate() - 100.0).abs() < 1e-6);
    }
}
