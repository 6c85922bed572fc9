//! Failure absorption: last-good-frame fallback and drain stall counting

use crate::types::{ColorMode, Frame};

/// Most recent successfully processed frame, substituted on transient failures
///
/// Starts as a black frame of the configured geometry and is overwritten on
/// every success. It is never cleared.
#[derive(Debug, Clone)]
pub struct LastGoodFrame {
    frame: Frame,
}

impl LastGoodFrame {
    pub fn new(width: u32, height: u32, mode: ColorMode) -> Self {
        Self {
            frame: Frame::blank(width, height, mode),
        }
    }

    pub fn update(&mut self, frame: &Frame) {
        self.frame.clone_from(frame);
    }

    pub fn get(&self) -> &Frame {
        &self.frame
    }
}

/// Outcome of feeding one poll into a [`StallDetector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallVerdict {
    /// The write count moved since the previous poll
    Progress,
    /// No movement; carries the consecutive stalled-poll count
    Stalled(u32),
    /// The consecutive stall count reached the threshold
    Exhausted,
}

/// Counts consecutive polls in which the recorder's write count did not move
///
/// Any movement resets the count to zero.
#[derive(Debug, Clone)]
pub struct StallDetector {
    threshold: u32,
    last: u64,
    stalled: u32,
}

impl StallDetector {
    pub fn new(threshold: u32, initial_count: u64) -> Self {
        Self {
            threshold: threshold.max(1),
            last: initial_count,
            stalled: 0,
        }
    }

    pub fn observe(&mut self, count: u64) -> StallVerdict {
        if count == self.last {
            self.stalled += 1;
            if self.stalled >= self.threshold {
                StallVerdict::Exhausted
            } else {
                StallVerdict::Stalled(self.stalled)
            }
        } else {
            self.last = count;
            self.stalled = 0;
            StallVerdict::Progress
        }
    }

    pub fn stalled(&self) -> u32 {
        self.stalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_good_starts_blank() {
        let fallback = LastGoodFrame::new(8, 6, ColorMode::Color);
        assert_eq!(fallback.get().width(), 8);
        assert!(fallback.get().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_last_good_update() {
        let mut fallback = LastGoodFrame::new(8, 6, ColorMode::Grayscale);
        let frame = Frame::blank(16, 12, ColorMode::Grayscale);
        fallback.update(&frame);
        assert_eq!(fallback.get().width(), 16);
    }

    #[test]
    fn test_stall_exhausts_at_threshold() {
        let mut detector = StallDetector::new(10, 3);
        for i in 1..10 {
            assert_eq!(detector.observe(3), StallVerdict::Stalled(i));
        }
        assert_eq!(detector.observe(3), StallVerdict::Exhausted);
    }

    #[test]
    fn test_any_progress_resets() {
        let mut detector = StallDetector::new(3, 0);
        assert_eq!(detector.observe(0), StallVerdict::Stalled(1));
        assert_eq!(detector.observe(0), StallVerdict::Stalled(2));
        assert_eq!(detector.observe(1), StallVerdict::Progress);
        assert_eq!(detector.stalled(), 0);
        assert_eq!(detector.observe(1), StallVerdict::Stalled(1));
        assert_eq!(detector.observe(2), StallVerdict::Progress);
    }
}
