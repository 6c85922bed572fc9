use crate::types::DisplaySample;

/// Single-slot mailbox holding the newest frame for the display consumer
///
/// A publish always replaces whatever is there; the producer never waits
/// on the display.
#[derive(Debug, Default)]
pub struct DisplaySlot {
    latest: Option<DisplaySample>,
}

impl DisplaySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `sample`, returning true when an unread sample was overwritten
    pub fn publish(&mut self, sample: DisplaySample) -> bool {
        self.latest.replace(sample).is_some()
    }

    /// Remove and return the pending sample
    pub fn take(&mut self) -> Option<DisplaySample> {
        self.latest.take()
    }

    /// Measured rate of the pending sample, without consuming it
    pub fn pending_rate(&self) -> Option<f64> {
        self.latest.as_ref().map(|s| s.rate)
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorMode, Frame};
    use chrono::Local;

    fn sample(rate: f64) -> DisplaySample {
        DisplaySample {
            frame: Frame::blank(4, 4, ColorMode::Grayscale),
            timestamp: Local::now(),
            rate,
        }
    }

    #[test]
    fn test_take_empties_slot() {
        let mut slot = DisplaySlot::new();
        assert!(slot.take().is_none());

        assert!(!slot.publish(sample(10.0)));
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_latest_publish_wins() {
        let mut slot = DisplaySlot::new();
        slot.publish(sample(1.0));
        assert!(slot.publish(sample(2.0)));
        assert!(slot.publish(sample(3.0)));

        assert_eq!(slot.pending_rate(), Some(3.0));
        let taken = slot.take().expect("sample pending");
        assert_eq!(taken.rate, 3.0);
        assert!(slot.is_empty());
    }
}
