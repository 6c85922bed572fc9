use crate::types::RecordEntry;
use std::collections::VecDeque;

/// Ordered frames waiting for the recorder
///
/// Strict FIFO: entries leave in the order they arrived, nothing is
/// reordered, merged or dropped except by an explicit [`RecordQueue::clear`].
#[derive(Debug, Default)]
pub struct RecordQueue {
    items: VecDeque<RecordEntry>,
}

impl RecordQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, entry: RecordEntry) {
        self.items.push_back(entry);
    }

    pub fn dequeue(&mut self) -> Option<RecordEntry> {
        self.items.pop_front()
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Discard everything still queued, returning how many entries were dropped
    pub fn clear(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorMode, Frame};

    fn entry(tag: &str) -> RecordEntry {
        RecordEntry {
            frame: Frame::blank(2, 2, ColorMode::Grayscale),
            timestamp: tag.to_string(),
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = RecordQueue::new();
        queue.enqueue(entry("a"));
        queue.enqueue(entry("b"));
        queue.enqueue(entry("a"));
        assert_eq!(queue.depth(), 3);

        let order: Vec<String> = std::iter::from_fn(|| queue.dequeue())
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(order, vec!["a", "b", "a"]);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_clear_reports_dropped() {
        let mut queue = RecordQueue::new();
        queue.enqueue(entry("x"));
        queue.enqueue(entry("y"));
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.depth(), 0);
    }
}
