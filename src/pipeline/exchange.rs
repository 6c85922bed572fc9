//! The state shared between the capture, recorder and display contexts
//!
//! Display slot, record queue, the saving and capturing flags, the
//! new-frame subscription and the recorder's published write count all live
//! behind one mutex. No other lock is ever taken while it is held.
//!
//! Every call to [`FrameExchange::begin_saving`] starts a new generation.
//! A recorder worker only dequeues and reports progress for the generation
//! it was started with, so a worker left behind by a stalled session can
//! never consume frames queued for the next one.

use super::display::DisplaySlot;
use super::queue::RecordQueue;
use crate::errors::CameraError;
use crate::timing::format_day_number;
use crate::types::{DisplaySample, Frame, RecordEntry};
use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// "A new frame is waiting in the record queue"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameNotice;

struct Shared {
    display: DisplaySlot,
    queue: RecordQueue,
    saving: bool,
    capturing: bool,
    subscriber: Option<Sender<FrameNotice>>,
    enqueued: u64,
    written: u64,
    generation: u64,
}

struct Inner {
    state: Mutex<Shared>,
    progress: Condvar,
}

/// Result of one drain poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainPoll {
    pub depth: usize,
    pub written: u64,
}

/// Cloneable handle to the shared frame state
#[derive(Clone)]
pub struct FrameExchange {
    inner: Arc<Inner>,
}

impl FrameExchange {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(Shared {
                    display: DisplaySlot::new(),
                    queue: RecordQueue::new(),
                    saving: false,
                    capturing: false,
                    subscriber: None,
                    enqueued: 0,
                    written: 0,
                    generation: 0,
                }),
                progress: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.inner.state.lock().expect("lock poisoned")
    }

    /// Hand a finished frame to the display slot and, while saving, the record queue
    ///
    /// Returns true when the frame was queued for recording. Never blocks
    /// beyond the critical section.
    pub fn publish(&self, frame: Frame, timestamp: DateTime<Local>, rate: f64) -> bool {
        let mut g = self.lock();

        let recorded = if g.saving {
            g.queue.enqueue(RecordEntry {
                frame: frame.clone(),
                timestamp: format_day_number(&timestamp),
            });
            g.enqueued += 1;
            if let Some(tx) = &g.subscriber {
                if tx.send(FrameNotice).is_err() {
                    log::warn!("Recorder worker is gone; frame stays queued");
                }
            }
            true
        } else {
            false
        };

        g.display.publish(DisplaySample {
            frame,
            timestamp,
            rate,
        });
        recorded
    }

    pub fn take_display(&self) -> Option<DisplaySample> {
        self.lock().display.take()
    }

    pub fn pending_display_rate(&self) -> Option<f64> {
        self.lock().display.pending_rate()
    }

    pub fn dequeue(&self) -> Option<RecordEntry> {
        self.lock().queue.dequeue()
    }

    /// Dequeue on behalf of the worker started for `generation`
    ///
    /// Returns `None` once that generation has been retired.
    pub fn dequeue_for(&self, generation: u64) -> Option<RecordEntry> {
        let mut g = self.lock();
        if g.generation != generation {
            return None;
        }
        g.queue.dequeue()
    }

    pub fn depth(&self) -> usize {
        self.lock().queue.depth()
    }

    /// Discard every queued frame and retire the current generation
    pub fn clear_queue(&self) -> usize {
        let mut g = self.lock();
        g.generation += 1;
        g.queue.clear()
    }

    /// Start accepting frames for recording and subscribe `subscriber` to notices
    ///
    /// Returns the generation the recorder worker must use.
    pub fn begin_saving(&self, subscriber: Sender<FrameNotice>) -> Result<u64, CameraError> {
        let mut g = self.lock();
        if g.saving {
            return Err(CameraError::SessionError("already saving".to_string()));
        }
        g.saving = true;
        g.subscriber = Some(subscriber);
        g.enqueued = 0;
        g.written = 0;
        g.generation += 1;
        Ok(g.generation)
    }

    /// Stop accepting frames and drop the subscription in one step
    ///
    /// Returns false if saving was already off.
    pub fn end_saving(&self) -> bool {
        let mut g = self.lock();
        let was_saving = g.saving;
        g.saving = false;
        g.subscriber = None;
        was_saving
    }

    pub fn is_saving(&self) -> bool {
        self.lock().saving
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.lock().capturing = capturing;
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().capturing
    }

    /// Frames queued since the last [`FrameExchange::begin_saving`]
    pub fn enqueued(&self) -> u64 {
        self.lock().enqueued
    }

    pub fn written(&self) -> u64 {
        self.lock().written
    }

    /// Publish the recorder's write count and wake a waiting drain
    ///
    /// Reports from a retired generation are ignored.
    pub fn report_written(&self, generation: u64, count: u64) {
        let mut g = self.lock();
        if g.generation != generation {
            return;
        }
        g.written = count;
        self.inner.progress.notify_all();
    }

    /// Wait up to `timeout` for the write count to move away from `last_written`
    ///
    /// Returns early when progress is reported or the queue is empty.
    pub fn wait_for_progress(&self, last_written: u64, timeout: Duration) -> DrainPoll {
        let deadline = Instant::now() + timeout;
        let mut g = self.lock();
        loop {
            if g.queue.depth() == 0 || g.written != last_written {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (ng, _) = self
                .inner
                .progress
                .wait_timeout(g, deadline - now)
                .expect("lock poisoned");
            g = ng;
        }
        DrainPoll {
            depth: g.queue.depth(),
            written: g.written,
        }
    }
}

impl Default for FrameExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorMode;
    use crossbeam_channel::unbounded;

    fn frame() -> Frame {
        Frame::blank(4, 4, ColorMode::Color)
    }

    #[test]
    fn test_publish_without_saving_only_updates_display() {
        let exchange = FrameExchange::new();
        assert!(!exchange.publish(frame(), Local::now(), 30.0));
        assert_eq!(exchange.depth(), 0);
        assert!(exchange.take_display().is_some());
        assert!(exchange.take_display().is_none());
    }

    #[test]
    fn test_saving_enqueues_and_notifies() {
        let exchange = FrameExchange::new();
        let (tx, rx) = unbounded();
        exchange.begin_saving(tx).unwrap();

        assert!(exchange.publish(frame(), Local::now(), 30.0));
        assert!(exchange.publish(frame(), Local::now(), 30.0));
        assert_eq!(exchange.depth(), 2);
        assert_eq!(exchange.enqueued(), 2);
        assert_eq!(rx.try_iter().count(), 2);

        let entry = exchange.dequeue().expect("queued");
        assert!(entry.timestamp.ends_with('\n'));
    }

    #[test]
    fn test_end_saving_unsubscribes() {
        let exchange = FrameExchange::new();
        let (tx, rx) = unbounded();
        exchange.begin_saving(tx).unwrap();
        exchange.publish(frame(), Local::now(), 30.0);

        assert!(exchange.end_saving());
        assert!(!exchange.end_saving());
        assert!(!exchange.publish(frame(), Local::now(), 30.0));

        // buffered notice is still delivered, then the channel reports disconnect
        assert_eq!(rx.iter().count(), 1);
        assert_eq!(exchange.depth(), 1);
    }

    #[test]
    fn test_begin_saving_twice_fails() {
        let exchange = FrameExchange::new();
        let (tx, _rx) = unbounded();
        exchange.begin_saving(tx.clone()).unwrap();
        assert!(exchange.begin_saving(tx).is_err());
    }

    #[test]
    fn test_wait_for_progress_returns_early() {
        let exchange = FrameExchange::new();
        let (tx, _rx) = unbounded();
        let generation = exchange.begin_saving(tx).unwrap();
        exchange.publish(frame(), Local::now(), 30.0);

        let writer = exchange.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.report_written(generation, 1);
        });

        let start = Instant::now();
        let poll = exchange.wait_for_progress(0, Duration::from_secs(5));
        handle.join().unwrap();

        assert_eq!(poll.written, 1);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_wait_for_progress_times_out() {
        let exchange = FrameExchange::new();
        let (tx, _rx) = unbounded();
        exchange.begin_saving(tx).unwrap();
        exchange.publish(frame(), Local::now(), 30.0);

        let start = Instant::now();
        let poll = exchange.wait_for_progress(0, Duration::from_millis(30));
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(poll, DrainPoll { depth: 1, written: 0 });
    }

    #[test]
    fn test_retired_generation_cannot_dequeue_or_report() {
        let exchange = FrameExchange::new();
        let (tx, _rx) = unbounded();
        let first = exchange.begin_saving(tx).unwrap();
        exchange.publish(frame(), Local::now(), 30.0);
        exchange.end_saving();
        assert_eq!(exchange.clear_queue(), 1);

        let (tx, _rx) = unbounded();
        let second = exchange.begin_saving(tx).unwrap();
        assert_ne!(first, second);
        exchange.publish(frame(), Local::now(), 30.0);

        assert!(exchange.dequeue_for(first).is_none());
        exchange.report_written(first, 7);
        assert_eq!(exchange.written(), 0);
        assert_eq!(exchange.depth(), 1);

        assert!(exchange.dequeue_for(second).is_some());
        exchange.report_written(second, 1);
        assert_eq!(exchange.written(), 1);
    }
}
