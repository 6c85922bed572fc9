//! Scripted recorder and callback doubles
//!
//! A [`ScriptedRecorderFactory`] hands out recorders that report into one
//! shared [`RecorderTap`] and into a tap of their own, so a test can
//! watch writes and closing from outside the recorder worker thread.

use crate::errors::CameraError;
use crate::pipeline::EventCallbacks;
use crate::recording::{Recorder, RecorderFactory, RecorderRequest};
use crate::types::Frame;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// How scripted recorders behave
#[derive(Debug, Clone, Copy, Default)]
pub struct RecorderBehavior {
    /// Time spent in every write
    pub write_delay: Duration,
    /// Block every write until [`RecorderTap::release`] is called on the
    /// factory's tap, whether or not the recorder was closed meanwhile
    pub hang: bool,
    /// Refuse to open
    pub fail_open: bool,
}

#[derive(Default)]
struct TapInner {
    written: AtomicU64,
    closed: AtomicBool,
    timestamps: Mutex<Vec<String>>,
    requests: Mutex<Vec<RecorderRequest>>,
    released: Mutex<bool>,
    gate: Condvar,
}

/// Observation handle for scripted recorders
#[derive(Clone, Default)]
pub struct RecorderTap {
    inner: Arc<TapInner>,
}

impl RecorderTap {
    pub fn written(&self) -> u64 {
        self.inner.written.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Timestamps received, in write order
    pub fn timestamps(&self) -> Vec<String> {
        self.inner.timestamps.lock().expect("lock poisoned").clone()
    }

    /// Requests the factory was asked to open, including refused ones
    pub fn requests(&self) -> Vec<RecorderRequest> {
        self.inner.requests.lock().expect("lock poisoned").clone()
    }

    /// Let hanging writes proceed
    pub fn release(&self) {
        *self.inner.released.lock().expect("lock poisoned") = true;
        self.inner.gate.notify_all();
    }

    /// Poll until the recorder is closed or `timeout` passes
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.is_closed() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        self.is_closed()
    }

    fn wait_released(&self) {
        let mut released = self.inner.released.lock().expect("lock poisoned");
        while !*released {
            released = self.inner.gate.wait(released).expect("lock poisoned");
        }
    }

    fn record(&self, timestamp: &str) {
        self.inner
            .timestamps
            .lock()
            .expect("lock poisoned")
            .push(timestamp.to_string());
        self.inner.written.fetch_add(1, Ordering::SeqCst);
    }

    fn mark_closed(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}

/// Recorder that counts frames without persisting them
///
/// Closing takes effect at once, even during a hanging write; that write
/// then fails instead of counting its frame.
pub struct ScriptedRecorder {
    behavior: RecorderBehavior,
    shared: RecorderTap,
    own: RecorderTap,
}

impl Recorder for ScriptedRecorder {
    fn write(&self, _frame: &Frame, timestamp: &str) -> Result<(), CameraError> {
        if self.own.is_closed() {
            return Err(CameraError::RecorderError("recorder already closed".to_string()));
        }
        if self.behavior.hang {
            self.shared.wait_released();
        }
        if !self.behavior.write_delay.is_zero() {
            std::thread::sleep(self.behavior.write_delay);
        }
        if self.own.is_closed() {
            return Err(CameraError::RecorderError(
                "recorder closed during write".to_string(),
            ));
        }
        self.shared.record(timestamp);
        self.own.record(timestamp);
        Ok(())
    }

    fn write_count(&self) -> u64 {
        self.own.written()
    }

    fn close(&self) -> Result<(), CameraError> {
        self.own.mark_closed();
        self.shared.mark_closed();
        Ok(())
    }
}

/// Factory producing [`ScriptedRecorder`]s
///
/// The n-th open uses the n-th scripted behavior; the last one repeats.
#[derive(Clone, Default)]
pub struct ScriptedRecorderFactory {
    script: Arc<Vec<RecorderBehavior>>,
    tap: RecorderTap,
    opened: Arc<Mutex<Vec<RecorderTap>>>,
}

impl ScriptedRecorderFactory {
    pub fn new(behavior: RecorderBehavior) -> Self {
        Self::scripted([behavior])
    }

    pub fn scripted(script: impl IntoIterator<Item = RecorderBehavior>) -> Self {
        Self {
            script: Arc::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Tap shared by every recorder this factory opens
    pub fn tap(&self) -> RecorderTap {
        self.tap.clone()
    }

    /// One tap per opened recorder, in opening order
    pub fn recorder_taps(&self) -> Vec<RecorderTap> {
        self.opened.lock().expect("lock poisoned").clone()
    }
}

impl RecorderFactory for ScriptedRecorderFactory {
    fn open(&self, request: &RecorderRequest) -> Result<Box<dyn Recorder>, CameraError> {
        let attempt = {
            let mut requests = self.tap.inner.requests.lock().expect("lock poisoned");
            requests.push(request.clone());
            requests.len() - 1
        };
        let behavior = self
            .script
            .get(attempt)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or_default();
        if behavior.fail_open {
            return Err(CameraError::RecorderError("scripted open failure".to_string()));
        }

        let own = RecorderTap::default();
        self.opened.lock().expect("lock poisoned").push(own.clone());
        Ok(Box::new(ScriptedRecorder {
            behavior,
            shared: self.tap.clone(),
            own,
        }))
    }
}

/// Collects status and error messages
#[derive(Clone, Default)]
pub struct EventLog {
    status: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callbacks(&self) -> EventCallbacks {
        let status = self.status.clone();
        let errors = self.errors.clone();
        EventCallbacks::new(
            Arc::new(move |msg| status.lock().expect("lock poisoned").push(msg.to_string())),
            Arc::new(move |msg| errors.lock().expect("lock poisoned").push(msg.to_string())),
        )
    }

    pub fn status(&self) -> Vec<String> {
        self.status.lock().expect("lock poisoned").clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("lock poisoned").clone()
    }
}
