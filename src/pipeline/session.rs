//! Recording sessions: start, drain and close
//!
//! A session moves strictly forward through
//! `Idle -> Active -> Draining -> Closed`. The controller holds at most one
//! session; once it closes, the controller reports `Idle` again and the next
//! `start` creates a fresh session.

use super::events::EventCallbacks;
use super::exchange::FrameExchange;
use super::fault::{StallDetector, StallVerdict};
use super::worker;
use crate::errors::CameraError;
use crate::recording::{Recorder, RecorderFactory, RecorderRequest};
use crate::timing::format_status_timestamp;
use crate::types::{ColorMode, Resolution};
use chrono::Local;
use crossbeam_channel::unbounded;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Reported when the recorder cannot be opened
pub const RECORDER_OPEN_FAILED: &str = "Video-recording could not be started.";
/// Reported when a drain stops making progress
pub const FRAMES_CANNOT_BE_SAVED: &str = "Frames cannot be saved.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Active,
    Draining,
    Closed,
}

impl SessionState {
    fn can_advance_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Idle, SessionState::Active)
                | (SessionState::Active, SessionState::Draining)
                | (SessionState::Draining, SessionState::Closed)
        )
    }
}

/// Where and how to record a new session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub save_dir: PathBuf,
    pub name: String,
    pub file_index: u32,
    /// Rate used for triggered recordings; 0 leaves the choice to the controller
    pub target_rate: f64,
    /// Use `target_rate` verbatim instead of the measured rate
    pub triggered: bool,
}

impl SessionRequest {
    pub fn new(save_dir: impl Into<PathBuf>, name: impl Into<String>, file_index: u32) -> Self {
        Self {
            save_dir: save_dir.into(),
            name: name.into(),
            file_index,
            target_rate: 0.0,
            triggered: false,
        }
    }

    pub fn with_target_rate(mut self, rate: f64) -> Self {
        self.target_rate = rate;
        self
    }

    /// Mark as triggered, recording at exactly `rate`
    pub fn triggered(mut self, rate: f64) -> Self {
        self.triggered = true;
        self.target_rate = rate;
        self
    }
}

/// Timing of the drain protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSettings {
    /// Longest wait between two polls of the queue
    pub poll_interval: Duration,
    /// Consecutive polls without write progress before giving up
    pub stall_threshold: u32,
    /// How long to wait for the recorder worker to finish its last write
    /// after a completed drain
    pub join_timeout: Duration,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            stall_threshold: 10,
            join_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainOutcome {
    /// Every queued frame reached the recorder
    Completed,
    /// Write progress stopped; remaining frames were discarded
    Stalled,
}

/// Summary of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct DrainReport {
    pub session_id: Uuid,
    pub outcome: DrainOutcome,
    /// Frames queued during the session
    pub expected: u64,
    /// Frames the recorder reported as written
    pub written: u64,
    /// Frames dropped from the queue after a stall
    pub discarded: usize,
    pub polls: u32,
    /// Consecutive stalled polls at the end of the drain
    pub stalled_polls: u32,
    /// Whether the recorder was closed before `stop` returned
    pub recorder_closed: bool,
    /// Whether the recorder worker exited before `stop` returned
    pub worker_joined: bool,
    pub elapsed: Duration,
    pub final_state: SessionState,
}

struct Session {
    id: Uuid,
    state: SessionState,
    rate: f64,
    resolution: Resolution,
    recorder: Option<Arc<dyn Recorder>>,
    worker: Option<JoinHandle<u64>>,
}

impl Session {
    fn new(rate: f64, resolution: Resolution) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            rate,
            resolution,
            recorder: None,
            worker: None,
        }
    }

    fn advance(&mut self, next: SessionState) -> Result<(), CameraError> {
        if !self.state.can_advance_to(next) {
            return Err(CameraError::SessionError(format!(
                "illegal transition {:?} -> {:?}",
                self.state, next
            )));
        }
        log::debug!("Session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Owns the recording-session lifecycle for one camera
pub struct SessionController {
    exchange: FrameExchange,
    factory: Box<dyn RecorderFactory>,
    events: EventCallbacks,
    settings: DrainSettings,
    owner: String,
    color_mode: ColorMode,
    configured_rate: f64,
    session: Option<Session>,
}

impl SessionController {
    pub fn new(
        exchange: FrameExchange,
        factory: Box<dyn RecorderFactory>,
        events: EventCallbacks,
        color_mode: ColorMode,
        configured_rate: f64,
    ) -> Self {
        Self {
            exchange,
            factory,
            events,
            settings: DrainSettings::default(),
            owner: "camera".to_string(),
            color_mode,
            configured_rate,
            session: None,
        }
    }

    pub fn with_settings(mut self, settings: DrainSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SessionState::Idle)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Rate of the active session
    pub fn session_rate(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.rate)
    }

    fn effective_rate(&self, request: &SessionRequest) -> f64 {
        if request.triggered && request.target_rate > 0.0 {
            return request.target_rate;
        }
        match self.exchange.pending_display_rate() {
            Some(rate) if rate > 0.0 => rate,
            _ => {
                let fallback = if request.target_rate > 0.0 {
                    request.target_rate
                } else {
                    self.configured_rate
                };
                log::warn!("Frame rate was not measured; recording at {} fps", fallback);
                fallback
            }
        }
    }

    /// Open a recorder and start queueing frames for it
    ///
    /// On failure the error callback fires once and the controller stays
    /// `Idle`.
    pub fn start(&mut self, request: &SessionRequest, resolution: Resolution) -> Result<(), CameraError> {
        if let Some(current) = &self.session {
            return Err(CameraError::SessionError(format!(
                "session {} is still {:?}",
                current.id, current.state
            )));
        }

        let mut session = Session::new(self.effective_rate(request), resolution);
        let recorder_request = RecorderRequest {
            owner: self.owner.clone(),
            save_dir: request.save_dir.clone(),
            name: request.name.clone(),
            file_index: request.file_index,
            resolution,
            rate: session.rate,
            color_mode: self.color_mode,
        };

        let recorder: Arc<dyn Recorder> = match self.factory.open(&recorder_request) {
            Ok(recorder) => Arc::from(recorder),
            Err(e) => {
                log::error!("Failed to open recorder for {:?}: {}", request.save_dir, e);
                self.events.error(RECORDER_OPEN_FAILED);
                return Err(e);
            }
        };

        let (tx, rx) = unbounded();
        let generation = match self.exchange.begin_saving(tx) {
            Ok(generation) => generation,
            Err(e) => {
                close_quietly(session.id, recorder.as_ref());
                return Err(e);
            }
        };

        let spawned = worker::spawn(
            session.id,
            generation,
            recorder.clone(),
            self.exchange.clone(),
            rx,
        );
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.exchange.end_saving();
                self.exchange.clear_queue();
                close_quietly(session.id, recorder.as_ref());
                self.events.error(RECORDER_OPEN_FAILED);
                return Err(CameraError::SessionError(format!("spawn failed: {e}")));
            }
        };
        session.recorder = Some(recorder);
        session.worker = Some(handle);
        session.advance(SessionState::Active)?;

        log::info!(
            "Session {} recording {} @ {:.2} fps into {:?}",
            session.id,
            resolution,
            session.rate,
            request.save_dir
        );
        self.session = Some(session);
        Ok(())
    }

    /// Stop queueing, drain what is queued and close the recorder
    ///
    /// Returns `None` when no session is active. Always terminates: the drain
    /// gives up after `stall_threshold` consecutive polls without progress.
    pub fn stop(&mut self) -> Option<DrainReport> {
        let mut session = self.session.take()?;
        let started = Instant::now();

        self.exchange.end_saving();
        if let Err(e) = session.advance(SessionState::Draining) {
            log::error!("Session {}: {}", session.id, e);
        }

        let expected = self.exchange.enqueued();
        let mut last = self.exchange.written();
        let mut detector = StallDetector::new(self.settings.stall_threshold, last);
        let mut polls = 0u32;
        let mut outcome = DrainOutcome::Completed;

        while self.exchange.depth() > 0 {
            let poll = self
                .exchange
                .wait_for_progress(last, self.settings.poll_interval);
            polls += 1;
            log::debug!(
                "Writing: {} of {} ({} queued)",
                poll.written,
                expected,
                poll.depth
            );

            match detector.observe(poll.written) {
                StallVerdict::Progress => last = poll.written,
                StallVerdict::Stalled(_) => {}
                StallVerdict::Exhausted => {
                    outcome = DrainOutcome::Stalled;
                    break;
                }
            }
        }

        let mut discarded = 0;
        if outcome == DrainOutcome::Stalled {
            discarded = self.exchange.clear_queue();
            log::error!(
                "Session {}: no write progress for {} polls, discarding {} frames",
                session.id,
                detector.stalled(),
                discarded
            );
            self.events.error(FRAMES_CANNOT_BE_SAVED);
        }

        // After a stall the worker may be blocked in a write, so the
        // recorder is closed first and the worker only gets a short grace
        let (worker_joined, recorder_closed) = match outcome {
            DrainOutcome::Completed => {
                let joined = self.join_worker(&mut session, self.settings.join_timeout);
                (joined, self.close_recorder(&session))
            }
            DrainOutcome::Stalled => {
                let closed = self.close_recorder(&session);
                (self.join_worker(&mut session, self.settings.poll_interval), closed)
            }
        };
        let written = session
            .recorder
            .as_ref()
            .map(|r| r.write_count())
            .unwrap_or_else(|| self.exchange.written());

        if outcome == DrainOutcome::Completed {
            let summary = format!(
                "{} \t All frames written: {} of {}",
                format_status_timestamp(&Local::now()),
                written,
                expected
            );
            self.events.timestamped_event(&summary);
        }

        if let Err(e) = session.advance(SessionState::Closed) {
            log::error!("Session {}: {}", session.id, e);
        }
        log::info!(
            "Session {} closed: {:?}, {} of {} frames written",
            session.id,
            outcome,
            written,
            expected
        );

        Some(DrainReport {
            session_id: session.id,
            outcome,
            expected,
            written,
            discarded,
            polls,
            stalled_polls: detector.stalled(),
            recorder_closed,
            worker_joined,
            elapsed: started.elapsed(),
            final_state: session.state,
        })
    }

    fn close_recorder(&self, session: &Session) -> bool {
        let Some(recorder) = &session.recorder else {
            return false;
        };
        match recorder.close() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Session {}: failed to close recorder: {}", session.id, e);
                false
            }
        }
    }

    fn join_worker(&self, session: &mut Session, timeout: Duration) -> bool {
        let Some(handle) = session.worker.take() else {
            return false;
        };
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                return match handle.join() {
                    Ok(_) => true,
                    Err(_) => {
                        log::error!("Session {}: recorder worker panicked", session.id);
                        false
                    }
                };
            }
            if start.elapsed() >= timeout {
                // Once retired it can no longer dequeue or report for later sessions
                log::warn!(
                    "Session {}: recorder worker still busy after {:?}, detaching",
                    session.id,
                    timeout
                );
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

fn close_quietly(session_id: Uuid, recorder: &dyn Recorder) {
    if let Err(e) = recorder.close() {
        log::error!("Session {}: failed to close recorder: {}", session_id, e);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.session.is_some() {
            log::warn!("Session controller dropped with an open session; draining");
            self.stop();
        }
    }
}
