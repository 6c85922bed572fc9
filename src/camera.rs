//! One camera with its capture thread and recording sessions
//!
//! [`Camera`] ties a [`CameraSource`] to the frame exchange, runs the capture
//! loop on its own thread and drives recording sessions through a
//! [`SessionController`]. Capture and recording are started and stopped
//! independently.

use crate::config::CamflowConfig;
use crate::errors::CameraError;
use crate::overlay::{AuxiliarySource, OverlayPainter};
use crate::pipeline::{
    CaptureLoop, CaptureStats, DrainReport, EventCallbacks, FrameExchange, FrameProcessor,
    SessionController, SessionRequest, SessionState,
};
use crate::platform::{CameraInitParams, CameraSource};
use crate::recording::RecorderFactory;
use crate::types::{DeviceProperties, DisplaySample, RecordEntry, Resolution};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// What the capture thread borrows while it runs
struct CaptureParts {
    source: Box<dyn CameraSource>,
    painter: OverlayPainter,
    processor: Option<Box<dyn FrameProcessor>>,
}

/// Geometry and rate negotiated at open
#[derive(Debug, Clone)]
struct DeviceInfo {
    resolution: Resolution,
    rate: u32,
    properties: Option<DeviceProperties>,
}

pub struct Camera {
    config: CamflowConfig,
    exchange: FrameExchange,
    sessions: SessionController,
    parts: Arc<Mutex<Option<CaptureParts>>>,
    capture_thread: Option<JoinHandle<CaptureStats>>,
    info: Option<DeviceInfo>,
}

impl Camera {
    /// Camera recording with the configured backend and logging callbacks
    pub fn new(config: CamflowConfig, source: Box<dyn CameraSource>) -> Result<Self, CameraError> {
        let factory = config.recording.backend.factory()?;
        Ok(Self::with_parts(config, source, factory, EventCallbacks::logging()))
    }

    pub fn with_parts(
        config: CamflowConfig,
        source: Box<dyn CameraSource>,
        factory: Box<dyn RecorderFactory>,
        events: EventCallbacks,
    ) -> Self {
        let exchange = FrameExchange::new();
        let sessions = SessionController::new(
            exchange.clone(),
            factory,
            events,
            config.camera.color_mode,
            config.camera.target_rate as f64,
        )
        .with_settings(config.recording.drain_settings())
        .with_owner(config.camera.device_id.clone());

        let painter = OverlayPainter::new(config.overlay.timestamp, config.overlay.font_scale);

        Self {
            config,
            exchange,
            sessions,
            parts: Arc::new(Mutex::new(Some(CaptureParts {
                source,
                painter,
                processor: None,
            }))),
            capture_thread: None,
            info: None,
        }
    }

    /// Attach a secondary overlay source
    ///
    /// Ignored unless `overlay.auxiliary` is enabled in the configuration.
    pub fn with_auxiliary(self, auxiliary: Box<dyn AuxiliarySource>) -> Self {
        if !self.config.overlay.auxiliary {
            log::debug!("Auxiliary overlay disabled in configuration; source not attached");
            return self;
        }
        if let Some(parts) = self.parts.lock().expect("lock poisoned").as_mut() {
            let painter = std::mem::take(&mut parts.painter);
            parts.painter = painter.with_auxiliary(auxiliary);
        }
        self
    }

    pub fn with_processor(self, processor: Box<dyn FrameProcessor>) -> Self {
        if let Some(parts) = self.parts.lock().expect("lock poisoned").as_mut() {
            parts.processor = Some(processor);
        }
        self
    }

    pub fn config(&self) -> &CamflowConfig {
        &self.config
    }

    /// Shared state handle, for display consumers on other threads
    pub fn exchange(&self) -> FrameExchange {
        self.exchange.clone()
    }

    /// Open the device with the configured geometry and rate
    pub fn open(&mut self) -> Result<(), CameraError> {
        if self.is_capturing() {
            return Err(CameraError::SessionError(
                "cannot reopen while capturing".to_string(),
            ));
        }

        let params = CameraInitParams {
            device_id: self.config.camera.device_id.clone(),
            target_rate: self.config.camera.target_rate,
            width: self.config.camera.frame_width,
            height: self.config.camera.frame_height,
        };

        let mut guard = self.parts.lock().expect("lock poisoned");
        let parts = guard.as_mut().ok_or_else(|| {
            CameraError::InitializationError("camera source is held by a capture thread".to_string())
        })?;

        parts.source.open(&params)?;
        let info = DeviceInfo {
            resolution: parts.source.resolution()?,
            rate: parts.source.rate()?,
            properties: parts.source.properties(),
        };
        drop(guard);

        log::info!(
            "Opened camera {} at {} @ {} fps",
            params.device_id,
            info.resolution,
            info.rate
        );
        self.info = Some(info);
        Ok(())
    }

    pub fn is_working(&self) -> bool {
        self.info.is_some()
    }

    /// Backend properties; `None` with a warning when the camera is not open
    pub fn device_properties(&self) -> Option<DeviceProperties> {
        let Some(info) = &self.info else {
            log::warn!("Camera is not open; no properties available");
            return None;
        };
        // While capturing the source is on the capture thread; use the snapshot from open
        match self.parts.lock().expect("lock poisoned").as_ref() {
            Some(parts) => parts.source.properties(),
            None => info.properties.clone(),
        }
    }

    pub fn resolution(&self) -> Result<Resolution, CameraError> {
        self.info
            .as_ref()
            .map(|i| i.resolution)
            .ok_or_else(|| CameraError::NotOpened("resolution".to_string()))
    }

    pub fn rate(&self) -> Result<u32, CameraError> {
        self.info
            .as_ref()
            .map(|i| i.rate)
            .ok_or_else(|| CameraError::NotOpened("rate".to_string()))
    }

    /// Start the capture loop on a dedicated thread; no-op when already running
    pub fn start_capture(&mut self) -> Result<(), CameraError> {
        let resolution = self.resolution()?;
        if let Some(handle) = &self.capture_thread {
            if !handle.is_finished() {
                if self.exchange.is_capturing() {
                    return Ok(());
                }
                return Err(CameraError::SessionError(
                    "previous capture thread has not stopped yet".to_string(),
                ));
            }
            self.reap_capture_thread();
        }

        let parts = self.parts.clone();
        let exchange = self.exchange.clone();
        let color_mode = self.config.camera.color_mode;

        self.exchange.set_capturing(true);
        let spawned = std::thread::Builder::new()
            .name("camflow-capture".to_string())
            .spawn(move || capture_thread(parts, exchange, resolution, color_mode));

        match spawned {
            Ok(handle) => {
                self.capture_thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.exchange.set_capturing(false);
                Err(CameraError::InitializationError(format!("spawn failed: {e}")))
            }
        }
    }

    /// Run the capture loop on the calling thread until capturing is cleared
    ///
    /// Another thread stops it through [`FrameExchange::set_capturing`] on
    /// the handle from [`Camera::exchange`].
    pub fn run_capture(&mut self) -> Result<CaptureStats, CameraError> {
        let resolution = self.resolution()?;
        if self.capture_thread.is_some() {
            return Err(CameraError::SessionError(
                "capture already runs on a thread".to_string(),
            ));
        }

        self.exchange.set_capturing(true);
        Ok(capture_thread(
            self.parts.clone(),
            self.exchange.clone(),
            resolution,
            self.config.camera.color_mode,
        ))
    }

    /// Clear the capturing flag and wait for the capture thread
    ///
    /// Returns `Ok(None)` when no capture thread was running. A read in
    /// progress is never interrupted; if it outlasts the join timeout the
    /// thread is kept so a later call can retry.
    pub fn stop_capture(&mut self) -> Result<Option<CaptureStats>, CameraError> {
        self.exchange.set_capturing(false);

        let Some(handle) = self.capture_thread.take() else {
            return Ok(None);
        };

        let timeout = Duration::from_millis(self.config.recording.worker_join_timeout_ms);
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                return match handle.join() {
                    Ok(stats) => Ok(Some(stats)),
                    Err(_) => Err(CameraError::CaptureError("capture thread panicked".to_string())),
                };
            }
            if start.elapsed() >= timeout {
                self.capture_thread = Some(handle);
                return Err(CameraError::CaptureError(format!(
                    "capture thread did not stop within {:?}",
                    timeout
                )));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.exchange.is_capturing()
    }

    /// Most recent frame for display, emptying the slot
    pub fn take_display_frame(&self) -> Option<DisplaySample> {
        self.exchange.take_display()
    }

    /// Oldest queued record entry
    ///
    /// The recorder worker consumes the same queue; entries taken here are
    /// not written.
    pub fn take_record_frame(&self) -> Option<RecordEntry> {
        self.exchange.dequeue()
    }

    pub fn record_queue_depth(&self) -> usize {
        self.exchange.depth()
    }

    /// Request for the configured destination and name
    pub fn session_request(&self, file_index: u32) -> SessionRequest {
        SessionRequest::new(
            &self.config.recording.save_dir,
            self.config.recording.name.clone(),
            file_index,
        )
    }

    /// Start a recording session at the negotiated resolution
    pub fn start_saving(&mut self, request: &SessionRequest) -> Result<(), CameraError> {
        let resolution = self.resolution()?;
        self.sessions.start(request, resolution)
    }

    /// Drain and close the active session; `None` when none is active
    pub fn stop_saving(&mut self) -> Option<DrainReport> {
        self.sessions.stop()
    }

    pub fn is_saving(&self) -> bool {
        self.exchange.is_saving()
    }

    pub fn session_state(&self) -> SessionState {
        self.sessions.state()
    }

    /// Stop recording, stop capturing and release the device
    pub fn close(&mut self) {
        if let Some(report) = self.stop_saving() {
            log::info!(
                "Closed recording session {}: {} of {} frames written",
                report.session_id,
                report.written,
                report.expected
            );
        }
        if let Err(e) = self.stop_capture() {
            log::warn!("Error stopping capture during close: {}", e);
        }
        if let Some(parts) = self.parts.lock().expect("lock poisoned").as_mut() {
            if parts.source.is_open() {
                parts.source.close();
                log::info!("Released camera {}", self.config.camera.device_id);
            }
        }
        self.info = None;
    }

    fn reap_capture_thread(&mut self) {
        if let Some(handle) = self.capture_thread.take() {
            if handle.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.close();
    }
}

fn capture_thread(
    slot: Arc<Mutex<Option<CaptureParts>>>,
    exchange: FrameExchange,
    resolution: Resolution,
    color_mode: crate::types::ColorMode,
) -> CaptureStats {
    let Some(parts) = slot.lock().expect("lock poisoned").take() else {
        log::error!("Camera source unavailable; capture not started");
        exchange.set_capturing(false);
        return CaptureStats::default();
    };

    let mut capture = CaptureLoop::new(
        parts.source,
        exchange,
        resolution.width,
        resolution.height,
        color_mode,
    )
    .with_painter(parts.painter);
    if let Some(processor) = parts.processor {
        capture = capture.with_processor(processor);
    }

    let stats = capture.run();

    let (source, painter, processor) = capture.into_parts();
    *slot.lock().expect("lock poisoned") = Some(CaptureParts {
        source,
        painter,
        processor,
    });
    stats
}
