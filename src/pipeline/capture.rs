//! The producer: continuous acquisition, post-processing and hand-off

use super::convert::convert;
use super::exchange::FrameExchange;
use super::fault::LastGoodFrame;
use crate::errors::CameraError;
use crate::overlay::OverlayPainter;
use crate::platform::CameraSource;
use crate::timing::{format_overlay_timestamp, RollingRateEstimator};
use crate::types::{ColorMode, Frame};
use chrono::Local;
use serde::Serialize;
use std::time::Instant;

/// Optional user hook run on every converted frame before overlays
///
/// An error is treated like a failed conversion: the last good frame is
/// used instead.
pub trait FrameProcessor: Send {
    fn process(&mut self, frame: Frame) -> Result<Frame, CameraError>;
}

impl<F> FrameProcessor for F
where
    F: FnMut(Frame) -> Result<Frame, CameraError> + Send,
{
    fn process(&mut self, frame: Frame) -> Result<Frame, CameraError> {
        self(frame)
    }
}

/// What happened to the frame of one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Frame published; `recorded` when it also entered the record queue
    Published { recorded: bool },
    /// Processing failed and the last good frame was published in its place
    Substituted { recorded: bool },
    /// The device delivered nothing; nothing was published
    Dropped,
}

/// Running totals of the capture loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub iterations: u64,
    pub published: u64,
    pub recorded: u64,
    pub substituted: u64,
    pub dropped: u64,
}

/// Acquires frames from `S` and feeds the shared exchange
pub struct CaptureLoop<S: CameraSource> {
    source: S,
    exchange: FrameExchange,
    color_mode: ColorMode,
    estimator: RollingRateEstimator,
    fallback: LastGoodFrame,
    painter: OverlayPainter,
    processor: Option<Box<dyn FrameProcessor>>,
    stats: CaptureStats,
}

impl<S: CameraSource> CaptureLoop<S> {
    /// `width` and `height` size the initial fallback frame
    pub fn new(source: S, exchange: FrameExchange, width: u32, height: u32, color_mode: ColorMode) -> Self {
        Self {
            source,
            exchange,
            color_mode,
            estimator: RollingRateEstimator::new(),
            fallback: LastGoodFrame::new(width, height, color_mode),
            painter: OverlayPainter::default(),
            processor: None,
            stats: CaptureStats::default(),
        }
    }

    pub fn with_painter(mut self, painter: OverlayPainter) -> Self {
        self.painter = painter;
        self
    }

    pub fn with_processor(mut self, processor: Box<dyn FrameProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn current_rate(&self) -> f64 {
        self.estimator.current_rate()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Give back the source, painter and processor for a later run
    pub fn into_parts(self) -> (S, OverlayPainter, Option<Box<dyn FrameProcessor>>) {
        (self.source, self.painter, self.processor)
    }

    /// Run until the exchange's capturing flag is cleared
    ///
    /// The flag is checked before every acquisition; a read in progress is
    /// never interrupted.
    pub fn run(&mut self) -> CaptureStats {
        log::info!("Capture loop started ({})", self.color_mode.as_str());
        while self.exchange.is_capturing() {
            self.step();
        }
        log::info!(
            "Capture loop stopped after {} iterations ({} dropped, {} substituted)",
            self.stats.iterations,
            self.stats.dropped,
            self.stats.substituted
        );
        self.stats
    }

    /// Acquire, process and hand off a single frame
    pub fn step(&mut self) -> StepOutcome {
        let read = self.source.read();
        let arrived = Instant::now();
        let timestamp = Local::now();
        self.stats.iterations += 1;

        self.estimator.record(arrived);
        let rate = self.estimator.current_rate();

        let raw = match read {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Couldn't grab frame from camera: {}", e);
                self.stats.dropped += 1;
                return StepOutcome::Dropped;
            }
        };

        let (mut frame, substituted) = match self.post_process(&raw) {
            Ok(frame) => {
                self.fallback.update(&frame);
                (frame, false)
            }
            Err(e) => {
                log::debug!("Substituting last good frame: {}", e);
                (self.fallback.get().clone(), true)
            }
        };

        self.painter.paint(&mut frame, &format_overlay_timestamp(&timestamp));

        let recorded = self.exchange.publish(frame, timestamp, rate);
        self.stats.published += 1;
        if recorded {
            self.stats.recorded += 1;
        }

        if substituted {
            self.stats.substituted += 1;
            StepOutcome::Substituted { recorded }
        } else {
            StepOutcome::Published { recorded }
        }
    }

    fn post_process(&mut self, raw: &crate::types::RawFrame) -> Result<Frame, CameraError> {
        let frame = convert(raw, self.color_mode)?;
        match self.processor.as_mut() {
            Some(processor) => processor.process(frame),
            None => Ok(frame),
        }
    }
}
