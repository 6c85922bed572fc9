//! Burned-in frame annotations
//!
//! Every frame carries its capture time in the top-left corner. When an
//! auxiliary metric source is attached and enabled, its readout is drawn
//! near the top-right corner.

pub mod font;

use crate::types::Frame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Anchor of the timestamp text, as fractions of width and height
pub const TIMESTAMP_ANCHOR: (f64, f64) = (0.05, 0.05);
/// Anchor of the auxiliary readout, as fractions of width and height
pub const AUXILIARY_ANCHOR: (f64, f64) = (0.85, 0.05);
/// Overlay text color
pub const OVERLAY_COLOR: [u8; 3] = [255, 0, 0];

/// Synchronous provider of the secondary overlay text
pub trait AuxiliarySource: Send {
    /// Text to burn in for the current frame
    fn overlay_text(&self) -> String;
}

/// Shared speed readout, rendered as `"<value> m/s"`
///
/// Clones share one value; the writer side calls [`SpeedMetric::set`]
/// from any thread.
#[derive(Debug, Clone, Default)]
pub struct SpeedMetric {
    bits: Arc<AtomicU64>,
}

impl SpeedMetric {
    pub fn new(initial: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(initial.to_bits())),
        }
    }

    pub fn set(&self, meters_per_second: f64) {
        self.bits.store(meters_per_second.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

impl AuxiliarySource for SpeedMetric {
    fn overlay_text(&self) -> String {
        format!("{} m/s", format_reading(self.get()))
    }
}

/// Shortest round-trip digits, always with a fractional part
///
/// Magnitudes below 1e-4 or from 1e16 up switch to scientific notation
/// with a signed, at least two-digit exponent (`1e-07`, `1.5e+16`).
pub fn format_reading(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let text = value.to_string();
        return if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        };
    }

    let text = format!("{:e}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => text,
    }
}

/// Pixel position of an anchor on a frame of the given size
pub fn anchor_position(width: u32, height: u32, anchor: (f64, f64)) -> (u32, u32) {
    (
        (anchor.0 * width as f64) as u32,
        (anchor.1 * height as f64) as u32,
    )
}

/// Draws the timestamp and optional auxiliary readout onto frames
pub struct OverlayPainter {
    timestamp: bool,
    scale: u32,
    auxiliary: Option<Box<dyn AuxiliarySource>>,
}

impl OverlayPainter {
    /// `scale` of 0 picks a scale from the frame height at draw time
    pub fn new(timestamp: bool, scale: u32) -> Self {
        Self {
            timestamp,
            scale,
            auxiliary: None,
        }
    }

    pub fn with_auxiliary(mut self, source: Box<dyn AuxiliarySource>) -> Self {
        self.auxiliary = Some(source);
        self
    }

    pub fn has_auxiliary(&self) -> bool {
        self.auxiliary.is_some()
    }

    fn scale_for(&self, height: u32) -> u32 {
        if self.scale > 0 {
            self.scale
        } else {
            (height / 240).max(1)
        }
    }

    pub fn paint(&self, frame: &mut Frame, timestamp_text: &str) {
        let (w, h) = (frame.width(), frame.height());
        let scale = self.scale_for(h);

        if self.timestamp {
            let (x, y) = anchor_position(w, h, TIMESTAMP_ANCHOR);
            font::draw_text(frame, timestamp_text, x, y, scale, OVERLAY_COLOR);
        }

        if let Some(source) = &self.auxiliary {
            let (x, y) = anchor_position(w, h, AUXILIARY_ANCHOR);
            font::draw_text(frame, &source.overlay_text(), x, y, scale, OVERLAY_COLOR);
        }
    }
}

impl Default for OverlayPainter {
    fn default() -> Self {
        Self::new(true, 0)
    }
}
