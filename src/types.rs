//! Frame and device types shared by the capture pipeline and its collaborators

use chrono::{DateTime, Local};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Color mode frames are converted to before display and recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Three channel RGB
    Color,
    /// Single channel luminance
    Grayscale,
}

impl ColorMode {
    pub fn channels(&self) -> u32 {
        match self {
            ColorMode::Color => 3,
            ColorMode::Grayscale => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Color => "color",
            ColorMode::Grayscale => "grayscale",
        }
    }
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Color
    }
}

/// Pixel layout of a raw frame as delivered by a camera source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Interleaved blue, green, red (the usual native layout of capture drivers)
    Bgr8,
    /// Interleaved red, green, blue
    Rgb8,
    /// Single channel luminance
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Unprocessed frame straight from the camera source
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RawFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Byte length a well-formed buffer of this geometry must have
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Pixel storage of a processed frame
#[derive(Debug, Clone, PartialEq)]
pub enum FramePixels {
    Rgb(RgbImage),
    Gray(GrayImage),
}

/// A frame after color conversion and overlay
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub pixels: FramePixels,
}

impl Frame {
    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            pixels: FramePixels::Rgb(image),
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self {
            pixels: FramePixels::Gray(image),
        }
    }

    /// All-black frame of the given geometry and color mode
    pub fn blank(width: u32, height: u32, mode: ColorMode) -> Self {
        match mode {
            ColorMode::Color => Self::from_rgb(RgbImage::new(width, height)),
            ColorMode::Grayscale => Self::from_gray(GrayImage::new(width, height)),
        }
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            FramePixels::Rgb(img) => img.width(),
            FramePixels::Gray(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            FramePixels::Rgb(img) => img.height(),
            FramePixels::Gray(img) => img.height(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    pub fn color_mode(&self) -> ColorMode {
        match &self.pixels {
            FramePixels::Rgb(_) => ColorMode::Color,
            FramePixels::Gray(_) => ColorMode::Grayscale,
        }
    }

    /// Raw interleaved pixel bytes in the frame's own color mode
    pub fn as_bytes(&self) -> &[u8] {
        match &self.pixels {
            FramePixels::Rgb(img) => img.as_raw(),
            FramePixels::Gray(img) => img.as_raw(),
        }
    }

    /// Interleaved RGB bytes; grayscale frames are expanded to three channels
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        match &self.pixels {
            FramePixels::Rgb(img) => img.as_raw().clone(),
            FramePixels::Gray(img) => img.as_raw().iter().flat_map(|&v| [v, v, v]).collect(),
        }
    }
}

/// Latest frame offered to the display consumer
#[derive(Debug, Clone)]
pub struct DisplaySample {
    pub frame: Frame,
    pub timestamp: DateTime<Local>,
    /// Instantaneous frame rate measured when the frame was captured
    pub rate: f64,
}

/// Frame waiting to be written by the recorder
#[derive(Debug, Clone)]
pub struct RecordEntry {
    pub frame: Frame,
    /// Fractional day number, ten decimals, newline terminated
    pub timestamp: String,
}

/// Snapshot of device properties, keyed by lowercase property name
pub type DeviceProperties = BTreeMap<String, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_geometry() {
        let frame = Frame::blank(64, 48, ColorMode::Color);
        assert_eq!(frame.resolution(), Resolution::new(64, 48));
        assert_eq!(frame.as_bytes().len(), 64 * 48 * 3);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));

        let gray = Frame::blank(64, 48, ColorMode::Grayscale);
        assert_eq!(gray.color_mode(), ColorMode::Grayscale);
        assert_eq!(gray.as_bytes().len(), 64 * 48);
    }

    #[test]
    fn test_gray_expands_to_rgb() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, image::Luma([7]));
        img.put_pixel(1, 0, image::Luma([200]));
        let frame = Frame::from_gray(img);
        assert_eq!(frame.to_rgb_bytes(), vec![7, 7, 7, 200, 200, 200]);
    }

    #[test]
    fn test_raw_expected_len() {
        let raw = RawFrame::new(vec![], 10, 4, PixelFormat::Bgr8);
        assert_eq!(raw.expected_len(), 120);
        let raw = RawFrame::new(vec![], 10, 4, PixelFormat::Gray8);
        assert_eq!(raw.expected_len(), 40);
    }

    #[test]
    fn test_color_mode_serde_names() {
        assert_eq!(serde_json::to_string(&ColorMode::Grayscale).unwrap(), "\"grayscale\"");
        let mode: ColorMode = serde_json::from_str("\"color\"").unwrap();
        assert_eq!(mode, ColorMode::Color);
    }
}
