//! Raw camera buffers to display/record frames

use crate::errors::CameraError;
use crate::types::{ColorMode, Frame, PixelFormat, RawFrame};
use image::{imageops, DynamicImage, GrayImage, RgbImage};

/// Convert a raw frame into the requested color mode
pub fn convert(raw: &RawFrame, mode: ColorMode) -> Result<Frame, CameraError> {
    if raw.width == 0 || raw.height == 0 {
        return Err(CameraError::ConversionError(format!(
            "empty frame geometry {}x{}",
            raw.width, raw.height
        )));
    }
    if raw.data.len() != raw.expected_len() {
        return Err(CameraError::ConversionError(format!(
            "buffer holds {} bytes, {}x{} {:?} needs {}",
            raw.data.len(),
            raw.width,
            raw.height,
            raw.format,
            raw.expected_len()
        )));
    }

    match raw.format {
        PixelFormat::Gray8 => {
            let gray = gray_image(raw.data.clone(), raw.width, raw.height)?;
            Ok(match mode {
                ColorMode::Grayscale => Frame::from_gray(gray),
                ColorMode::Color => Frame::from_rgb(DynamicImage::ImageLuma8(gray).to_rgb8()),
            })
        }
        PixelFormat::Rgb8 | PixelFormat::Bgr8 => {
            let mut data = raw.data.clone();
            if raw.format == PixelFormat::Bgr8 {
                for px in data.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
            }
            let rgb = rgb_image(data, raw.width, raw.height)?;
            Ok(match mode {
                ColorMode::Color => Frame::from_rgb(rgb),
                ColorMode::Grayscale => Frame::from_gray(imageops::grayscale(&rgb)),
            })
        }
    }
}

fn rgb_image(data: Vec<u8>, width: u32, height: u32) -> Result<RgbImage, CameraError> {
    RgbImage::from_raw(width, height, data)
        .ok_or_else(|| CameraError::ConversionError("RGB buffer size mismatch".to_string()))
}

fn gray_image(data: Vec<u8>, width: u32, height: u32) -> Result<GrayImage, CameraError> {
    GrayImage::from_raw(width, height, data)
        .ok_or_else(|| CameraError::ConversionError("gray buffer size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgr_to_rgb_swaps_channels() {
        let raw = RawFrame::new(vec![10, 20, 30, 40, 50, 60], 2, 1, PixelFormat::Bgr8);
        let frame = convert(&raw, ColorMode::Color).unwrap();
        assert_eq!(frame.as_bytes(), &[30, 20, 10, 60, 50, 40]);
    }

    #[test]
    fn test_rgb_to_grayscale() {
        let raw = RawFrame::new(vec![255; 4 * 3 * 3], 4, 3, PixelFormat::Rgb8);
        let frame = convert(&raw, ColorMode::Grayscale).unwrap();
        assert_eq!(frame.color_mode(), ColorMode::Grayscale);
        assert_eq!(frame.as_bytes().len(), 12);
        assert!(frame.as_bytes().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_gray_source_to_color() {
        let raw = RawFrame::new(vec![9; 6], 3, 2, PixelFormat::Gray8);
        let frame = convert(&raw, ColorMode::Color).unwrap();
        assert_eq!(frame.as_bytes(), &[9; 18][..]);
    }

    #[test]
    fn test_truncated_buffer_is_rejected() {
        let raw = RawFrame::new(vec![0; 10], 4, 4, PixelFormat::Bgr8);
        assert!(matches!(
            convert(&raw, ColorMode::Color),
            Err(CameraError::ConversionError(_))
        ));
    }

    #[test]
    fn test_zero_geometry_is_rejected() {
        let raw = RawFrame::new(vec![], 0, 4, PixelFormat::Rgb8);
        assert!(convert(&raw, ColorMode::Grayscale).is_err());
    }
}
