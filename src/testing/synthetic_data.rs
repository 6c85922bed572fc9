//! Synthetic camera source for offline testing and demos
//!
//! Produces BGR gradient frames that change every frame, in the layout
//! typical capture drivers deliver. A read plan scripts hard failures and
//! corrupt buffers at chosen iterations.

use crate::errors::CameraError;
use crate::platform::{CameraInitParams, CameraSource};
use crate::types::{DeviceProperties, PixelFormat, RawFrame, Resolution};
use std::collections::VecDeque;
use std::time::Duration;

/// Create a synthetic BGR frame whose content varies with `frame_number`
pub fn synthetic_video_frame(frame_number: u64, width: u32, height: u32) -> RawFrame {
    let mut data = vec![0u8; (width * height * 3) as usize];

    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add(((x + y) % 256) as u8); // B
            data[idx + 1] = base.wrapping_add((y % 256) as u8); // G
            data[idx + 2] = base.wrapping_add((x % 256) as u8); // R
        }
    }

    RawFrame::new(data, width, height, PixelFormat::Bgr8)
}

/// Scripted result of one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// A well-formed frame
    Frame,
    /// No frame at all
    Fail,
    /// A frame whose buffer is too short to convert
    Corrupt,
}

/// Camera source that fabricates frames
///
/// Once the read plan is used up every read yields a good frame.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    resolution: Resolution,
    rate: u32,
    open: bool,
    frame_number: u64,
    plan: VecDeque<ReadPlan>,
    pace: Option<Duration>,
}

impl SyntheticCamera {
    /// A closed camera; `open` decides its geometry
    pub fn new() -> Self {
        Self {
            resolution: Resolution::new(0, 0),
            rate: 0,
            open: false,
            frame_number: 0,
            plan: VecDeque::new(),
            pace: None,
        }
    }

    /// An already opened camera at 30 fps
    pub fn opened(width: u32, height: u32) -> Self {
        Self {
            resolution: Resolution::new(width, height),
            rate: 30,
            open: true,
            ..Self::new()
        }
    }

    pub fn with_plan(mut self, plan: impl IntoIterator<Item = ReadPlan>) -> Self {
        self.plan = plan.into_iter().collect();
        self
    }

    /// Sleep this long in every read, like a device delivering at a fixed cadence
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn frames_served(&self) -> u64 {
        self.frame_number
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSource for SyntheticCamera {
    fn open(&mut self, params: &CameraInitParams) -> Result<(), CameraError> {
        if params.width == 0 || params.height == 0 {
            return Err(CameraError::InitializationError(format!(
                "Invalid resolution {}x{}",
                params.width, params.height
            )));
        }
        self.resolution = Resolution::new(params.width, params.height);
        self.rate = params.target_rate;
        if self.pace.is_none() && params.target_rate > 0 {
            self.pace = Some(Duration::from_secs_f64(1.0 / params.target_rate as f64));
        }
        self.open = true;
        Ok(())
    }

    fn read(&mut self) -> Result<RawFrame, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpened("synthetic camera".to_string()));
        }
        if let Some(pace) = self.pace {
            std::thread::sleep(pace);
        }

        let step = self.plan.pop_front().unwrap_or(ReadPlan::Frame);
        let Resolution { width, height } = self.resolution;
        match step {
            ReadPlan::Frame => {
                let frame = synthetic_video_frame(self.frame_number, width, height);
                self.frame_number += 1;
                Ok(frame)
            }
            ReadPlan::Fail => Err(CameraError::CaptureError("synthetic read failure".to_string())),
            ReadPlan::Corrupt => {
                let mut frame = synthetic_video_frame(self.frame_number, width, height);
                frame.data.truncate(frame.data.len() / 2);
                self.frame_number += 1;
                Ok(frame)
            }
        }
    }

    fn resolution(&self) -> Result<Resolution, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpened("resolution".to_string()));
        }
        Ok(self.resolution)
    }

    fn rate(&self) -> Result<u32, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpened("rate".to_string()));
        }
        Ok(self.rate)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn properties(&self) -> Option<DeviceProperties> {
        if !self.open {
            return None;
        }
        let mut props = DeviceProperties::new();
        props.insert("frame_width".to_string(), self.resolution.width as f64);
        props.insert("frame_height".to_string(), self.resolution.height as f64);
        props.insert("fps".to_string(), self.rate as f64);
        Some(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frame_varies() {
        let a = synthetic_video_frame(0, 8, 8);
        let b = synthetic_video_frame(1, 8, 8);
        assert_eq!(a.data.len(), 8 * 8 * 3);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_closed_camera_preconditions() {
        let cam = SyntheticCamera::new();
        assert!(matches!(cam.resolution(), Err(CameraError::NotOpened(_))));
        assert!(matches!(cam.rate(), Err(CameraError::NotOpened(_))));
        assert!(cam.properties().is_none());
    }

    #[test]
    fn test_plan_then_good_frames() {
        let mut cam = SyntheticCamera::opened(4, 4).with_plan([ReadPlan::Fail, ReadPlan::Corrupt]);
        assert!(cam.read().is_err());
        let corrupt = cam.read().unwrap();
        assert!(corrupt.data.len() < corrupt.expected_len());
        let good = cam.read().unwrap();
        assert_eq!(good.data.len(), good.expected_len());
    }

    #[test]
    fn test_open_sets_geometry() {
        let mut cam = SyntheticCamera::new().with_pace(Duration::ZERO);
        cam.open(&CameraInitParams {
            device_id: "synthetic".to_string(),
            target_rate: 25,
            width: 16,
            height: 10,
        })
        .unwrap();
        assert_eq!(cam.resolution().unwrap(), Resolution::new(16, 10));
        assert_eq!(cam.rate().unwrap(), 25);
        assert_eq!(cam.properties().unwrap()["fps"], 25.0);
    }
}
