use super::{CameraInitParams, CameraSource};
use crate::errors::CameraError;
use crate::types::{DeviceProperties, PixelFormat, RawFrame, Resolution};
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    CallbackCamera,
};

/// Physical camera backed by the platform's native capture API
#[derive(Default)]
pub struct DeviceCamera {
    camera: Option<CallbackCamera>,
    device_id: String,
}

impl DeviceCamera {
    pub fn new() -> Self {
        Self::default()
    }

    fn camera(&self) -> Result<&CallbackCamera, CameraError> {
        self.camera
            .as_ref()
            .ok_or_else(|| CameraError::NotOpened("device camera".to_string()))
    }
}

impl CameraSource for DeviceCamera {
    fn open(&mut self, params: &CameraInitParams) -> Result<(), CameraError> {
        let device_index = params
            .device_id
            .parse::<u32>()
            .map_err(|_| CameraError::InitializationError("Invalid device ID".to_string()))?;

        let wanted = CameraFormat::new(
            nokhwa::utils::Resolution::new(params.width, params.height),
            FrameFormat::MJPEG,
            params.target_rate,
        );
        let requested_format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));

        let mut camera = CallbackCamera::new(CameraIndex::Index(device_index), requested_format, |_| {})
            .map_err(|e| CameraError::InitializationError(format!("Failed to initialize camera: {}", e)))?;

        camera
            .open_stream()
            .map_err(|e| CameraError::InitializationError(format!("Failed to start stream: {}", e)))?;

        log::info!("Opened camera device {}", params.device_id);
        self.device_id = params.device_id.clone();
        self.camera = Some(camera);
        Ok(())
    }

    fn read(&mut self) -> Result<RawFrame, CameraError> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| CameraError::NotOpened("device camera".to_string()))?;

        let buffer = camera
            .poll_frame()
            .map_err(|e| CameraError::CaptureError(format!("Failed to capture frame: {}", e)))?;

        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureError(format!("Failed to decode frame: {}", e)))?;
        let (width, height) = (decoded.width(), decoded.height());

        Ok(RawFrame::new(decoded.into_raw(), width, height, PixelFormat::Rgb8))
    }

    fn resolution(&self) -> Result<Resolution, CameraError> {
        let res = self
            .camera()?
            .resolution()
            .map_err(|e| CameraError::CaptureError(format!("Failed to query resolution: {}", e)))?;
        Ok(Resolution::new(res.width_x, res.height_y))
    }

    fn rate(&self) -> Result<u32, CameraError> {
        self.camera()?
            .frame_rate()
            .map_err(|e| CameraError::CaptureError(format!("Failed to query frame rate: {}", e)))
    }

    fn is_open(&self) -> bool {
        self.camera.as_ref().map(|c| c.is_stream_open()).unwrap_or(false)
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop stream on device {}: {}", self.device_id, e);
            }
        }
    }

    fn properties(&self) -> Option<DeviceProperties> {
        let resolution = self.resolution().ok()?;
        let rate = self.rate().ok()?;
        let mut props = DeviceProperties::new();
        props.insert("frame_width".to_string(), resolution.width as f64);
        props.insert("frame_height".to_string(), resolution.height as f64);
        props.insert("fps".to_string(), rate as f64);
        Some(props)
    }
}

impl Drop for DeviceCamera {
    fn drop(&mut self) {
        self.close();
    }
}

// The capture loop is the only user of the camera once it is handed over
unsafe impl Send for DeviceCamera {}
