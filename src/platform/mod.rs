//! Camera source abstraction
//!
//! The capture loop reads frames through [`CameraSource`]; concrete
//! backends live alongside it. The `device` feature adds a backend for
//! physical cameras.

#[cfg(feature = "device")]
mod device;

#[cfg(feature = "device")]
pub use device::DeviceCamera;

use crate::errors::CameraError;
use crate::types::{DeviceProperties, RawFrame, Resolution};

/// Parameters used to open a camera source
#[derive(Debug, Clone)]
pub struct CameraInitParams {
    pub device_id: String,
    pub target_rate: u32,
    pub width: u32,
    pub height: u32,
}

/// A frame source the capture loop pulls from
///
/// `read` blocks until the device delivers a frame or fails. A failed read
/// is a per-frame event, never a reason to tear the source down.
pub trait CameraSource: Send {
    fn open(&mut self, params: &CameraInitParams) -> Result<(), CameraError>;

    fn read(&mut self) -> Result<RawFrame, CameraError>;

    /// Negotiated resolution; `NotOpened` before `open`
    fn resolution(&self) -> Result<Resolution, CameraError>;

    /// Negotiated frame rate; `NotOpened` before `open`
    fn rate(&self) -> Result<u32, CameraError>;

    fn is_open(&self) -> bool;

    fn close(&mut self);

    /// Backend-specific properties, `None` when the source is closed
    fn properties(&self) -> Option<DeviceProperties> {
        None
    }
}

impl<T: CameraSource + ?Sized> CameraSource for Box<T> {
    fn open(&mut self, params: &CameraInitParams) -> Result<(), CameraError> {
        (**self).open(params)
    }

    fn read(&mut self) -> Result<RawFrame, CameraError> {
        (**self).read()
    }

    fn resolution(&self) -> Result<Resolution, CameraError> {
        (**self).resolution()
    }

    fn rate(&self) -> Result<u32, CameraError> {
        (**self).rate()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn properties(&self) -> Option<DeviceProperties> {
        (**self).properties()
    }
}
