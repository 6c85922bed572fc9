//! Recorder collaborators for camflow
//!
//! A session opens one [`Recorder`] through a [`RecorderFactory`] and feeds
//! it from the recorder worker thread. Two backends ship with the crate:
//! - [`RawRecorder`]: raw pixel frames plus a timestamp sidecar, always
//!   available
//! - `Mp4Recorder` (feature `recording`): openh264 for H.264 encoding and
//!   muxide for MP4 muxing, plus the same sidecar
//!
//! # Example
//! ```rust,ignore
//! use camflow::recording::{RawRecorderFactory, RecorderFactory, RecorderRequest};
//!
//! let factory = RawRecorderFactory;
//! let recorder = factory.open(&request)?;
//! recorder.write(&frame, "19000.1234567890\n")?;
//! recorder.close()?;
//! ```

mod output;
mod raw;
mod sidecar;

#[cfg(feature = "recording")]
mod encoder;
#[cfg(feature = "recording")]
mod mp4;

pub use raw::{RawRecorder, RawRecorderFactory};
pub use sidecar::TimestampSidecar;

#[cfg(feature = "recording")]
pub use encoder::{EncodedFrame, H264Encoder};
#[cfg(feature = "recording")]
pub use mp4::{Mp4Recorder, Mp4RecorderFactory};

use crate::errors::CameraError;
use crate::types::{ColorMode, Frame, Resolution};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a backend needs to open one output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderRequest {
    /// Identifier of the camera that owns the recording
    pub owner: String,
    pub save_dir: PathBuf,
    pub name: String,
    pub file_index: u32,
    pub resolution: Resolution,
    /// Frames per second written into the container
    pub rate: f64,
    pub color_mode: ColorMode,
}

impl RecorderRequest {
    /// `<save_dir>/<name>_<file_index:03>.<extension>`
    pub fn output_path(&self, extension: &str) -> PathBuf {
        output_path(&self.save_dir, &self.name, self.file_index, extension)
    }
}

pub fn output_path(save_dir: &Path, name: &str, file_index: u32, extension: &str) -> PathBuf {
    save_dir.join(format!("{}_{:03}.{}", name, file_index, extension))
}

/// Sink for recorded frames
///
/// A session shares its recorder between the recorder worker, which calls
/// `write`, and the session controller, which closes it. `close` may run
/// while a write is in flight on another thread and must not wait for it:
/// after `close` returns no new write is accepted, and a write already in
/// flight finishes the output itself when it returns.
pub trait Recorder: Send + Sync {
    /// Persist one frame with its formatted timestamp
    fn write(&self, frame: &Frame, timestamp: &str) -> Result<(), CameraError>;

    /// Frames successfully written so far
    fn write_count(&self) -> u64;

    /// Stop accepting frames, then flush and release the output
    fn close(&self) -> Result<(), CameraError>;
}

/// Opens recorders for new sessions
pub trait RecorderFactory: Send {
    fn open(&self, request: &RecorderRequest) -> Result<Box<dyn Recorder>, CameraError>;
}

/// Available built-in recorder backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingBackend {
    Raw,
    Mp4,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        RecordingBackend::Raw
    }
}

impl RecordingBackend {
    /// Factory for this backend, failing if it was not compiled in
    pub fn factory(&self) -> Result<Box<dyn RecorderFactory>, CameraError> {
        match self {
            RecordingBackend::Raw => Ok(Box::new(RawRecorderFactory)),
            #[cfg(feature = "recording")]
            RecordingBackend::Mp4 => Ok(Box::new(Mp4RecorderFactory::default())),
            #[cfg(not(feature = "recording"))]
            RecordingBackend::Mp4 => Err(CameraError::ConfigError(
                "mp4 backend requires the `recording` feature".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_naming() {
        let path = output_path(Path::new("/data"), "cam0", 7, "raw");
        assert_eq!(path, PathBuf::from("/data/cam0_007.raw"));
    }

    #[test]
    fn test_raw_backend_always_available() {
        assert!(RecordingBackend::Raw.factory().is_ok());
    }

    #[cfg(not(feature = "recording"))]
    #[test]
    fn test_mp4_backend_needs_feature() {
        assert!(matches!(
            RecordingBackend::Mp4.factory(),
            Err(CameraError::ConfigError(_))
        ));
    }
}
