//! camflow: camera frame acquisition with a display mailbox and a lossless recording queue
//!
//! A capture loop reads frames from a camera source at the device cadence,
//! converts and annotates them, and hands every frame to two consumers:
//! a single-slot, latest-wins display mailbox and, while a recording session
//! is active, an ordered queue drained by a recorder worker thread. Stopping
//! a session drains the queue and verifies that every frame was written.
//!
//! # Features
//! - `recording`: H.264/MP4 recorder (openh264 + muxide)
//! - `device`: physical cameras through nokhwa
//!
//! # Usage
//! ```rust,no_run
//! use camflow::testing::SyntheticCamera;
//! use camflow::{Camera, CamflowConfig};
//!
//! fn main() -> Result<(), camflow::CameraError> {
//!     let mut camera = Camera::new(CamflowConfig::default(), Box::new(SyntheticCamera::new()))?;
//!     camera.open()?;
//!     camera.start_capture()?;
//!     let request = camera.session_request(0);
//!     camera.start_saving(&request)?;
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     if let Some(report) = camera.stop_saving() {
//!         println!("{} of {} frames written", report.written, report.expected);
//!     }
//!     camera.close();
//!     Ok(())
//! }
//! ```

pub mod camera;
pub mod config;
pub mod errors;
pub mod overlay;
pub mod pipeline;
pub mod platform;
pub mod recording;
pub mod timing;
pub mod types;

// Testing utilities - synthetic camera and scripted recorders
pub mod testing;

// Re-exports for convenience
pub use camera::Camera;
pub use config::CamflowConfig;
pub use errors::CameraError;
pub use pipeline::{
    DrainOutcome, DrainReport, EventCallbacks, FrameExchange, SessionController, SessionRequest,
    SessionState,
};
pub use platform::{CameraInitParams, CameraSource};
pub use recording::{Recorder, RecorderFactory, RecordingBackend};
pub use timing::RollingRateEstimator;
pub use types::{ColorMode, Frame, Resolution};

#[cfg(feature = "device")]
pub use platform::DeviceCamera;

/// Initialize logging for the crate
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camflow=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        features: enabled_features(),
    }
}

fn enabled_features() -> Vec<String> {
    let mut features = Vec::new();
    if cfg!(feature = "recording") {
        features.push("recording".to_string());
    }
    if cfg!(feature = "device") {
        features.push("device".to_string());
    }
    features
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub features: Vec<String>,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "camflow");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_is_repeatable() {
        init_logging();
        init_logging();
    }
}
