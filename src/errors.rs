use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Camera is not opened: {0}")]
    NotOpened(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Color conversion error: {0}")]
    ConversionError(String),
    #[error("Recorder error: {0}")]
    RecorderError(String),
    #[error("Session error: {0}")]
    SessionError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[cfg(feature = "recording")]
    #[error("Encoding error: {0}")]
    EncodingError(String),
    #[cfg(feature = "recording")]
    #[error("Muxing error: {0}")]
    MuxingError(String),
}

impl From<std::io::Error> for CameraError {
    fn from(e: std::io::Error) -> Self {
        CameraError::IoError(e.to_string())
    }
}
