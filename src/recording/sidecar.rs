//! Per-frame timestamp file written next to every recording

use crate::errors::CameraError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends one formatted timestamp per recorded frame
///
/// Timestamps arrive already newline terminated and are written verbatim.
pub struct TimestampSidecar {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
}

impl TimestampSidecar {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .map_err(|e| CameraError::IoError(format!("Failed to create timestamp file: {}", e)))?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path,
        })
    }

    /// Buffer one line; a failed append buffers none of it
    pub fn append(&mut self, timestamp: &str) -> Result<(), CameraError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CameraError::RecorderError("timestamp file already closed".to_string()))?;
        writer.write_all(timestamp.as_bytes())?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), CameraError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
