//! Uncompressed recorder: concatenated pixel buffers plus timestamp sidecar

use super::output::SharedOutput;
use super::sidecar::TimestampSidecar;
use super::{Recorder, RecorderFactory, RecorderRequest};
use crate::errors::CameraError;
use crate::types::{ColorMode, Frame, Resolution};
use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

struct RawOutput {
    file: File,
    /// Bytes of complete frames in `file`
    len: u64,
    sidecar: TimestampSidecar,
}

impl RawOutput {
    /// Append a frame and its timestamp line, or neither
    fn append(&mut self, bytes: &[u8], timestamp: &str) -> Result<(), CameraError> {
        if let Err(e) = self.file.write_all(bytes) {
            self.truncate_to_frames();
            return Err(e.into());
        }
        if let Err(e) = self.sidecar.append(timestamp) {
            self.truncate_to_frames();
            return Err(e);
        }
        self.len += bytes.len() as u64;
        Ok(())
    }

    fn truncate_to_frames(&mut self) {
        let len = self.len;
        let result = self
            .file
            .set_len(len)
            .and_then(|_| self.file.seek(SeekFrom::Start(len)));
        if let Err(e) = result {
            log::error!("Failed to drop partial frame from raw file: {}", e);
        }
    }

    fn finish(mut self) -> Result<(), CameraError> {
        self.file.flush()?;
        self.sidecar.close()
    }
}

/// Writes each frame's bytes back to back into `<name>_<index>.raw`
///
/// Geometry and color mode are fixed when the recorder is opened; frames
/// that do not match are rejected and not counted. The `.raw` file and its
/// `.dat` sidecar always hold the same number of frames.
pub struct RawRecorder {
    output: SharedOutput<RawOutput>,
    resolution: Resolution,
    color_mode: ColorMode,
    output_path: PathBuf,
    frame_count: AtomicU64,
}

impl RawRecorder {
    pub fn new(request: &RecorderRequest) -> Result<Self, CameraError> {
        fs::create_dir_all(&request.save_dir).map_err(|e| {
            CameraError::IoError(format!("Failed to create output directory: {}", e))
        })?;

        let output_path = request.output_path("raw");
        let file = File::create(&output_path)
            .map_err(|e| CameraError::IoError(format!("Failed to create output file: {}", e)))?;
        let sidecar = TimestampSidecar::create(request.output_path("dat"))?;

        log::info!(
            "Raw recording to {:?} ({} {} @ {:.2} fps)",
            output_path,
            request.resolution,
            request.color_mode.as_str(),
            request.rate
        );

        Ok(Self {
            output: SharedOutput::new(
                RawOutput {
                    file,
                    len: 0,
                    sidecar,
                },
                RawOutput::finish,
            ),
            resolution: request.resolution,
            color_mode: request.color_mode,
            output_path,
            frame_count: AtomicU64::new(0),
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Recorder for RawRecorder {
    fn write(&self, frame: &Frame, timestamp: &str) -> Result<(), CameraError> {
        if frame.resolution() != self.resolution || frame.color_mode() != self.color_mode {
            return Err(CameraError::RecorderError(format!(
                "Frame {} {} doesn't match recording {} {}",
                frame.resolution(),
                frame.color_mode().as_str(),
                self.resolution,
                self.color_mode.as_str()
            )));
        }

        self.output
            .write(|out| out.append(frame.as_bytes(), timestamp))?;
        self.frame_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write_count(&self) -> u64 {
        self.frame_count.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<(), CameraError> {
        self.output.close()
    }
}

/// Opens a [`RawRecorder`] per session
#[derive(Debug, Clone, Copy, Default)]
pub struct RawRecorderFactory;

impl RecorderFactory for RawRecorderFactory {
    fn open(&self, request: &RecorderRequest) -> Result<Box<dyn Recorder>, CameraError> {
        Ok(Box::new(RawRecorder::new(request)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(dir: &Path, mode: ColorMode) -> RecorderRequest {
        RecorderRequest {
            owner: "test".to_string(),
            save_dir: dir.join("out"),
            name: "cam".to_string(),
            file_index: 1,
            resolution: Resolution::new(4, 2),
            rate: 30.0,
            color_mode: mode,
        }
    }

    #[test]
    fn test_raw_recording_workflow() {
        let dir = tempdir().unwrap();
        let req = request(dir.path(), ColorMode::Grayscale);
        let recorder = RawRecorder::new(&req).expect("Failed to create recorder");

        for i in 0..3 {
            let frame = Frame::blank(4, 2, ColorMode::Grayscale);
            recorder
                .write(&frame, &format!("{}.0000000000\n", i))
                .expect("Failed to write frame");
        }
        assert_eq!(recorder.write_count(), 3);
        recorder.close().unwrap();

        let raw = fs::read(req.output_path("raw")).unwrap();
        assert_eq!(raw.len(), 3 * 4 * 2);
        let stamps = fs::read_to_string(req.output_path("dat")).unwrap();
        assert_eq!(stamps.lines().count(), 3);
    }

    #[test]
    fn test_mismatched_frame_rejected() {
        let dir = tempdir().unwrap();
        let recorder = RawRecorder::new(&request(dir.path(), ColorMode::Color)).unwrap();
        let frame = Frame::blank(4, 2, ColorMode::Grayscale);
        assert!(recorder.write(&frame, "0\n").is_err());
        assert_eq!(recorder.write_count(), 0);
    }

    #[test]
    fn test_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let recorder = RawRecorder::new(&request(dir.path(), ColorMode::Color)).unwrap();
        recorder.close().unwrap();
        let frame = Frame::blank(4, 2, ColorMode::Color);
        assert!(recorder.write(&frame, "0\n").is_err());
    }

    #[test]
    fn test_failed_timestamp_keeps_files_in_step() {
        let dir = tempdir().unwrap();
        let req = request(dir.path(), ColorMode::Color);
        let recorder = RawRecorder::new(&req).unwrap();
        let frame = Frame::blank(4, 2, ColorMode::Color);
        recorder.write(&frame, "0.0000000000\n").unwrap();

        // Sidecar refuses further lines
        recorder.output.write(|out| out.sidecar.close()).unwrap();
        assert!(recorder.write(&frame, "1.0000000000\n").is_err());
        assert_eq!(recorder.write_count(), 1);
        recorder.close().unwrap();

        let raw = fs::read(req.output_path("raw")).unwrap();
        assert_eq!(raw.len(), 4 * 2 * 3);
        let stamps = fs::read_to_string(req.output_path("dat")).unwrap();
        assert_eq!(stamps, "0.0000000000\n");
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let recorder = RawRecorder::new(&request(dir.path(), ColorMode::Color)).unwrap();
        recorder.close().unwrap();
        recorder.close().unwrap();
    }
}
