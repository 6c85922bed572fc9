//! MP4 recorder combining the H.264 encoder, muxide and a timestamp sidecar

use super::encoder::H264Encoder;
use super::output::SharedOutput;
use super::sidecar::TimestampSidecar;
use super::{Recorder, RecorderFactory, RecorderRequest};
use crate::errors::CameraError;
use crate::types::Frame;
use muxide::api::{Metadata, MuxerBuilder, VideoCodec};
use std::fs::{self, File};
use std::io::BufWriter;
use std::sync::atomic::{AtomicU64, Ordering};

struct Mp4Output {
    encoder: H264Encoder,
    muxer: muxide::api::Muxer<BufWriter<File>>,
    sidecar: TimestampSidecar,
    frame_duration_secs: f64,
    muxed: u64,
}

impl Mp4Output {
    /// Returns false when the encoder produced no data for the frame
    fn append(&mut self, frame: &Frame, timestamp: &str) -> Result<bool, CameraError> {
        let encoded = self.encoder.encode_frame(frame)?;
        if encoded.data.is_empty() {
            return Ok(false);
        }

        let pts = self.muxed as f64 * self.frame_duration_secs;
        self.muxer
            .write_video(pts, &encoded.data, encoded.is_keyframe)
            .map_err(|e| CameraError::MuxingError(format!("Failed to write frame: {}", e)))?;
        self.sidecar.append(timestamp)?;
        self.muxed += 1;
        Ok(true)
    }

    fn finish(self) -> Result<(), CameraError> {
        let Mp4Output {
            muxer, mut sidecar, ..
        } = self;
        let stats = muxer
            .finish_with_stats()
            .map_err(|e| CameraError::MuxingError(format!("Failed to finalize recording: {}", e)))?;
        log::info!(
            "MP4 finalized: {} frames, {} bytes",
            stats.video_frames,
            stats.bytes_written
        );
        sidecar.close()
    }
}

/// Encodes frames to H.264 and muxes them into `<name>_<index>.mp4`
pub struct Mp4Recorder {
    output: SharedOutput<Mp4Output>,
    frame_count: AtomicU64,
    skipped: AtomicU64,
}

impl Mp4Recorder {
    pub fn new(request: &RecorderRequest) -> Result<Self, CameraError> {
        fs::create_dir_all(&request.save_dir).map_err(|e| {
            CameraError::IoError(format!("Failed to create output directory: {}", e))
        })?;

        let output_path = request.output_path("mp4");
        let file = File::create(&output_path)
            .map_err(|e| CameraError::IoError(format!("Failed to create output file: {}", e)))?;
        let writer = BufWriter::new(file);

        let (width, height) = (request.resolution.width, request.resolution.height);
        let encoder = H264Encoder::new(width, height)?;

        let fps = if request.rate > 0.0 { request.rate } else { 30.0 };
        let metadata = Metadata::new().with_title(&request.name).with_current_time();
        let muxer = MuxerBuilder::new(writer)
            .video(VideoCodec::H264, width, height, fps)
            .with_fast_start(true)
            .with_metadata(metadata)
            .build()
            .map_err(|e| CameraError::MuxingError(format!("Failed to create muxer: {}", e)))?;

        let sidecar = TimestampSidecar::create(request.output_path("dat"))?;
        log::info!("MP4 recording to {:?} ({} @ {:.2} fps)", output_path, request.resolution, fps);

        Ok(Self {
            output: SharedOutput::new(
                Mp4Output {
                    encoder,
                    muxer,
                    sidecar,
                    frame_duration_secs: 1.0 / fps,
                    muxed: 0,
                },
                Mp4Output::finish,
            ),
            frame_count: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        })
    }

    /// Frames the encoder produced no data for
    pub fn skipped_frames(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }
}

impl Recorder for Mp4Recorder {
    fn write(&self, frame: &Frame, timestamp: &str) -> Result<(), CameraError> {
        if self.output.write(|out| out.append(frame, timestamp))? {
            self.frame_count.fetch_add(1, Ordering::SeqCst);
        } else {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Frames handled, including those the encoder skipped
    fn write_count(&self) -> u64 {
        self.frame_count.load(Ordering::SeqCst) + self.skipped_frames()
    }

    fn close(&self) -> Result<(), CameraError> {
        self.output.close()
    }
}

/// Opens an [`Mp4Recorder`] per session
#[derive(Debug, Clone, Copy, Default)]
pub struct Mp4RecorderFactory;

impl RecorderFactory for Mp4RecorderFactory {
    fn open(&self, request: &RecorderRequest) -> Result<Box<dyn Recorder>, CameraError> {
        Ok(Box::new(Mp4Recorder::new(request)?))
    }
}
