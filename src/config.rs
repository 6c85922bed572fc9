//! Configuration management for camflow
//!
//! Camera geometry and color mode, recording destination and drain timing,
//! and overlay options, persisted as TOML.

use crate::errors::CameraError;
use crate::pipeline::DrainSettings;
use crate::recording::RecordingBackend;
use crate::types::ColorMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamflowConfig {
    pub camera: CameraConfig,
    pub recording: RecordingConfig,
    pub overlay: OverlayConfig,
}

/// Camera-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device identifier passed to the camera backend
    pub device_id: String,
    /// Requested frame width in pixels
    pub frame_width: u32,
    /// Requested frame height in pixels
    pub frame_height: u32,
    /// Requested frames per second, also the fallback recording rate
    pub target_rate: u32,
    /// Color mode frames are converted to
    pub color_mode: ColorMode,
}

/// Recording destination and drain timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Directory recordings are written into
    pub save_dir: String,
    /// Base file name of recordings
    pub name: String,
    /// Recorder backend
    pub backend: RecordingBackend,
    /// Longest wait between drain polls in milliseconds
    pub poll_interval_ms: u64,
    /// Consecutive polls without progress before a drain is abandoned
    pub stall_threshold: u32,
    /// Wait for the recorder worker after a drain, in milliseconds
    pub worker_join_timeout_ms: u64,
}

/// Burned-in overlay options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Draw the capture timestamp
    pub timestamp: bool,
    /// Draw the auxiliary metric readout when a source is attached
    pub auxiliary: bool,
    /// Glyph scale; 0 derives it from the frame height
    pub font_scale: u32,
}

impl Default for CamflowConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                device_id: "0".to_string(),
                frame_width: 640,
                frame_height: 480,
                target_rate: 30,
                color_mode: ColorMode::Color,
            },
            recording: RecordingConfig {
                save_dir: "./recordings".to_string(),
                name: "video".to_string(),
                backend: RecordingBackend::Raw,
                poll_interval_ms: 100,
                stall_threshold: 10,
                worker_join_timeout_ms: 2000,
            },
            overlay: OverlayConfig {
                timestamp: true,
                auxiliary: false,
                font_scale: 0,
            },
        }
    }
}

impl RecordingConfig {
    pub fn drain_settings(&self) -> DrainSettings {
        DrainSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            stall_threshold: self.stall_threshold,
            join_timeout: Duration::from_millis(self.worker_join_timeout_ms),
        }
    }
}

impl CamflowConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: CamflowConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(CameraError::ConfigError)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("camflow.toml")
    }

    /// Load from default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        let cam = &self.camera;
        if cam.frame_width == 0 || cam.frame_height == 0 {
            return Err("Invalid frame resolution".to_string());
        }
        if cam.frame_width % 2 != 0 || cam.frame_height % 2 != 0 {
            return Err("Frame width and height must be even".to_string());
        }
        if cam.target_rate == 0 || cam.target_rate > 240 {
            return Err("Invalid target rate (must be 1-240)".to_string());
        }

        let rec = &self.recording;
        if rec.name.is_empty() {
            return Err("Recording name must not be empty".to_string());
        }
        if rec.poll_interval_ms == 0 {
            return Err("Poll interval must be at least 1 ms".to_string());
        }
        if rec.stall_threshold == 0 {
            return Err("Stall threshold must be at least 1".to_string());
        }

        Ok(())
    }
}
