//! Testing utilities for camflow
//!
//! A synthetic camera plus scripted recorder and callback doubles, so the
//! whole pipeline can be exercised without hardware.

pub mod doubles;
pub mod synthetic_data;

pub use doubles::{EventLog, RecorderBehavior, RecorderTap, ScriptedRecorder, ScriptedRecorderFactory};
pub use synthetic_data::{synthetic_video_frame, ReadPlan, SyntheticCamera};
