//! The frame-acquisition and dual-buffer recording pipeline
//!
//! ```text
//!  CameraSource --read--> CaptureLoop --publish--> FrameExchange
//!                                                   |  display slot  <-- take_display (display context)
//!                                                   |  record queue  <-- recorder worker, one frame per notice
//!                                                   |  saving / capturing flags
//!  SessionController: begin/end saving, drain with stall detection
//! ```

pub mod capture;
pub mod convert;
pub mod display;
pub mod events;
pub mod exchange;
pub mod fault;
pub mod queue;
pub mod session;
mod worker;

pub use capture::{CaptureLoop, CaptureStats, FrameProcessor, StepOutcome};
pub use display::DisplaySlot;
pub use events::{EventCallback, EventCallbacks};
pub use exchange::{DrainPoll, FrameExchange, FrameNotice};
pub use fault::{LastGoodFrame, StallDetector, StallVerdict};
pub use queue::RecordQueue;
pub use session::{
    DrainOutcome, DrainReport, DrainSettings, SessionController, SessionRequest, SessionState,
    FRAMES_CANNOT_BE_SAVED, RECORDER_OPEN_FAILED,
};
