//! The consumer: writes queued frames as new-frame notices arrive

use super::exchange::{FrameExchange, FrameNotice};
use crate::recording::Recorder;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread::JoinHandle;
use uuid::Uuid;

/// Spawn the recorder worker for one session
///
/// The worker dequeues one frame per notice, for its own `generation` only.
/// It exits once the subscription is dropped and every buffered notice is
/// consumed, returning the recorder's write count. Closing the recorder is
/// left to the session controller.
pub(crate) fn spawn(
    session_id: Uuid,
    generation: u64,
    recorder: Arc<dyn Recorder>,
    exchange: FrameExchange,
    notices: Receiver<FrameNotice>,
) -> std::io::Result<JoinHandle<u64>> {
    std::thread::Builder::new()
        .name("camflow-recorder".to_string())
        .spawn(move || run(session_id, generation, recorder, exchange, notices))
}

fn run(
    session_id: Uuid,
    generation: u64,
    recorder: Arc<dyn Recorder>,
    exchange: FrameExchange,
    notices: Receiver<FrameNotice>,
) -> u64 {
    log::debug!("Recorder worker started for session {}", session_id);

    for _notice in notices.iter() {
        // Nothing left for this session once its queue was discarded
        let Some(entry) = exchange.dequeue_for(generation) else {
            continue;
        };
        if let Err(e) = recorder.write(&entry.frame, &entry.timestamp) {
            log::error!("Session {}: failed to write frame: {}", session_id, e);
        }
        exchange.report_written(generation, recorder.write_count());
    }

    let written = recorder.write_count();
    log::debug!("Recorder worker for session {} exited after {} frames", session_id, written);
    written
}
