//! Output state shared by the writing thread and the closing thread
//!
//! Closing never waits behind a write. If a write is in flight when close is
//! requested, that write finishes the output as soon as it returns, and no
//! further write is accepted either way.

use crate::errors::CameraError;
use std::sync::Mutex;

#[derive(Default)]
struct Status {
    writing: bool,
    closing: bool,
}

pub(crate) struct SharedOutput<T> {
    output: Mutex<Option<T>>,
    status: Mutex<Status>,
    finish: fn(T) -> Result<(), CameraError>,
}

impl<T: Send> SharedOutput<T> {
    pub fn new(output: T, finish: fn(T) -> Result<(), CameraError>) -> Self {
        Self {
            output: Mutex::new(Some(output)),
            status: Mutex::new(Status::default()),
            finish,
        }
    }

    /// Run `f` against the open output
    pub fn write<R>(
        &self,
        f: impl FnOnce(&mut T) -> Result<R, CameraError>,
    ) -> Result<R, CameraError> {
        {
            let mut status = self.status.lock().expect("lock poisoned");
            if status.closing {
                return Err(closed());
            }
            status.writing = true;
        }

        let result = match self.output.lock().expect("lock poisoned").as_mut() {
            Some(output) => f(output),
            None => Err(closed()),
        };

        let finish_now = {
            let mut status = self.status.lock().expect("lock poisoned");
            status.writing = false;
            status.closing
        };
        if finish_now {
            log::debug!("Close was requested during a write; finishing output now");
            if let Err(e) = self.finish_output() {
                log::error!("Failed to finish output after deferred close: {}", e);
            }
        }
        result
    }

    /// Refuse further writes and finish the output
    ///
    /// Returns without finishing when a write is in flight; that write
    /// finishes the output. Calling it again is a no-op.
    pub fn close(&self) -> Result<(), CameraError> {
        let busy = {
            let mut status = self.status.lock().expect("lock poisoned");
            if status.closing {
                return Ok(());
            }
            status.closing = true;
            status.writing
        };
        if busy {
            log::debug!("Output busy; close deferred to the in-flight write");
            return Ok(());
        }
        self.finish_output()
    }

    #[cfg(test)]
    pub fn is_closing(&self) -> bool {
        self.status.lock().expect("lock poisoned").closing
    }

    fn finish_output(&self) -> Result<(), CameraError> {
        let taken = self.output.lock().expect("lock poisoned").take();
        match taken {
            Some(output) => (self.finish)(output),
            None => Ok(()),
        }
    }
}

fn closed() -> CameraError {
    CameraError::RecorderError("recorder already closed".to_string())
}
