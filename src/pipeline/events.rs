use std::sync::Arc;

/// Receiver of one kind of session message
pub type EventCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Status and error callbacks delivered to the control layer
///
/// Status lines (drain summaries) go to `on_timestamped_event`; fatal session
/// conditions go to `on_error`, exactly once per failure.
#[derive(Clone)]
pub struct EventCallbacks {
    on_timestamped_event: EventCallback,
    on_error: EventCallback,
}

impl EventCallbacks {
    pub fn new(on_timestamped_event: EventCallback, on_error: EventCallback) -> Self {
        Self {
            on_timestamped_event,
            on_error,
        }
    }

    /// Route status lines to `log::info!` and errors to `log::error!`
    pub fn logging() -> Self {
        Self::new(
            Arc::new(|msg| log::info!("{}", msg)),
            Arc::new(|msg| log::error!("{}", msg)),
        )
    }

    pub fn timestamped_event(&self, message: &str) {
        (self.on_timestamped_event)(message)
    }

    pub fn error(&self, message: &str) {
        (self.on_error)(message)
    }
}

impl Default for EventCallbacks {
    fn default() -> Self {
        Self::logging()
    }
}

impl std::fmt::Debug for EventCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCallbacks").finish_non_exhaustive()
    }
}
