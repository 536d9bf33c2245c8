//! Consumer-side handle for a running session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::command::SessionOutcome;
use crate::session::event::SessionEvent;

/// Handle to a session running on a background worker task.
///
/// The handle is the only thing the worker and its consumer share: events
/// flow out through it, cancellation flows in. Dropping the handle does not
/// cancel the session — stopping a loop is an explicit act.
pub struct SessionHandle {
    events: mpsc::UnboundedReceiver<SessionEvent>,
    cancel: Arc<AtomicBool>,
    worker: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<SessionEvent>,
        cancel: Arc<AtomicBool>,
        worker: JoinHandle<SessionOutcome>,
    ) -> Self {
        Self {
            events,
            cancel,
            worker,
        }
    }

    /// Wait for the next event. Returns `None` once `Closed` has been
    /// delivered and the worker's sender is gone.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Non-blocking poll for the next event. Repeated empty polls are
    /// normal, not an error.
    pub fn try_next_event(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Request cooperative cancellation. Loop sessions observe the flag
    /// within one polling granularity; the terminal signal is still emitted.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the session to finish and take its outcome.
    pub async fn wait(self) -> SessionOutcome {
        match self.worker.await {
            Ok(outcome) => outcome,
            Err(e) => SessionOutcome::failed(Vec::new(), format!("session worker panicked: {e}"), None),
        }
    }
}
