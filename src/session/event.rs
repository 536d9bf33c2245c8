//! The result channel between a session worker and its consumer.
//!
//! Two data streams share one channel and are kept apart by tag, not by
//! payload shape: `Log` lines are an append-only record, `Frame`s replace
//! the previously displayed frame. `Closed` is the terminal signal, emitted
//! exactly once per session on every exit path.

use log::debug;
use tokio::sync::mpsc;

use crate::backup::BackupRecord;
use crate::session::command::{CommandResult, LoopFrame};

/// One message from a session worker.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Append-only lifecycle or diagnostic line.
    Log(String),

    /// A completed command's result, in command order.
    Result(CommandResult),

    /// The pre-change backup was persisted.
    BackupSaved(BackupRecord),

    /// One loop cycle's combined output. Replaces the previous frame.
    Frame(LoopFrame),

    /// The session is over. Nothing follows this.
    Closed,
}

/// Worker-side sender. Sending never blocks; a consumer that has gone away
/// just stops receiving.
#[derive(Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            debug!("event receiver dropped; continuing without a consumer");
        }
    }

    pub(crate) fn log(&self, message: impl Into<String>) {
        self.send(SessionEvent::Log(message.into()));
    }
}
