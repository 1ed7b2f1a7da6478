//! Session-tagged event channel between encoders and the controller.
//!
//! Every event carries the [`SessionId`] that produced it; the controller applies only
//! events tagged with the live session and discards the rest. Superseding a session this
//! way is the complete cancellation contract: in-flight encoder work is never torn down,
//! its late events simply stop mattering.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::foundation::core::SessionId;

/// Event emitted by an encoder while rendering one session.
#[derive(Clone, Debug)]
pub enum EncoderEvent {
    /// Encoding progress in `[0, 1]`, non-decreasing within a session.
    Progress(f32),
    /// Terminal: the finished encoded GIF.
    Finished(Vec<u8>),
    /// Terminal: the encoder reported a failure.
    Error(String),
}

/// An encoder event tagged with its originating session.
#[derive(Clone, Debug)]
pub struct SessionEvent {
    /// Session that produced the event.
    pub session: SessionId,
    /// The event payload.
    pub event: EncoderEvent,
}

/// Unbounded channel carrying [`SessionEvent`]s into the controller.
#[derive(Debug)]
pub struct EventBus {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a bus with no queued events.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// A sender handle for encoders (or tests) to publish events through.
    pub fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }

    /// Pop the next queued event, if any.
    pub fn try_next(&self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}
