use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::blob::{BlobId, BlobStore};
use crate::encode::sink::{EncodeConfig, GifEncoder, RenderOpts};
use crate::foundation::core::SessionId;
use crate::foundation::error::{GifforgeError, GifforgeResult};
use crate::frames::decode::decode_image;
use crate::frames::store::FrameSnapshot;
use crate::render::composite::{DEFAULT_BACKGROUND, composite_contain};
use crate::session::events::{EncoderEvent, EventBus, SessionEvent};

/// Reason a controller (or one of its sessions) entered [`ControllerState::Failed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The encoder executable could not be loaded; generation is disabled until an
    /// explicit reload succeeds.
    Resource(String),
    /// A source image failed to decode mid-session.
    Decode(String),
    /// The encoder reported an error or never finished.
    Encoding(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Resource(msg) => write!(f, "encoder resource unavailable: {msg}"),
            FailureReason::Decode(msg) => write!(f, "frame decode failed: {msg}"),
            FailureReason::Encoding(msg) => write!(f, "encoding failed: {msg}"),
        }
    }
}

/// Observable controller state.
///
/// The presentation layer maps these 1:1 onto "nothing generated yet", "in progress with
/// progress value", "failed with reason", and "completed with artifact".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// No encoder resource loaded yet.
    Idle,
    /// Encoder resource load in flight.
    LoadingEncoder,
    /// Ready to accept a generation request.
    Ready,
    /// Decoding, compositing and submitting frames in snapshot order.
    Preparing,
    /// All frames submitted; waiting on encoder events.
    Encoding,
    /// Terminal encoder event received; wrapping the artifact.
    Finalizing,
    /// The last session produced an artifact.
    Completed,
    /// The last session (or the resource load) failed.
    Failed(FailureReason),
}

/// The orchestration state machine.
///
/// Owns one encoder capability and at most one non-terminal session at a time. Frames
/// are decoded, composited and submitted strictly in snapshot order by sequential
/// consumption, so the encoder's append-only stream needs no frame indices. Encoder
/// events are applied through [`GifController::pump`]; events tagged with anything but
/// the live session are discarded.
pub struct GifController<E: GifEncoder> {
    encoder: E,
    events: EventBus,
    state: ControllerState,
    next_session: u64,
    live_session: Option<SessionId>,
    progress: f32,
    blobs: BlobStore,
    artifact: Option<BlobId>,
}

impl<E: GifEncoder> GifController<E> {
    /// Create a controller in `Idle` around an unloaded encoder.
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            events: EventBus::new(),
            state: ControllerState::Idle,
            next_session: 0,
            live_session: None,
            progress: 0.0,
            blobs: BlobStore::new(),
            artifact: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Latest republished progress value in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// The displayed artifact bytes, if a session has completed and `clear` has not
    /// revoked them.
    pub fn artifact(&self) -> Option<Arc<Vec<u8>>> {
        self.artifact.and_then(|id| self.blobs.get(id))
    }

    /// Suggested download file name for the current artifact.
    pub fn artifact_file_name(&self) -> String {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("gifforge-{millis}.gif")
    }

    /// Sender side of the event channel, used to wire encoders running elsewhere and by
    /// tests to inject events.
    pub fn event_sender(&self) -> Sender<SessionEvent> {
        self.events.sender()
    }

    /// Borrow the owned encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Mutably borrow the owned encoder.
    pub fn encoder_mut(&mut self) -> &mut E {
        &mut self.encoder
    }

    /// Load (or explicitly reload) the encoder resource.
    ///
    /// Callable from `Idle` and from `Failed(Resource)`; a load failure is terminal for
    /// the process until the next explicit call here.
    pub fn load_encoder(&mut self) -> GifforgeResult<()> {
        match &self.state {
            ControllerState::Idle | ControllerState::Failed(FailureReason::Resource(_)) => {}
            other => {
                return Err(GifforgeError::invalid_state(format!(
                    "cannot load encoder from {other:?}"
                )));
            }
        }
        self.state = ControllerState::LoadingEncoder;
        match self.encoder.load() {
            Ok(()) => {
                self.state = ControllerState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ControllerState::Failed(FailureReason::Resource(e.to_string()));
                Err(e)
            }
        }
    }

    /// Run one generation session over `snapshot`.
    ///
    /// Preconditions are checked before any side effect: the captured settings must
    /// validate and the snapshot must be non-empty, and the controller must not already
    /// have a session in flight. On acceptance a fresh, strictly increasing session id
    /// is assigned and every frame is decoded, composited and submitted in snapshot
    /// order. Returns once all frames are submitted and the encoder has been told to
    /// render; call [`GifController::pump`] to apply the resulting events.
    #[tracing::instrument(skip(self, snapshot), fields(frames = snapshot.len()))]
    pub fn generate(&mut self, snapshot: &FrameSnapshot) -> GifforgeResult<SessionId> {
        match &self.state {
            ControllerState::Ready | ControllerState::Completed => {}
            ControllerState::Failed(FailureReason::Resource(_)) => {
                return Err(GifforgeError::resource_unavailable(
                    "encoder resource is unavailable; reload it before generating",
                ));
            }
            ControllerState::Failed(_) => {}
            ControllerState::Idle | ControllerState::LoadingEncoder => {
                return Err(GifforgeError::invalid_state(
                    "encoder resource is not loaded yet",
                ));
            }
            ControllerState::Preparing
            | ControllerState::Encoding
            | ControllerState::Finalizing => {
                return Err(GifforgeError::invalid_state(
                    "a session is already in flight",
                ));
            }
        }
        snapshot.settings().validate()?;
        if snapshot.is_empty() {
            return Err(GifforgeError::invalid_state(
                "snapshot contains no frames",
            ));
        }

        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.live_session = Some(session);
        self.progress = 0.0;
        self.state = ControllerState::Preparing;
        tracing::debug!(session = session.0, "session accepted");

        let settings = snapshot.settings().clone();
        if let Err(e) = self.encoder.begin(EncodeConfig {
            width: settings.width,
            height: settings.height,
        }) {
            return Err(self.fail_session(e));
        }

        // Sequential, ordered submission: one frame at a time, in snapshot order,
        // regardless of how long each decode takes.
        for frame in snapshot.frames() {
            let composited = decode_image(&frame.source).and_then(|decoded| {
                composite_contain(&decoded, settings.width, settings.height, DEFAULT_BACKGROUND)
            });
            let composited = match composited {
                Ok(f) => f,
                Err(e) => return Err(self.fail_session(e)),
            };
            if let Err(e) = self.encoder.push_frame(&composited, settings.delay_ms) {
                return Err(self.fail_session(e));
            }
        }

        self.state = ControllerState::Encoding;
        let tx = self.events.sender();
        if let Err(e) = self.encoder.render(
            RenderOpts {
                quality: settings.quality,
                loop_mode: settings.loop_mode,
            },
            session,
            &tx,
        ) {
            return Err(self.fail_session(e));
        }
        Ok(session)
    }

    /// Drain and apply queued encoder events.
    ///
    /// Events tagged with a session other than the live one are discarded, as are events
    /// arriving while no session is encoding.
    pub fn pump(&mut self) {
        while let Some(ev) = self.events.try_next() {
            self.apply_event(ev);
        }
    }

    /// Revoke the displayed artifact and reset the progress display.
    ///
    /// Never touches the session state machine; callable from any state, idempotently.
    pub fn clear(&mut self) {
        if let Some(id) = self.artifact.take() {
            self.blobs.revoke(id);
        }
        self.progress = 0.0;
    }

    fn apply_event(&mut self, ev: SessionEvent) {
        let live = match self.live_session {
            Some(live) if ev.session == live => live,
            _ => {
                tracing::debug!(stale = ev.session.0, "discarding stale session event");
                return;
            }
        };
        if self.state != ControllerState::Encoding {
            tracing::debug!(
                session = live.0,
                state = ?self.state,
                "discarding event outside of encoding"
            );
            return;
        }

        match ev.event {
            EncoderEvent::Progress(p) => {
                // Republished as-is (clamped), no interpolation.
                self.progress = p.clamp(0.0, 1.0);
            }
            EncoderEvent::Finished(bytes) => {
                self.state = ControllerState::Finalizing;
                if let Some(old) = self.artifact.take() {
                    self.blobs.revoke(old);
                }
                self.artifact = Some(self.blobs.insert(bytes));
                self.progress = 1.0;
                self.state = ControllerState::Completed;
                tracing::debug!(session = live.0, "session completed");
            }
            EncoderEvent::Error(reason) => {
                // No partial artifact for this session; an earlier completed artifact
                // stays displayed until cleared or superseded.
                self.state = ControllerState::Failed(FailureReason::Encoding(reason));
            }
        }
    }

    /// Abort the in-flight session and map `err` onto a terminal failure state.
    fn fail_session(&mut self, err: GifforgeError) -> GifforgeError {
        self.encoder.abort();
        let reason = match &err {
            GifforgeError::DecodeFailure(msg) => FailureReason::Decode(msg.clone()),
            other => FailureReason::Encoding(other.to_string()),
        };
        tracing::warn!(%reason, "session aborted");
        self.state = ControllerState::Failed(reason);
        err
    }
}
