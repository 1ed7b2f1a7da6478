use crossbeam_channel::Sender;

use crate::foundation::core::SessionId;
use crate::foundation::error::{GifforgeError, GifforgeResult};
use crate::render::composite::FrameRgba;
use crate::session::events::{EncoderEvent, SessionEvent};
use crate::settings::LoopMode;

/// Geometry of one encoder frame stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// Final encode parameters handed to [`GifEncoder::render`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOpts {
    /// Palette quality, lower is better.
    pub quality: u32,
    /// Loop behavior of the output.
    pub loop_mode: LoopMode,
}

/// External GIF encoder capability.
///
/// Frames form an append-only ordered stream: push order is presentation order, and no
/// index accompanies a frame. `render` consumes the buffered stream and reports through
/// session-tagged events; its `Result` covers only contract misuse (not loaded, no
/// stream), while encode outcomes always arrive as `Finished` or `Error` events.
pub trait GifEncoder: Send {
    /// Load the encoder's executable resource.
    ///
    /// Failure is [`GifforgeError::ResourceUnavailable`] and leaves the encoder unusable
    /// until a later `load` succeeds.
    fn load(&mut self) -> GifforgeResult<()>;

    /// Return `true` once a `load` has succeeded.
    fn is_loaded(&self) -> bool;

    /// Start a new frame stream, discarding any previously buffered one.
    fn begin(&mut self, cfg: EncodeConfig) -> GifforgeResult<()>;

    /// Append one frame with its display delay to the stream.
    fn push_frame(&mut self, frame: &FrameRgba, delay_ms: u32) -> GifforgeResult<()>;

    /// Encode the buffered stream, emitting events tagged with `session`.
    fn render(
        &mut self,
        opts: RenderOpts,
        session: SessionId,
        events: &Sender<SessionEvent>,
    ) -> GifforgeResult<()>;

    /// Discard the buffered stream without encoding it.
    fn abort(&mut self);
}

/// In-memory encoder for tests and debugging.
///
/// Records the stream it is fed and, on `render`, replays a configurable script of
/// progress values followed by a terminal event.
#[derive(Debug, Default)]
pub struct InMemoryGifEncoder {
    loaded: bool,
    cfg: Option<EncodeConfig>,
    frames: Vec<(FrameRgba, u32)>,
    render_calls: Vec<RenderOpts>,
    abort_count: usize,

    /// Fail the next `load` call.
    pub fail_load: bool,
    /// Emit an `Error` event with this reason instead of finishing.
    pub fail_render: Option<String>,
    /// Progress values emitted before the terminal event.
    pub progress_script: Vec<f32>,
    /// When `false`, emit no terminal event (the session stays encoding until events are
    /// injected externally).
    pub emit_finished: bool,
}

impl InMemoryGifEncoder {
    /// Create an encoder that finishes successfully with a placeholder artifact.
    pub fn new() -> Self {
        Self {
            emit_finished: true,
            ..Self::default()
        }
    }

    /// Config captured by the last `begin`, if any.
    pub fn config(&self) -> Option<EncodeConfig> {
        self.cfg
    }

    /// Frames recorded in push order with their delays.
    pub fn frames(&self) -> &[(FrameRgba, u32)] {
        &self.frames
    }

    /// Render options recorded per `render` call.
    pub fn render_calls(&self) -> &[RenderOpts] {
        &self.render_calls
    }

    /// Number of `abort` calls observed.
    pub fn abort_count(&self) -> usize {
        self.abort_count
    }
}

impl GifEncoder for InMemoryGifEncoder {
    fn load(&mut self) -> GifforgeResult<()> {
        if self.fail_load {
            return Err(GifforgeError::resource_unavailable(
                "in-memory encoder scripted to fail loading",
            ));
        }
        self.loaded = true;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn begin(&mut self, cfg: EncodeConfig) -> GifforgeResult<()> {
        if !self.loaded {
            return Err(GifforgeError::resource_unavailable(
                "encoder resource is not loaded",
            ));
        }
        self.cfg = Some(cfg);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba, delay_ms: u32) -> GifforgeResult<()> {
        if self.cfg.is_none() {
            return Err(GifforgeError::invalid_state("encoder stream not started"));
        }
        self.frames.push((frame.clone(), delay_ms));
        Ok(())
    }

    fn render(
        &mut self,
        opts: RenderOpts,
        session: SessionId,
        events: &Sender<SessionEvent>,
    ) -> GifforgeResult<()> {
        if self.cfg.is_none() {
            return Err(GifforgeError::invalid_state("encoder stream not started"));
        }
        self.render_calls.push(opts);

        for &p in &self.progress_script {
            let _ = events.send(SessionEvent {
                session,
                event: EncoderEvent::Progress(p),
            });
        }

        if let Some(reason) = self.fail_render.clone() {
            let _ = events.send(SessionEvent {
                session,
                event: EncoderEvent::Error(reason),
            });
        } else if self.emit_finished {
            let mut artifact = b"GIF89a".to_vec();
            artifact.push(self.frames.len() as u8);
            let _ = events.send(SessionEvent {
                session,
                event: EncoderEvent::Finished(artifact),
            });
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.abort_count += 1;
        self.cfg = None;
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::events::EventBus;

    fn frame(px: u8) -> FrameRgba {
        FrameRgba {
            width: 1,
            height: 1,
            data: vec![px, px, px, 255],
        }
    }

    #[test]
    fn push_before_begin_is_rejected() {
        let mut enc = InMemoryGifEncoder::new();
        enc.load().unwrap();
        assert!(matches!(
            enc.push_frame(&frame(1), 100),
            Err(GifforgeError::InvalidState(_))
        ));
    }

    #[test]
    fn render_replays_script_then_finishes() {
        let bus = EventBus::new();
        let mut enc = InMemoryGifEncoder::new();
        enc.progress_script = vec![0.25, 0.75];
        enc.load().unwrap();
        enc.begin(EncodeConfig {
            width: 1,
            height: 1,
        })
        .unwrap();
        enc.push_frame(&frame(9), 40).unwrap();
        enc.render(
            RenderOpts {
                quality: 10,
                loop_mode: LoopMode::Forever,
            },
            SessionId(1),
            &bus.sender(),
        )
        .unwrap();

        assert!(matches!(
            bus.try_next().unwrap().event,
            EncoderEvent::Progress(p) if (p - 0.25).abs() < f32::EPSILON
        ));
        assert!(matches!(
            bus.try_next().unwrap().event,
            EncoderEvent::Progress(_)
        ));
        match bus.try_next().unwrap().event {
            EncoderEvent::Finished(bytes) => assert!(bytes.starts_with(b"GIF89a")),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn begin_resets_a_previous_stream() {
        let mut enc = InMemoryGifEncoder::new();
        enc.load().unwrap();
        let cfg = EncodeConfig {
            width: 1,
            height: 1,
        };
        enc.begin(cfg).unwrap();
        enc.push_frame(&frame(1), 40).unwrap();
        enc.begin(cfg).unwrap();
        assert!(enc.frames().is_empty());
    }
}
