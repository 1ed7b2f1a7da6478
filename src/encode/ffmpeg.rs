use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crossbeam_channel::Sender;

use crate::encode::sink::{EncodeConfig, GifEncoder, RenderOpts};
use crate::foundation::core::SessionId;
use crate::foundation::error::{GifforgeError, GifforgeResult};
use crate::render::composite::FrameRgba;
use crate::session::events::{EncoderEvent, SessionEvent};
use crate::settings::{QUALITY_MAX, QUALITY_MIN};

/// Fraction of the progress range spent streaming frames into the encoder; the remainder
/// covers palette generation and muxing inside the process.
const WRITE_PROGRESS_SPAN: f32 = 0.9;

/// Version line captured from a successful encoder probe.
#[derive(Clone, Debug)]
pub struct EncoderResource {
    /// First line of `ffmpeg -version` output.
    pub version: String,
}

/// GIF encoder backed by the system `ffmpeg` executable.
///
/// `load` probes the executable once; after that, each `render` spawns a fresh process,
/// streams the buffered raw RGBA frames to its stdin at a rational input rate of
/// `1000/delay_ms`, and encodes through a `palettegen`/`paletteuse` filter graph into a
/// temp file whose bytes are handed back through a `Finished` event.
pub struct FfmpegGifEncoder {
    program: PathBuf,
    resource: Option<EncoderResource>,

    cfg: Option<EncodeConfig>,
    frames: Vec<u8>,
    delays: Vec<u32>,
}

impl Default for FfmpegGifEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegGifEncoder {
    /// Create an encoder that invokes `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    /// Create an encoder that invokes a specific executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            resource: None,
            cfg: None,
            frames: Vec::new(),
            delays: Vec::new(),
        }
    }

    /// The probed resource, once `load` has succeeded.
    pub fn resource(&self) -> Option<&EncoderResource> {
        self.resource.as_ref()
    }

    fn probe(program: &Path) -> GifforgeResult<EncoderResource> {
        let output = Command::new(program)
            .arg("-version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                GifforgeError::resource_unavailable(format!(
                    "failed to invoke '{}' (is it installed and on PATH?): {e}",
                    program.display()
                ))
            })?;
        if !output.status.success() {
            return Err(GifforgeError::resource_unavailable(format!(
                "'{}' -version exited with {}",
                program.display(),
                output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned();
        Ok(EncoderResource { version })
    }
}

/// Map palette quality (`1` best .. `30` worst) onto `palettegen` color counts.
pub(crate) fn quality_to_max_colors(quality: u32) -> u32 {
    let q = quality.clamp(QUALITY_MIN, QUALITY_MAX);
    (256 - (q - 1) * 8).max(32)
}

/// Build the argv between the program name and the output path.
pub(crate) fn build_gif_args(cfg: EncodeConfig, opts: RenderOpts, delay_ms: u32) -> Vec<String> {
    let filter = format!(
        "split[a][b];[a]palettegen=max_colors={}:stats_mode=diff[p];\
         [b][p]paletteuse=dither=bayer:bayer_scale=3",
        quality_to_max_colors(opts.quality)
    );
    vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "-s".into(),
        format!("{}x{}", cfg.width, cfg.height),
        // Rational input rate: one frame every delay_ms milliseconds, exactly.
        "-r".into(),
        format!("1000/{delay_ms}"),
        "-i".into(),
        "pipe:0".into(),
        "-filter_complex".into(),
        filter,
        "-loop".into(),
        opts.loop_mode.gif_loop_value().to_string(),
        "-f".into(),
        "gif".into(),
    ]
}

impl GifEncoder for FfmpegGifEncoder {
    fn load(&mut self) -> GifforgeResult<()> {
        let resource = Self::probe(&self.program)?;
        tracing::debug!(version = %resource.version, "encoder resource loaded");
        self.resource = Some(resource);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.resource.is_some()
    }

    fn begin(&mut self, cfg: EncodeConfig) -> GifforgeResult<()> {
        if self.resource.is_none() {
            return Err(GifforgeError::resource_unavailable(
                "encoder resource is not loaded",
            ));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(GifforgeError::invalid_settings(
                "encoder frame width/height must be non-zero",
            ));
        }
        self.cfg = Some(cfg);
        self.frames.clear();
        self.delays.clear();
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRgba, delay_ms: u32) -> GifforgeResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| GifforgeError::invalid_state("encoder stream not started"))?;
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(GifforgeError::encoding_failure(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        let expected = (cfg.width as usize) * (cfg.height as usize) * 4;
        if frame.data.len() != expected {
            return Err(GifforgeError::encoding_failure(
                "frame data length mismatch with width*height*4",
            ));
        }
        self.frames.extend_from_slice(&frame.data);
        self.delays.push(delay_ms);
        Ok(())
    }

    fn render(
        &mut self,
        opts: RenderOpts,
        session: SessionId,
        events: &Sender<SessionEvent>,
    ) -> GifforgeResult<()> {
        if self.resource.is_none() {
            return Err(GifforgeError::resource_unavailable(
                "encoder resource is not loaded",
            ));
        }
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| GifforgeError::invalid_state("encoder stream not started"))?;
        if self.delays.is_empty() {
            return Err(GifforgeError::invalid_state(
                "encoder stream holds no frames",
            ));
        }

        let frames = std::mem::take(&mut self.frames);
        let delays = std::mem::take(&mut self.delays);
        // The orchestrator submits a uniform delay per session, so the stream rate is the
        // first frame's delay.
        let delay_ms = delays[0].max(1);

        let out_path = std::env::temp_dir().join(format!(
            "gifforge_{}_{}.gif",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        let _guard = TempFileGuard(Some(out_path.clone()));

        let outcome = run_encode(
            &self.program,
            cfg,
            opts,
            delay_ms,
            &frames,
            &out_path,
            session,
            events,
        );
        match outcome {
            Ok(bytes) => {
                let _ = events.send(SessionEvent {
                    session,
                    event: EncoderEvent::Progress(1.0),
                });
                let _ = events.send(SessionEvent {
                    session,
                    event: EncoderEvent::Finished(bytes),
                });
            }
            Err(reason) => {
                tracing::warn!(session = session.0, %reason, "encode failed");
                let _ = events.send(SessionEvent {
                    session,
                    event: EncoderEvent::Error(reason),
                });
            }
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.frames.clear();
        self.delays.clear();
    }
}

/// Spawn the encoder process, stream frames, and collect the output bytes.
///
/// All failures come back as a reason string destined for an `Error` event.
#[allow(clippy::too_many_arguments)]
fn run_encode(
    program: &Path,
    cfg: EncodeConfig,
    opts: RenderOpts,
    delay_ms: u32,
    frames: &[u8],
    out_path: &Path,
    session: SessionId,
    events: &Sender<SessionEvent>,
) -> Result<Vec<u8>, String> {
    let mut cmd = Command::new(program);
    cmd.args(build_gif_args(cfg, opts, delay_ms))
        .arg(out_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("failed to spawn '{}': {e}", program.display()))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| "failed to open encoder stdin (unexpected)".to_owned())?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| "failed to open encoder stderr (unexpected)".to_owned())?;
    let stderr_drain = std::thread::spawn(move || {
        let mut bytes = Vec::new();
        stderr.read_to_end(&mut bytes).map(|_| bytes)
    });

    let frame_bytes = (cfg.width as usize) * (cfg.height as usize) * 4;
    let total = frames.len() / frame_bytes;
    let write_result = (|| {
        use std::io::Write as _;
        for (i, chunk) in frames.chunks_exact(frame_bytes).enumerate() {
            stdin.write_all(chunk)?;
            let p = ((i + 1) as f32 / total as f32) * WRITE_PROGRESS_SPAN;
            let _ = events.send(SessionEvent {
                session,
                event: EncoderEvent::Progress(p),
            });
        }
        Ok::<_, std::io::Error>(())
    })();
    drop(stdin);

    let status = child
        .wait()
        .map_err(|e| format!("failed to wait for encoder: {e}"))?;
    let stderr_bytes = stderr_drain
        .join()
        .map_err(|_| "encoder stderr drain thread panicked".to_owned())?
        .unwrap_or_default();

    if let Err(e) = write_result
        && status.success()
    {
        // A broken pipe usually comes with a non-zero exit; report the write error only
        // when the process claims success anyway.
        return Err(format!("failed to write frames to encoder stdin: {e}"));
    }
    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr_bytes);
        return Err(format!(
            "encoder exited with {}: {}",
            status,
            stderr.trim()
        ));
    }

    std::fs::read(out_path).map_err(|e| format!("failed to read encoded output: {e}"))
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
