use crate::foundation::error::{GifforgeError, GifforgeResult};

/// Minimum per-frame delay in milliseconds.
pub const DELAY_MS_MIN: u32 = 20;
/// Maximum per-frame delay in milliseconds.
pub const DELAY_MS_MAX: u32 = 2000;
/// Best palette quality (lower is better, but slower).
pub const QUALITY_MIN: u32 = 1;
/// Worst palette quality.
pub const QUALITY_MAX: u32 = 30;

/// Loop behavior of the output GIF.
///
/// The GIF application extension encodes these as `0` (infinite) and `-1` (play once).
/// Finite repeat counts are deliberately not modeled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Loop forever.
    Forever,
    /// Play through once, then stop on the last frame.
    Once,
}

impl LoopMode {
    /// The loop value understood by GIF encoders: `0` for infinite, `-1` for no loop.
    pub fn gif_loop_value(self) -> i32 {
        match self {
            LoopMode::Forever => 0,
            LoopMode::Once => -1,
        }
    }
}

/// Output geometry and encoding parameters.
///
/// Pure validated data: freely mutable between sessions, immutable once captured into a
/// [`crate::frames::store::FrameSnapshot`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GifSettings {
    /// Output width in pixels, must be > 0.
    pub width: u32,
    /// Output height in pixels, must be > 0.
    pub height: u32,
    /// Per-frame delay in milliseconds, within `[DELAY_MS_MIN, DELAY_MS_MAX]`.
    pub delay_ms: u32,
    /// Palette quality within `[QUALITY_MIN, QUALITY_MAX]`; lower is better.
    pub quality: u32,
    /// Loop behavior of the output.
    pub loop_mode: LoopMode,
}

impl Default for GifSettings {
    fn default() -> Self {
        Self {
            width: 500,
            height: 500,
            delay_ms: 200,
            quality: 10,
            loop_mode: LoopMode::Forever,
        }
    }
}

impl GifSettings {
    /// Check every field against its allowed range.
    ///
    /// The error names the first offending field; nothing about the value is mutated.
    pub fn validate(&self) -> GifforgeResult<()> {
        if self.width == 0 {
            return Err(GifforgeError::invalid_settings("width must be > 0"));
        }
        if self.height == 0 {
            return Err(GifforgeError::invalid_settings("height must be > 0"));
        }
        if self.delay_ms < DELAY_MS_MIN || self.delay_ms > DELAY_MS_MAX {
            return Err(GifforgeError::invalid_settings(format!(
                "delay_ms must be within [{DELAY_MS_MIN}, {DELAY_MS_MAX}], got {}",
                self.delay_ms
            )));
        }
        if self.quality < QUALITY_MIN || self.quality > QUALITY_MAX {
            return Err(GifforgeError::invalid_settings(format!(
                "quality must be within [{QUALITY_MIN}, {QUALITY_MAX}], got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// Return a copy with the output geometry replaced.
    ///
    /// Used to default the output size to the first uploaded image's size.
    pub fn sized_to(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }
}
