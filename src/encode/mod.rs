//! Encoder capabilities.
//!
//! Encoders consume composited frames as an append-only ordered stream and report
//! through the session-tagged event channel.

/// System-`ffmpeg` GIF encoder.
pub mod ffmpeg;
/// Encoder capability trait and the in-memory test encoder.
pub mod sink;
