//! GifForge turns an ordered set of still images into a single animated GIF.
//!
//! The public API is session-oriented:
//!
//! - Upload images into a [`FrameStore`] (append, remove, reorder)
//! - Capture a [`FrameSnapshot`] together with validated [`GifSettings`]
//! - Hand the snapshot to a [`GifController`], which composites every frame onto the
//!   output canvas (contain-fit, centered, opaque background) and streams them in order
//!   into a [`GifEncoder`]
//! - Pump the controller to apply encoder progress/completion events and read back the
//!   finished artifact as a revocable blob
//!
//! The actual GIF bitstream encoding lives in an external encoder executable (system
//! `ffmpeg` by default) behind the [`GifEncoder`] capability trait.
#![forbid(unsafe_code)]

mod foundation;

pub mod blob;
pub mod encode;
pub mod frames;
pub mod render;
pub mod session;
pub mod settings;

pub use crate::foundation::core::{FrameId, SessionId};
pub use crate::foundation::error::{GifforgeError, GifforgeResult};

pub use crate::blob::{BlobId, BlobStore};
pub use crate::encode::ffmpeg::{EncoderResource, FfmpegGifEncoder};
pub use crate::encode::sink::{EncodeConfig, GifEncoder, InMemoryGifEncoder, RenderOpts};
pub use crate::frames::decode::{DecodedImage, decode_image, probe_format};
pub use crate::frames::store::{
    FrameSnapshot, FrameStore, MAX_UPLOAD_BYTES, SnapshotFrame,
};
pub use crate::render::composite::{
    ContainFit, DEFAULT_BACKGROUND, FrameRgba, composite_contain, contain_fit,
};
pub use crate::session::controller::{ControllerState, FailureReason, GifController};
pub use crate::session::events::{EncoderEvent, EventBus, SessionEvent};
pub use crate::settings::{
    DELAY_MS_MAX, DELAY_MS_MIN, GifSettings, LoopMode, QUALITY_MAX, QUALITY_MIN,
};
