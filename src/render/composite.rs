//! Contain-fit compositing of a decoded source image onto the output canvas.
//!
//! Deterministic and stateless: the same source and target geometry always produce the
//! same placement, and no state is carried between invocations.

use image::{Rgba, RgbaImage, imageops};

use crate::foundation::error::{GifforgeError, GifforgeResult};
use crate::frames::decode::DecodedImage;

/// Opaque background every canvas is filled with before drawing (white).
///
/// Filling is mandatory: encoder surfaces may be reused and skipping the fill would let
/// prior-frame pixels bleed through.
pub const DEFAULT_BACKGROUND: [u8; 4] = [255, 255, 255, 255];

/// One composited output frame as tightly packed, row-major RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, `width * height * 4` long.
    pub data: Vec<u8>,
}

/// Placement of a source image inside the target canvas under contain-fit scaling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContainFit {
    /// Scaled draw width in pixels, within `[1, target width]`.
    pub draw_w: u32,
    /// Scaled draw height in pixels, within `[1, target height]`.
    pub draw_h: u32,
    /// Left edge of the drawn image on the canvas.
    pub offset_x: u32,
    /// Top edge of the drawn image on the canvas.
    pub offset_y: u32,
}

/// Compute the centered, aspect-preserving placement of `sw x sh` inside `tw x th`.
///
/// May upscale or downscale, never crops. Zero source dimensions are a
/// [`GifforgeError::DecodeFailure`]; zero target dimensions are rejected upstream by
/// settings validation and must never reach this function.
pub fn contain_fit(sw: u32, sh: u32, tw: u32, th: u32) -> GifforgeResult<ContainFit> {
    if sw == 0 || sh == 0 {
        return Err(GifforgeError::decode_failure(
            "source image has a zero dimension",
        ));
    }
    debug_assert!(tw > 0 && th > 0, "target geometry is validated upstream");

    let scale = f64::min(f64::from(tw) / f64::from(sw), f64::from(th) / f64::from(sh));
    let draw_w = ((f64::from(sw) * scale).round() as u32).clamp(1, tw);
    let draw_h = ((f64::from(sh) * scale).round() as u32).clamp(1, th);

    Ok(ContainFit {
        draw_w,
        draw_h,
        offset_x: (tw - draw_w) / 2,
        offset_y: (th - draw_h) / 2,
    })
}

/// Composite a decoded source image onto a fresh `tw x th` canvas.
///
/// The canvas is filled with `background`, then the source is resized to its contain-fit
/// placement and alpha-blended at the centered offset.
pub fn composite_contain(
    src: &DecodedImage,
    tw: u32,
    th: u32,
    background: [u8; 4],
) -> GifforgeResult<FrameRgba> {
    let fit = contain_fit(src.width, src.height, tw, th)?;

    let mut canvas = RgbaImage::from_pixel(tw, th, Rgba(background));
    let resized = imageops::resize(
        &src.pixels,
        fit.draw_w,
        fit.draw_h,
        imageops::FilterType::Triangle,
    );
    imageops::overlay(
        &mut canvas,
        &resized,
        i64::from(fit.offset_x),
        i64::from(fit.offset_y),
    );

    Ok(FrameRgba {
        width: tw,
        height: th,
        data: canvas.into_raw(),
    })
}
