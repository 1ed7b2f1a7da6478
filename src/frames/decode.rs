use image::RgbaImage;

use crate::foundation::error::{GifforgeError, GifforgeResult};

/// Decoded source image in straight (non-premultiplied) RGBA8.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    /// Width in pixels, > 0.
    pub width: u32,
    /// Height in pixels, > 0.
    pub height: u32,
    /// Row-major RGBA8 pixels.
    pub pixels: RgbaImage,
}

/// Decode encoded image bytes into RGBA8.
///
/// A zero-dimension image is a [`GifforgeError::DecodeFailure`]: contain-fit scaling is
/// undefined for it and must never reach the compositor.
pub fn decode_image(bytes: &[u8]) -> GifforgeResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| GifforgeError::decode_failure(format!("decode image from memory: {e}")))?;
    let pixels = dyn_img.to_rgba8();
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(GifforgeError::decode_failure(
            "source image has a zero dimension",
        ));
    }
    Ok(DecodedImage {
        width,
        height,
        pixels,
    })
}

/// Check that bytes look like an accepted upload format (PNG, JPEG, WEBP or GIF).
///
/// This is a cheap header probe, not a full decode; a corrupt body still fails later at
/// [`decode_image`] time.
pub fn probe_format(bytes: &[u8]) -> GifforgeResult<image::ImageFormat> {
    let format = image::guess_format(bytes)
        .map_err(|e| GifforgeError::decode_failure(format!("unrecognized image data: {e}")))?;
    match format {
        image::ImageFormat::Png
        | image::ImageFormat::Jpeg
        | image::ImageFormat::WebP
        | image::ImageFormat::Gif => Ok(format),
        other => Err(GifforgeError::decode_failure(format!(
            "unsupported upload format {other:?} (accepted: PNG, JPEG, WEBP, GIF)"
        ))),
    }
}
