//! JPEG encoding of transformed pages.
//!
//! JPEG has no alpha channel, so anything that is not already 8-bit RGB is
//! converted first. Quality is clamped to 1–100 here as well as in the config
//! builders, since the encoder rejects 0.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode `img` as a baseline JPEG at `quality`.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let quality = quality.clamp(1, 100);
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);

    match img {
        DynamicImage::ImageRgb8(_) => img.write_with_encoder(encoder)?,
        other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder)?,
    }

    debug!(
        "Encoded {}x{} page → {} bytes JPEG (q={})",
        img.width(),
        img.height(),
        buf.len(),
        quality
    );
    Ok(buf)
}
