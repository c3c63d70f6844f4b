//! EXIF orientation and forced-portrait rotation.

use crate::config::RotationAngle;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// EXIF orientation tag value from raw image bytes.
///
/// Returns `None` when the file carries no EXIF block, the block cannot be
/// parsed, or the tag is absent.
pub fn read_exif_orientation(bytes: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No usable EXIF data: {}", e);
            return None;
        }
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
}

/// Turn an image upright according to its EXIF orientation.
///
/// Handles the three pure rotations: 3 (180°), 6 (stored rotated, needs a
/// quarter turn clockwise) and 8 (needs a quarter turn counter-clockwise).
/// Mirrored orientations and unknown values leave the image as is.
///
/// Returns the image and whether it was changed.
pub fn apply_exif_orientation(img: DynamicImage, orientation: Option<u32>) -> (DynamicImage, bool) {
    match orientation {
        Some(3) => (img.rotate180(), true),
        Some(6) => (img.rotate90(), true),
        Some(8) => (img.rotate270(), true),
        _ => (img, false),
    }
}

/// Rotate by a forced-portrait angle.
///
/// Positive angles turn counter-clockwise. `image`'s `rotate90` turns
/// clockwise, so −90° and 270° both map to it.
pub fn rotate(img: &DynamicImage, angle: RotationAngle) -> DynamicImage {
    match angle {
        RotationAngle::Clockwise90 | RotationAngle::CounterClockwise270 => img.rotate90(),
        RotationAngle::CounterClockwise90 => img.rotate270(),
        RotationAngle::Half => img.rotate180(),
    }
}
