//! Per-image transformation: decode, orient, rotate, downscale, encode.
//!
//! Runs on a worker thread with no shared state; everything it needs is in
//! [`ImageSettings`], which is `Copy`.

use crate::config::{ImageToPdfConfig, RotationAngle};
use crate::error::UnitError;
use crate::output::{ImageFlags, TransformResult, UnitOutcome, UnitPayload, WorkUnit};
use crate::pipeline::{encode, geometry, orient};
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing::debug;

/// The subset of [`ImageToPdfConfig`] a worker needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSettings {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: u8,
    pub force_portrait: bool,
    pub rotation: RotationAngle,
}

impl From<&ImageToPdfConfig> for ImageSettings {
    fn from(c: &ImageToPdfConfig) -> Self {
        Self {
            max_width: c.max_width,
            max_height: c.max_height,
            quality: c.quality,
            force_portrait: c.force_portrait,
            rotation: c.rotation,
        }
    }
}

/// Transform one image file into a page-ready JPEG.
pub fn process_image(
    index: usize,
    path: &Path,
    settings: &ImageSettings,
) -> Result<TransformResult, UnitError> {
    let fail = |detail: String| UnitError::ImageFailed {
        index,
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        detail,
    };

    let bytes = std::fs::read(path).map_err(|e| fail(format!("read failed: {e}")))?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| fail(format!("decode failed: {e}")))?;
    let img = match decoded {
        DynamicImage::ImageRgb8(_) => decoded,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let mut flags = ImageFlags::default();

    let (mut img, exif_corrected) =
        orient::apply_exif_orientation(img, orient::read_exif_orientation(&bytes));
    flags.exif_corrected = exif_corrected;

    if settings.force_portrait && img.width() > img.height() {
        img = orient::rotate(&img, settings.rotation);
        flags.rotated = true;
        flags.rotation_angle = Some(settings.rotation);
    }

    if let Some((w, h)) =
        geometry::target_size(img.width(), img.height(), settings.max_width, settings.max_height)
    {
        img = img.resize_exact(w, h, FilterType::Lanczos3);
        flags.resized = true;
    }

    let encoded =
        encode::encode_jpeg(&img, settings.quality).map_err(|e| fail(format!("encode failed: {e}")))?;

    debug!(
        "Image {} ({}) → {}x{} {:?}",
        index,
        path.display(),
        img.width(),
        img.height(),
        flags
    );

    Ok(TransformResult {
        index,
        encoded,
        width: img.width(),
        height: img.height(),
        flags: Some(flags),
    })
}

/// Worker entry point for the image pipeline.
pub fn transform_image_unit(unit: WorkUnit, settings: &ImageSettings) -> UnitOutcome {
    match &unit.payload {
        UnitPayload::Image(path) => match process_image(unit.index, path, settings) {
            Ok(result) => UnitOutcome::success(unit.index, result),
            Err(e) => UnitOutcome::failure(unit.index, e),
        },
        UnitPayload::Pages(range) => UnitOutcome::failure(
            unit.index,
            UnitError::ChunkFailed {
                start: range.start,
                end: range.end,
                detail: "page range handed to the image transformer".into(),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_jpeg;
    use tempfile::TempDir;

    fn settings() -> ImageSettings {
        ImageSettings::from(&ImageToPdfConfig::default())
    }

    fn decode(result: &TransformResult) -> DynamicImage {
        image::load_from_memory(&result.encoded).unwrap()
    }

    #[test]
    fn landscape_is_rotated_and_downscaled() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "wide.jpg", 3000, 2000, None);

        let r = process_image(0, &path, &settings()).unwrap();
        // Rotated to 2000x3000, then scale = min(1200/2000, 1600/3000) = 0.5333…
        assert_eq!((r.width, r.height), (1066, 1600));
        let flags = r.flags.unwrap();
        assert!(flags.rotated && flags.resized && !flags.exif_corrected);
        assert_eq!(flags.rotation_angle, Some(RotationAngle::Clockwise90));

        let img = decode(&r);
        assert_eq!((img.width(), img.height()), (r.width, r.height));
    }

    #[test]
    fn small_portrait_is_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "small.jpg", 300, 400, None);
        let r = process_image(4, &path, &settings()).unwrap();
        assert_eq!(r.index, 4);
        assert_eq!((r.width, r.height), (300, 400));
        assert_eq!(r.flags, Some(ImageFlags::default()));
    }

    #[test]
    fn square_is_not_rotated() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "sq.jpg", 500, 500, None);
        let r = process_image(0, &path, &settings()).unwrap();
        assert!(!r.flags.unwrap().rotated);
    }

    #[test]
    fn force_portrait_off_keeps_landscape() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "wide.jpg", 800, 600, None);
        let s = ImageSettings {
            force_portrait: false,
            ..settings()
        };
        let r = process_image(0, &path, &s).unwrap();
        assert_eq!((r.width, r.height), (800, 600));
    }

    #[test]
    fn half_turn_leaves_landscape() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "wide.jpg", 800, 600, None);
        let s = ImageSettings {
            rotation: RotationAngle::Half,
            ..settings()
        };
        let r = process_image(0, &path, &s).unwrap();
        assert_eq!((r.width, r.height), (800, 600));
        assert!(r.flags.unwrap().rotated);
    }

    #[test]
    fn exif_six_makes_stored_landscape_portrait() {
        let dir = TempDir::new().unwrap();
        // Stored 400x300 with orientation 6: upright it is 300x400.
        let path = write_jpeg(dir.path(), "phone.jpg", 400, 300, Some(6));
        let r = process_image(0, &path, &settings()).unwrap();
        assert_eq!((r.width, r.height), (300, 400));
        let flags = r.flags.unwrap();
        assert!(flags.exif_corrected);
        assert!(!flags.rotated);
    }

    #[test]
    fn every_quarter_angle_yields_portrait() {
        let dir = TempDir::new().unwrap();
        let path = write_jpeg(dir.path(), "wide.jpg", 900, 500, None);
        for angle in [
            RotationAngle::Clockwise90,
            RotationAngle::CounterClockwise90,
            RotationAngle::CounterClockwise270,
        ] {
            let s = ImageSettings {
                rotation: angle,
                ..settings()
            };
            let r = process_image(0, &path, &s).unwrap();
            assert!(r.height > r.width, "{angle:?}");
        }
    }

    #[test]
    fn corrupt_file_is_unit_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"\xFF\xD8 definitely not a jpeg").unwrap();

        let outcome = transform_image_unit(
            WorkUnit {
                index: 7,
                payload: UnitPayload::Image(path),
            },
            &settings(),
        );
        assert!(outcome.results.is_empty());
        match &outcome.failures[..] {
            [UnitError::ImageFailed { index, file, .. }] => {
                assert_eq!(*index, 7);
                assert_eq!(file, "broken.jpg");
            }
            other => panic!("unexpected failures: {other:?}"),
        }
    }

    #[test]
    fn png_with_alpha_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alpha.png");
        image::RgbaImage::from_pixel(20, 30, image::Rgba([10, 20, 30, 40]))
            .save(&path)
            .unwrap();
        let r = process_image(0, &path, &settings()).unwrap();
        assert_eq!((r.width, r.height), (20, 30));
    }
}
