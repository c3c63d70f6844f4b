//! Split the input into work units.

use crate::error::PdfBatchError;
use crate::output::{UnitPayload, WorkUnit};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions recognised as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// List the images directly inside `dir`, sorted by path.
///
/// Each image becomes one unit whose index is its sorted position.
/// Sub-directories are not descended into.
pub fn discover_images(dir: &Path) -> Result<Vec<WorkUnit>, PdfBatchError> {
    let unreadable = |source| PdfBatchError::SourceDirUnreadable {
        dir: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(PdfBatchError::NoImagesFound {
            dir: dir.to_path_buf(),
        });
    }

    paths.sort();
    debug!("Found {} images in {}", paths.len(), dir.display());

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| WorkUnit {
            index,
            payload: UnitPayload::Image(path),
        })
        .collect())
}

/// Split `page_count` pages into at most `workers` contiguous chunks.
///
/// Every chunk but the last holds `ceil(page_count / workers)` pages, so
/// fewer than `workers` chunks come back when the pages run out early.
pub fn partition_pages(page_count: usize, workers: usize) -> Vec<WorkUnit> {
    if page_count == 0 {
        return Vec::new();
    }
    let chunk = page_count.div_ceil(workers.max(1));

    (0..page_count)
        .step_by(chunk)
        .enumerate()
        .map(|(index, start)| WorkUnit {
            index,
            payload: UnitPayload::Pages(start..(start + chunk).min(page_count)),
        })
        .collect()
}
