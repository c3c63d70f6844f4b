//! Persist the assembled document and read it back.

use crate::engine;
use crate::error::PdfBatchError;
use crate::output::{OutputSummary, PageRecord};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Write the output through `write` into a temporary file beside `path`,
/// then rename it into place.
///
/// On failure the temporary file is removed and nothing exists at `path`
/// that was not there before.
pub fn save_atomic<F>(path: &Path, write: F) -> Result<u64, PdfBatchError>
where
    F: FnOnce(&Path) -> Result<(), String>,
{
    let failed = |detail: String| PdfBatchError::SaveFailed {
        path: path.to_path_buf(),
        detail,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;

    let tmp = tempfile::Builder::new()
        .prefix(".pdfbatch-")
        .suffix(".pdf.tmp")
        .tempfile_in(parent)
        .map_err(|e| failed(e.to_string()))?;

    write(tmp.path()).map_err(failed)?;
    tmp.persist(path).map_err(|e| failed(e.error.to_string()))?;

    let size = std::fs::metadata(path)
        .map_err(|e| failed(e.to_string()))?
        .len();
    info!("Saved {} ({} bytes)", path.display(), size);
    Ok(size)
}

/// Save a pdfium document atomically.
pub fn save_document(document: &PdfDocument<'_>, path: &Path) -> Result<u64, PdfBatchError> {
    save_atomic(path, |tmp| {
        document
            .save_to_file(tmp)
            .map_err(|e| format!("{:?}", e))
    })
}

/// Re-open a saved PDF and describe its pages.
pub fn inspect_output(pdfium: &Pdfium, path: &Path) -> Result<OutputSummary, PdfBatchError> {
    let document = engine::open_document(pdfium, path, None)?;
    let page_sizes: Vec<PageRecord> = document
        .pages()
        .iter()
        .map(|page| PageRecord {
            width: page.width().value,
            height: page.height().value,
        })
        .collect();

    let file_size_bytes = std::fs::metadata(path)
        .map_err(|e| PdfBatchError::Internal(format!("stat {}: {}", path.display(), e)))?
        .len();

    debug!("Inspected {}: {} pages", path.display(), page_sizes.len());
    Ok(OutputSummary::from_pages(page_sizes, file_size_bytes))
}
