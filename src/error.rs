//! Error types for the pdfbatch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfBatchError`]: **Fatal**: the run cannot produce a usable output
//!   (no input found, nothing converted, output could not be saved). Returned
//!   as `Err(PdfBatchError)` from the top-level pipeline functions.
//!
//! * [`UnitError`]: **Non-fatal**: one image, one page or one chunk failed
//!   but the batch carries on without it. Stored in
//!   [`crate::output::ConversionReport::failures`] so callers can see exactly
//!   what was dropped.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfbatch library.
#[derive(Debug, Error)]
pub enum PdfBatchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source directory holds no file with a recognised image extension.
    #[error("No image files found in '{dir}'\nRecognised extensions: .jpg .jpeg .png .bmp .tiff")]
    NoImagesFound { dir: PathBuf },

    /// The source directory could not be listed.
    #[error("Cannot read image directory '{dir}': {source}")]
    SourceDirUnreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF opened fine but has no pages to downsample.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Every unit failed; there is nothing to assemble.
    #[error("No {what} were processed successfully ({failed} failed)")]
    NoResults { what: &'static str, failed: usize },

    /// The assembled document could not be written to disk.
    #[error("Failed to save PDF '{path}': {detail}")]
    SaveFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfBatchError {
    /// Process exit code the CLI reports for this error.
    ///
    /// | Code | Meaning |
    /// |------|---------|
    /// | 2 | no input found |
    /// | 3 | no results produced |
    /// | 4 | save failed |
    /// | 1 | anything else |
    pub fn exit_code(&self) -> u8 {
        match self {
            PdfBatchError::NoImagesFound { .. }
            | PdfBatchError::FileNotFound { .. }
            | PdfBatchError::EmptyDocument { .. } => 2,
            PdfBatchError::NoResults { .. } => 3,
            PdfBatchError::SaveFailed { .. } => 4,
            _ => 1,
        }
    }
}

/// A non-fatal error for a single unit of work.
///
/// The batch continues without the failed unit; the error is logged and kept
/// in the run report.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// One source image could not be decoded, transformed or encoded.
    #[error("Image {file}: {detail}")]
    ImageFailed {
        index: usize,
        file: String,
        detail: String,
    },

    /// A single page failed to rasterise or encode; its chunk carried on.
    #[error("Page {page}: rasterisation failed: {detail}")]
    PageFailed { page: usize, detail: String },

    /// A whole chunk of pages was lost because one of its pages failed.
    #[error("Pages {start}-{end}: chunk dropped: {detail}")]
    ChunkFailed {
        start: usize,
        end: usize,
        detail: String,
    },

    /// The worker processing this unit panicked.
    #[error("Unit {unit}: worker crashed: {detail}")]
    WorkerCrashed { unit: usize, detail: String },

    /// A transformed page could not be inserted into the output document.
    #[error("Page {page}: insertion failed: {detail}")]
    PageInsertFailed { page: usize, detail: String },
}

impl UnitError {
    /// Number of source items this failure accounts for.
    ///
    /// A dropped chunk loses every page in its range; everything else is a
    /// single item.
    pub fn lost_items(&self) -> usize {
        match self {
            UnitError::ChunkFailed { start, end, .. } => end.saturating_sub(*start),
            _ => 1,
        }
    }

    /// Index of the first source item this failure covers.
    pub fn position(&self) -> usize {
        match self {
            UnitError::ImageFailed { index, .. } => *index,
            UnitError::PageFailed { page, .. } | UnitError::PageInsertFailed { page, .. } => *page,
            UnitError::ChunkFailed { start, .. } => *start,
            UnitError::WorkerCrashed { unit, .. } => *unit,
        }
    }
}
