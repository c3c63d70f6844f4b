//! # pdfbatch
//!
//! Two batch jobs around PDF pages:
//!
//! - **images → PDF**: turn a folder of scans or photos into one PDF, one
//!   page per image, with EXIF-aware orientation, optional forced-portrait
//!   rotation and downscaling to a maximum size.
//! - **PDF downsample**: re-render an existing PDF at a lower DPI and JPEG
//!   quality into a smaller copy.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input
//!  │
//!  ├─ 1. Partition  list images / split pages into chunks
//!  ├─ 2. Transform  decode, orient, scale, JPEG-encode (worker pool)
//!  ├─ 3. Collect    drop failures, reorder by original index
//!  ├─ 4. Assemble   one page per result, page size = image size
//!  └─ 5. Finalize   atomic save + read-back summary
//! ```
//!
//! Page order in the output always follows input order, whichever worker
//! finishes first. A failed image or page is logged, reported in
//! [`ConversionReport::failures`] and skipped; the run only fails when
//! nothing at all could be produced.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfbatch::{downsample_pdf, DownsampleConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DownsampleConfig::builder().dpi(72).quality(40).build()?;
//!     let report = downsample_pdf("report.pdf", None, &config).await?;
//!     eprintln!(
//!         "{} pages → {}",
//!         report.stats.pages_written,
//!         report.output_path.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfbatch` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## PDFium
//!
//! Rasterising and writing PDFs goes through pdfium. The library is found via
//! `PDFIUM_LIB_PATH` or downloaded once into a per-user cache by the
//! `pdfium-auto` crate.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod progress;

#[cfg(test)]
mod test_helpers;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    DownsampleConfig, DownsampleConfigBuilder, ImageToPdfConfig, ImageToPdfConfigBuilder,
    RotationAngle,
};
pub use convert::{downsample_pdf, downsample_pdf_sync, images_to_pdf, images_to_pdf_sync};
pub use error::{PdfBatchError, UnitError};
pub use output::{ConversionReport, ConversionStats, OutputSummary, PageRecord, TransformTally};
pub use pool::WorkerPool;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
