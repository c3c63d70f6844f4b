//! Pipeline entry points.
//!
//! Both pipelines follow the same five steps: partition the input, transform
//! units on a [`WorkerPool`], collect and reorder the outcomes, assemble the
//! output on one blocking thread, then save and read back. Only the first two
//! steps differ between them.
//!
//! Unit failures never abort a run; they come back in
//! [`ConversionReport::failures`]. The functions return `Err` only when no
//! usable output can be produced.

use crate::config::{downsampled_output_path, DownsampleConfig, ImageToPdfConfig};
use crate::engine;
use crate::error::{PdfBatchError, UnitError};
use crate::output::{
    ConversionReport, ConversionStats, OrderedResultSet, OutputSummary, UnitOutcome, UnitPayload,
    WorkUnit,
};
use crate::pipeline::assemble::{self, Assembly, PdfiumSink};
use crate::pipeline::collect::{Collected, Collector};
use crate::pipeline::render::{self, PageSettings};
use crate::pipeline::transform::{self, ImageSettings};
use crate::pipeline::{finalize, input, partition};
use crate::pool::WorkerPool;
use crate::progress::{self, ProgressCallback};
use futures::stream::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Assemble every image in `source_dir` into one PDF at `output`.
///
/// Images are taken in lexicographic path order, one per page, each page
/// sized to its transformed image.
///
/// # Errors
/// - [`PdfBatchError::NoImagesFound`]: nothing to convert
/// - [`PdfBatchError::NoResults`]: every image failed
/// - [`PdfBatchError::SaveFailed`]: the PDF could not be written
///
/// # Example
/// ```rust,no_run
/// use pdfbatch::{images_to_pdf, ImageToPdfConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = images_to_pdf("scans/", "book.pdf", &ImageToPdfConfig::default()).await?;
/// eprintln!("{} pages, {} failed", report.stats.pages_written, report.failures.len());
/// # Ok(())
/// # }
/// ```
pub async fn images_to_pdf(
    source_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ImageToPdfConfig,
) -> Result<ConversionReport, PdfBatchError> {
    let total_start = Instant::now();
    let source_dir = source_dir.as_ref();
    let output = output.as_ref().to_path_buf();
    let progress = progress::resolve(&config.progress_callback);
    info!("Collecting images from {}", source_dir.display());

    // ── Step 1: Partition ────────────────────────────────────────────────
    let units = partition::discover_images(source_dir)?;
    let total = units.len();
    info!("Found {} images, using {} workers", total, config.workers);
    progress.on_conversion_start(total);

    // ── Step 2–3: Transform + collect ────────────────────────────────────
    let transform_start = Instant::now();
    let pool = WorkerPool::new(config.workers);
    let collected = collect_images(units, ImageSettings::from(config), pool, progress.clone()).await;
    let transform_duration_ms = transform_start.elapsed().as_millis() as u64;

    let Collected {
        results,
        mut failures,
        tally,
    } = collected;

    if results.is_empty() {
        return Err(PdfBatchError::NoResults {
            what: "images",
            failed: total,
        });
    }
    info!(
        "Transformed {}/{} images in {}ms (EXIF {}, rotated {}, resized {})",
        results.len(),
        total,
        transform_duration_ms,
        tally.exif_corrected,
        tally.rotated,
        tally.resized
    );

    // ── Step 4–5: Assemble + finalize ────────────────────────────────────
    let assembly_start = Instant::now();
    let finished = assemble_and_save(results, output.clone(), progress.clone()).await?;
    failures.extend(finished.assembly.failures);

    let stats = ConversionStats {
        total_units: total,
        pages_written: finished.assembly.pages_written,
        failed_units: failures.iter().map(UnitError::lost_items).sum(),
        workers: pool.workers(),
        transform_duration_ms,
        assembly_duration_ms: assembly_start.elapsed().as_millis() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        input_size_bytes: None,
        output_size_bytes: finished.size,
    };
    progress.on_conversion_complete(total, stats.pages_written);

    Ok(ConversionReport {
        output_path: output,
        stats,
        tally,
        failures,
        summary: finished.summary,
    })
}

/// Re-render `input` at a lower resolution into a new PDF.
///
/// When `output` is `None` the result goes to `<stem>_dwn.pdf` beside the
/// input.
///
/// # Errors
/// - [`PdfBatchError::FileNotFound`], [`PdfBatchError::NotAPdf`],
///   [`PdfBatchError::EmptyDocument`]: nothing to downsample
/// - [`PdfBatchError::PasswordRequired`] / [`PdfBatchError::WrongPassword`]
/// - [`PdfBatchError::NoResults`]: every page failed
/// - [`PdfBatchError::SaveFailed`]
pub async fn downsample_pdf(
    input_path: impl AsRef<Path>,
    output: Option<&Path>,
    config: &DownsampleConfig,
) -> Result<ConversionReport, PdfBatchError> {
    let total_start = Instant::now();
    let progress = progress::resolve(&config.progress_callback);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let pdf_path = input::resolve_local(input_path.as_ref())?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| downsampled_output_path(&pdf_path));
    let input_size = std::fs::metadata(&pdf_path).map(|m| m.len()).ok();
    info!("Downsampling {} → {}", pdf_path.display(), output.display());

    // ── Step 2: Count pages and partition ────────────────────────────────
    let page_count = {
        let path = pdf_path.clone();
        let password = config.password.clone();
        tokio::task::spawn_blocking(move || -> Result<usize, PdfBatchError> {
            let pdfium = engine::bind()?;
            engine::page_count(pdfium, &path, password.as_deref())
        })
        .await
        .map_err(|e| PdfBatchError::Internal(format!("Page count task panicked: {}", e)))??
    };
    if page_count == 0 {
        return Err(PdfBatchError::EmptyDocument { path: pdf_path });
    }

    let units = partition::partition_pages(page_count, config.workers);
    info!(
        "PDF has {} pages; {} chunks at {} DPI, quality {}",
        page_count,
        units.len(),
        config.dpi,
        config.quality
    );
    progress.on_conversion_start(page_count);

    // ── Step 3–4: Transform + collect ────────────────────────────────────
    let transform_start = Instant::now();
    let pool = WorkerPool::new(config.workers);
    let collected = collect_pages(
        units,
        Arc::new(pdf_path),
        PageSettings::from(config),
        pool,
        progress.clone(),
    )
    .await;
    let transform_duration_ms = transform_start.elapsed().as_millis() as u64;

    let Collected {
        results,
        mut failures,
        tally,
    } = collected;

    if results.is_empty() {
        return Err(PdfBatchError::NoResults {
            what: "pages",
            failed: page_count,
        });
    }
    info!(
        "Rendered {}/{} pages in {}ms",
        results.len(),
        page_count,
        transform_duration_ms
    );

    // ── Step 5–6: Assemble + finalize ────────────────────────────────────
    let assembly_start = Instant::now();
    let finished = assemble_and_save(results, output.clone(), progress.clone()).await?;
    failures.extend(finished.assembly.failures);

    let stats = ConversionStats {
        total_units: page_count,
        pages_written: finished.assembly.pages_written,
        failed_units: failures.iter().map(UnitError::lost_items).sum(),
        workers: pool.workers(),
        transform_duration_ms,
        assembly_duration_ms: assembly_start.elapsed().as_millis() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        input_size_bytes: input_size,
        output_size_bytes: finished.size,
    };
    if let Some(pct) = stats.size_reduction_percent() {
        info!("Size reduction: {:.1}%", pct);
    }
    progress.on_conversion_complete(page_count, stats.pages_written);

    Ok(ConversionReport {
        output_path: output,
        stats,
        tally,
        failures,
        summary: finished.summary,
    })
}

/// Synchronous wrapper around [`images_to_pdf`].
///
/// Creates a temporary tokio runtime internally.
pub fn images_to_pdf_sync(
    source_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ImageToPdfConfig,
) -> Result<ConversionReport, PdfBatchError> {
    runtime()?.block_on(images_to_pdf(source_dir, output, config))
}

/// Synchronous wrapper around [`downsample_pdf`].
pub fn downsample_pdf_sync(
    input_path: impl AsRef<Path>,
    output: Option<&Path>,
    config: &DownsampleConfig,
) -> Result<ConversionReport, PdfBatchError> {
    runtime()?.block_on(downsample_pdf(input_path, output, config))
}

fn runtime() -> Result<tokio::runtime::Runtime, PdfBatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfBatchError::Internal(format!("Failed to create tokio runtime: {}", e)))
}

// ── Transform phases ─────────────────────────────────────────────────────

/// Transform image units on `pool` and collect them in original order.
///
/// Needs no pdfium library.
pub async fn collect_images(
    units: Vec<WorkUnit>,
    settings: ImageSettings,
    pool: WorkerPool,
    progress: ProgressCallback,
) -> Collected {
    let mut collector = Collector::new(units.len(), progress);
    let indices: Vec<usize> = units.iter().map(|u| u.index).collect();

    let task = move |unit: WorkUnit| transform::transform_image_unit(unit, &settings);
    let mut outcomes = std::pin::pin!(pool.map_unordered(units, task));
    while let Some((pos, joined)) = outcomes.next().await {
        collector.accept(joined.unwrap_or_else(|e| {
            let unit = indices[pos];
            UnitOutcome::failure(
                unit,
                UnitError::WorkerCrashed {
                    unit,
                    detail: e.to_string(),
                },
            )
        }));
    }
    collector.finish()
}

/// Rasterise page chunks on `pool` and collect them in page order.
async fn collect_pages(
    units: Vec<WorkUnit>,
    pdf_path: Arc<PathBuf>,
    settings: PageSettings,
    pool: WorkerPool,
    progress: ProgressCallback,
) -> Collected {
    let total_pages: usize = units.iter().map(WorkUnit::len).sum();
    let mut collector = Collector::new(total_pages, progress);
    let payloads: Vec<(usize, UnitPayload)> =
        units.iter().map(|u| (u.index, u.payload.clone())).collect();

    let task = move |unit: WorkUnit| render::transform_page_unit(unit, &pdf_path, &settings);
    let mut outcomes = std::pin::pin!(pool.map_unordered(units, task));
    while let Some((pos, joined)) = outcomes.next().await {
        collector.accept(joined.unwrap_or_else(|e| {
            let (unit, payload) = &payloads[pos];
            let detail = format!("worker crashed: {}", e);
            let failure = match payload {
                UnitPayload::Pages(r) => UnitError::ChunkFailed {
                    start: r.start,
                    end: r.end,
                    detail,
                },
                UnitPayload::Image(_) => UnitError::WorkerCrashed { unit: *unit, detail },
            };
            UnitOutcome::failure(*unit, failure)
        }));
    }
    collector.finish()
}

// ── Assembly + finalize ──────────────────────────────────────────────────

struct Finished {
    assembly: Assembly,
    size: u64,
    summary: Option<OutputSummary>,
}

/// Build, save and inspect the output document on one blocking thread.
///
/// pdfium documents are `!Send`, so all three steps share the thread that
/// created the document.
async fn assemble_and_save(
    results: OrderedResultSet,
    output: PathBuf,
    progress: ProgressCallback,
) -> Result<Finished, PdfBatchError> {
    tokio::task::spawn_blocking(move || -> Result<Finished, PdfBatchError> {
        let pdfium = engine::bind()?;
        let mut sink = PdfiumSink::new(pdfium)
            .map_err(|e| PdfBatchError::Internal(format!("create document: {:?}", e)))?;

        let assembly = assemble::assemble(&mut sink, results, &progress);
        if assembly.pages_written == 0 {
            return Err(PdfBatchError::NoResults {
                what: "pages",
                failed: assembly.failures.len(),
            });
        }

        let size = finalize::save_document(sink.document(), &output)?;
        drop(sink);

        let summary = match finalize::inspect_output(pdfium, &output) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Could not read back {}: {}", output.display(), e);
                None
            }
        };

        Ok(Finished {
            assembly,
            size,
            summary,
        })
    })
    .await
    .map_err(|e| PdfBatchError::Internal(format!("Assembly task panicked: {}", e)))?
}
