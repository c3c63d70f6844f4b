//! Data model shared by both pipelines, plus the run report.

use crate::config::RotationAngle;
use crate::error::UnitError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::PathBuf;

// ── Work units ───────────────────────────────────────────────────────────

/// What one unit of work covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitPayload {
    /// One source image file.
    Image(PathBuf),
    /// A contiguous half-open range of 0-based page indices.
    Pages(Range<usize>),
}

/// One independently processable piece of the input.
///
/// `index` is the unit's position in the original input order. For page
/// chunks the results carry page indices instead, so `index` only orders
/// the chunks themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub index: usize,
    pub payload: UnitPayload,
}

impl WorkUnit {
    /// Number of output pages this unit can produce at most.
    pub fn len(&self) -> usize {
        match &self.payload {
            UnitPayload::Image(_) => 1,
            UnitPayload::Pages(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Results ──────────────────────────────────────────────────────────────

/// What the image transformer did to one image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFlags {
    /// Rotated by the forced-portrait rule.
    pub rotated: bool,
    /// Downscaled to fit the maximum size.
    pub resized: bool,
    /// Angle used when `rotated` is set.
    pub rotation_angle: Option<RotationAngle>,
    /// Turned upright according to its EXIF orientation tag.
    pub exif_corrected: bool,
}

/// A transformed page ready for assembly.
#[derive(Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Original 0-based index: image position or PDF page number.
    pub index: usize,
    /// JPEG-encoded bytes.
    pub encoded: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// `None` for rasterised PDF pages.
    pub flags: Option<ImageFlags>,
}

impl std::fmt::Debug for TransformResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformResult")
            .field("index", &self.index)
            .field("encoded", &format_args!("<{} bytes>", self.encoded.len()))
            .field("width", &self.width)
            .field("height", &self.height)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Everything a worker hands back for one unit.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub unit: usize,
    pub results: Vec<TransformResult>,
    pub failures: Vec<UnitError>,
}

impl UnitOutcome {
    pub fn success(unit: usize, result: TransformResult) -> Self {
        Self {
            unit,
            results: vec![result],
            failures: Vec::new(),
        }
    }

    pub fn failure(unit: usize, error: UnitError) -> Self {
        Self {
            unit,
            results: Vec::new(),
            failures: vec![error],
        }
    }
}

/// Counters accumulated by the collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformTally {
    pub exif_corrected: usize,
    pub rotated: usize,
    pub resized: usize,
    /// Distinct angles used for forced-portrait rotation, in degrees.
    pub rotation_angles: BTreeSet<i32>,
}

impl TransformTally {
    pub fn record(&mut self, flags: &ImageFlags) {
        if flags.exif_corrected {
            self.exif_corrected += 1;
        }
        if flags.rotated {
            self.rotated += 1;
            if let Some(angle) = flags.rotation_angle {
                self.rotation_angles.insert(angle.degrees());
            }
        }
        if flags.resized {
            self.resized += 1;
        }
    }
}

/// Successful results sorted by ascending original index.
///
/// Only the collector builds one, so the ordering and uniqueness hold for
/// every instance.
#[derive(Debug, Clone, Default)]
pub struct OrderedResultSet {
    results: Vec<TransformResult>,
}

impl OrderedResultSet {
    /// Sort `results` by index. Later duplicates of an index are dropped.
    pub(crate) fn from_unsorted(mut results: Vec<TransformResult>) -> Self {
        results.sort_by_key(|r| r.index);
        results.dedup_by_key(|r| r.index);
        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransformResult> {
        self.results.iter()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.results.iter().map(|r| r.index).collect()
    }

    pub fn into_vec(self) -> Vec<TransformResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a OrderedResultSet {
    type Item = &'a TransformResult;
    type IntoIter = std::slice::Iter<'a, TransformResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

// ── Output inspection ────────────────────────────────────────────────────

/// Size of one page of the saved document, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub width: f32,
    pub height: f32,
}

impl PageRecord {
    /// Strictly taller than wide. Square pages count as landscape.
    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

/// Statistics read back from the saved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSummary {
    pub page_count: usize,
    pub portrait_pages: usize,
    pub landscape_pages: usize,
    pub page_sizes: Vec<PageRecord>,
    pub file_size_bytes: u64,
}

impl OutputSummary {
    pub fn from_pages(page_sizes: Vec<PageRecord>, file_size_bytes: u64) -> Self {
        let portrait_pages = page_sizes.iter().filter(|p| p.is_portrait()).count();
        Self {
            page_count: page_sizes.len(),
            portrait_pages,
            landscape_pages: page_sizes.len() - portrait_pages,
            page_sizes,
            file_size_bytes,
        }
    }

    /// Mean bytes per page, or 0 for an empty document.
    pub fn avg_page_bytes(&self) -> u64 {
        if self.page_count == 0 {
            0
        } else {
            self.file_size_bytes / self.page_count as u64
        }
    }

    pub fn all_portrait(&self) -> bool {
        self.landscape_pages == 0
    }
}

// ── Report ───────────────────────────────────────────────────────────────

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Images found, or pages in the source PDF.
    pub total_units: usize,
    /// Pages written to the output.
    pub pages_written: usize,
    /// Items lost to unit failures or insertion failures.
    pub failed_units: usize,
    pub workers: usize,
    pub transform_duration_ms: u64,
    pub assembly_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Size of the source PDF; `None` for the image pipeline.
    pub input_size_bytes: Option<u64>,
    pub output_size_bytes: u64,
}

impl ConversionStats {
    /// Output size relative to input, as a percentage saved.
    ///
    /// `None` when there is no input size to compare against.
    pub fn size_reduction_percent(&self) -> Option<f64> {
        let input = self.input_size_bytes.filter(|&n| n > 0)?;
        Some((1.0 - self.output_size_bytes as f64 / input as f64) * 100.0)
    }
}

/// The result of one pipeline run.
///
/// Returned even when some units failed. Those are listed in `failures`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    pub stats: ConversionStats,
    /// Only meaningful for the image pipeline.
    pub tally: TransformTally,
    pub failures: Vec<UnitError>,
    /// Read back from the saved file; `None` if that failed.
    pub summary: Option<OutputSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize) -> TransformResult {
        TransformResult {
            index,
            encoded: vec![index as u8],
            width: 10,
            height: 20,
            flags: None,
        }
    }

    #[test]
    fn ordered_set_sorts_and_dedups() {
        let set = OrderedResultSet::from_unsorted(vec![result(4), result(1), result(4), result(0)]);
        assert_eq!(set.indices(), vec![0, 1, 4]);
    }

    #[test]
    fn tally_records_angles_only_when_rotated() {
        let mut tally = TransformTally::default();
        tally.record(&ImageFlags {
            rotated: true,
            resized: true,
            rotation_angle: Some(RotationAngle::Clockwise90),
            exif_corrected: false,
        });
        tally.record(&ImageFlags {
            exif_corrected: true,
            ..ImageFlags::default()
        });
        assert_eq!(tally.rotated, 1);
        assert_eq!(tally.resized, 1);
        assert_eq!(tally.exif_corrected, 1);
        assert_eq!(tally.rotation_angles.iter().copied().collect::<Vec<_>>(), vec![-90]);
    }

    #[test]
    fn summary_counts_squares_as_landscape() {
        let summary = OutputSummary::from_pages(
            vec![
                PageRecord { width: 100.0, height: 200.0 },
                PageRecord { width: 150.0, height: 150.0 },
                PageRecord { width: 300.0, height: 100.0 },
            ],
            3000,
        );
        assert_eq!(summary.portrait_pages, 1);
        assert_eq!(summary.landscape_pages, 2);
        assert_eq!(summary.avg_page_bytes(), 1000);
        assert!(!summary.all_portrait());
    }

    #[test]
    fn size_reduction() {
        let stats = ConversionStats {
            input_size_bytes: Some(1000),
            output_size_bytes: 250,
            ..Default::default()
        };
        let pct = stats.size_reduction_percent().unwrap();
        assert!((pct - 75.0).abs() < 1e-9);
        assert!(ConversionStats::default().size_reduction_percent().is_none());
    }

    #[test]
    fn work_unit_len() {
        let chunk = WorkUnit {
            index: 0,
            payload: UnitPayload::Pages(5..10),
        };
        assert_eq!(chunk.len(), 5);
        let img = WorkUnit {
            index: 3,
            payload: UnitPayload::Image(PathBuf::from("a.jpg")),
        };
        assert_eq!(img.len(), 1);
    }
}
