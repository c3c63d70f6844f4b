//! Configuration types for both pipelines.
//!
//! Every knob lives in an explicit [`ImageToPdfConfig`] or
//! [`DownsampleConfig`] value handed to the pipeline entry points in
//! [`crate::convert`]. Nothing is read from globals.
//!
//! Both configs come with documented defaults and a builder whose `build()`
//! validates the combination.

use crate::error::PdfBatchError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Upper bound on PDF rasterisation workers.
///
/// Each worker holds one full-page raster plus an open document; past eight
/// workers peak memory grows faster than throughput.
pub const MAX_PDF_WORKERS: usize = 8;

/// Suffix appended to the input file stem to name the downsampled output.
pub const DOWNSAMPLE_SUFFIX: &str = "_dwn";

/// Number of workers for the image pipeline: every available core.
pub fn default_image_workers() -> usize {
    num_cpus::get().max(1)
}

/// Number of workers for the PDF pipeline: available cores, capped at
/// [`MAX_PDF_WORKERS`].
pub fn default_pdf_workers() -> usize {
    num_cpus::get().clamp(1, MAX_PDF_WORKERS)
}

/// Default output path for a downsampled PDF: `<stem>_dwn.pdf` beside the input.
///
/// ```rust
/// use pdfbatch::config::downsampled_output_path;
/// use std::path::Path;
///
/// assert_eq!(
///     downsampled_output_path(Path::new("scans/book.pdf")),
///     Path::new("scans/book_dwn.pdf")
/// );
/// ```
pub fn downsampled_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{DOWNSAMPLE_SUFFIX}.pdf"))
}

// ── Rotation ─────────────────────────────────────────────────────────────

/// Rotation applied to landscape images when forced-portrait mode is on.
///
/// Angles follow the mathematical convention: positive degrees turn the
/// image counter-clockwise, negative degrees turn it clockwise. The canvas
/// always grows to fit, so nothing is cropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum RotationAngle {
    /// −90°: a quarter turn clockwise. (default)
    #[default]
    Clockwise90,
    /// 90°: a quarter turn counter-clockwise.
    CounterClockwise90,
    /// 180°: upside down. Leaves landscape images landscape.
    Half,
    /// 270°: three quarters counter-clockwise, i.e. a quarter turn clockwise.
    CounterClockwise270,
}

impl RotationAngle {
    /// The angle in degrees, as a user would type it.
    pub fn degrees(self) -> i32 {
        match self {
            RotationAngle::Clockwise90 => -90,
            RotationAngle::CounterClockwise90 => 90,
            RotationAngle::Half => 180,
            RotationAngle::CounterClockwise270 => 270,
        }
    }
}

impl From<RotationAngle> for i32 {
    fn from(angle: RotationAngle) -> Self {
        angle.degrees()
    }
}

impl TryFrom<i32> for RotationAngle {
    type Error = PdfBatchError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            -90 => Ok(RotationAngle::Clockwise90),
            90 => Ok(RotationAngle::CounterClockwise90),
            180 => Ok(RotationAngle::Half),
            270 => Ok(RotationAngle::CounterClockwise270),
            other => Err(PdfBatchError::InvalidConfig(format!(
                "rotation angle must be one of -90, 90, 180, 270 (got {other})"
            ))),
        }
    }
}

impl fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self {
            RotationAngle::Clockwise90 | RotationAngle::CounterClockwise270 => "clockwise",
            RotationAngle::CounterClockwise90 => "counter-clockwise",
            RotationAngle::Half => "half turn",
        };
        write!(f, "{}° ({direction})", self.degrees())
    }
}

// ── Images → PDF ─────────────────────────────────────────────────────────

/// Configuration for assembling a folder of images into one PDF.
///
/// # Example
/// ```rust
/// use pdfbatch::ImageToPdfConfig;
///
/// let config = ImageToPdfConfig::builder()
///     .max_size(1000, 1400)
///     .quality(80)
///     .force_portrait(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_width, 1000);
/// ```
#[derive(Clone)]
pub struct ImageToPdfConfig {
    /// Maximum output width in pixels. Default: 1200.
    pub max_width: u32,

    /// Maximum output height in pixels. Default: 1600.
    ///
    /// Taller than wide because most pages end up portrait.
    pub max_height: u32,

    /// JPEG quality, 1–100. Default: 85.
    pub quality: u8,

    /// Rotate every landscape image so it ends up portrait. Default: true.
    pub force_portrait: bool,

    /// Rotation used by `force_portrait`. Default: −90° (clockwise).
    ///
    /// If pages come out upside down, try [`RotationAngle::CounterClockwise90`].
    pub rotation: RotationAngle,

    /// Worker count for the transform phase. Default: all cores.
    pub workers: usize,

    /// Receives per-unit and per-page events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ImageToPdfConfig {
    fn default() -> Self {
        Self {
            max_width: 1200,
            max_height: 1600,
            quality: 85,
            force_portrait: true,
            rotation: RotationAngle::default(),
            workers: default_image_workers(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ImageToPdfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageToPdfConfig")
            .field("max_width", &self.max_width)
            .field("max_height", &self.max_height)
            .field("quality", &self.quality)
            .field("force_portrait", &self.force_portrait)
            .field("rotation", &self.rotation)
            .field("workers", &self.workers)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ImageToPdfConfig {
    /// Create a new builder for `ImageToPdfConfig`.
    pub fn builder() -> ImageToPdfConfigBuilder {
        ImageToPdfConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ImageToPdfConfig`].
#[derive(Debug)]
pub struct ImageToPdfConfigBuilder {
    config: ImageToPdfConfig,
}

impl ImageToPdfConfigBuilder {
    pub fn max_width(mut self, px: u32) -> Self {
        self.config.max_width = px;
        self
    }

    pub fn max_height(mut self, px: u32) -> Self {
        self.config.max_height = px;
        self
    }

    pub fn max_size(self, width: u32, height: u32) -> Self {
        self.max_width(width).max_height(height)
    }

    /// JPEG quality; 0 is raised to 1 and anything above 100 lowered to 100.
    pub fn quality(mut self, q: u8) -> Self {
        self.config.quality = q.clamp(1, 100);
        self
    }

    pub fn force_portrait(mut self, v: bool) -> Self {
        self.config.force_portrait = v;
        self
    }

    pub fn rotation(mut self, angle: RotationAngle) -> Self {
        self.config.rotation = angle;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ImageToPdfConfig, PdfBatchError> {
        let c = &self.config;
        if c.max_width == 0 || c.max_height == 0 {
            return Err(PdfBatchError::InvalidConfig(format!(
                "maximum size must be positive, got {}x{}",
                c.max_width, c.max_height
            )));
        }
        if c.workers == 0 {
            return Err(PdfBatchError::InvalidConfig("Workers must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── PDF downsample ───────────────────────────────────────────────────────

/// Configuration for re-rendering a PDF at a lower resolution.
#[derive(Clone)]
pub struct DownsampleConfig {
    /// Rasterisation DPI. Default: 60.
    ///
    /// 72 DPI maps one PDF point to one pixel; anything lower shrinks pages.
    pub dpi: u32,

    /// JPEG quality, 1–100. Default: 30.
    pub quality: u8,

    /// Worker count, capped at [`MAX_PDF_WORKERS`]. Default: `min(cores, 8)`.
    pub workers: usize,

    /// Keep the rest of a chunk when one of its pages fails. Default: true.
    ///
    /// With `false` a single bad page drops every page of its chunk.
    pub isolate_page_failures: bool,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives per-unit and per-page events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DownsampleConfig {
    fn default() -> Self {
        Self {
            dpi: 60,
            quality: 30,
            workers: default_pdf_workers(),
            isolate_page_failures: true,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DownsampleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownsampleConfig")
            .field("dpi", &self.dpi)
            .field("quality", &self.quality)
            .field("workers", &self.workers)
            .field("isolate_page_failures", &self.isolate_page_failures)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl DownsampleConfig {
    /// Create a new builder for `DownsampleConfig`.
    pub fn builder() -> DownsampleConfigBuilder {
        DownsampleConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DownsampleConfig`].
#[derive(Debug)]
pub struct DownsampleConfigBuilder {
    config: DownsampleConfig,
}

impl DownsampleConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    /// JPEG quality; 0 is raised to 1 and anything above 100 lowered to 100.
    pub fn quality(mut self, q: u8) -> Self {
        self.config.quality = q.clamp(1, 100);
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.clamp(1, MAX_PDF_WORKERS);
        self
    }

    pub fn isolate_page_failures(mut self, v: bool) -> Self {
        self.config.isolate_page_failures = v;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DownsampleConfig, PdfBatchError> {
        let c = &self.config;
        if c.dpi == 0 || c.dpi > 1200 {
            return Err(PdfBatchError::InvalidConfig(format!(
                "DPI must be 1–1200, got {}",
                c.dpi
            )));
        }
        if c.workers == 0 || c.workers > MAX_PDF_WORKERS {
            return Err(PdfBatchError::InvalidConfig(format!(
                "Workers must be 1–{MAX_PDF_WORKERS}, got {}",
                c.workers
            )));
        }
        Ok(self.config)
    }
}
