//! PDF rasterisation: render a chunk of pages to JPEG.
//!
//! Each worker opens the document once per chunk from the shared pdfium
//! instance, then walks the chunk's pages in order. The walk itself is written
//! against [`PageSource`] so its failure handling is testable without a
//! pdfium library.

use crate::config::DownsampleConfig;
use crate::engine;
use crate::error::UnitError;
use crate::output::{TransformResult, UnitOutcome, UnitPayload, WorkUnit};
use crate::pipeline::encode;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

/// PDF user space is 72 points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// The subset of [`DownsampleConfig`] a worker needs.
#[derive(Debug, Clone)]
pub struct PageSettings {
    pub dpi: u32,
    pub quality: u8,
    pub isolate_page_failures: bool,
    pub password: Option<String>,
}

impl From<&DownsampleConfig> for PageSettings {
    fn from(c: &DownsampleConfig) -> Self {
        Self {
            dpi: c.dpi,
            quality: c.quality,
            isolate_page_failures: c.isolate_page_failures,
            password: c.password.clone(),
        }
    }
}

impl PageSettings {
    /// Pixels per PDF point.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / POINTS_PER_INCH
    }
}

/// Anything that can rasterise a page by 0-based index.
pub trait PageSource {
    fn render_page(&mut self, page: usize) -> Result<DynamicImage, String>;
}

/// Pages of an open pdfium document.
pub struct PdfiumPages<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl<'a> PdfiumPages<'a> {
    pub fn new(document: PdfDocument<'a>, settings: &PageSettings) -> Self {
        Self {
            document,
            render_config: PdfRenderConfig::new().scale_page_by_factor(settings.scale()),
        }
    }
}

impl PageSource for PdfiumPages<'_> {
    fn render_page(&mut self, page: usize) -> Result<DynamicImage, String> {
        let index = u16::try_from(page).map_err(|_| format!("page index {page} out of range"))?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| format!("{:?}", e))?;
        let bitmap = page
            .render_with_config(&self.render_config)
            .map_err(|e| format!("{:?}", e))?;
        Ok(DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8()))
    }
}

/// Render and encode every page in `pages`.
///
/// With `isolate_page_failures` a failing page is reported on its own and the
/// walk continues. Without it the first failure discards the whole chunk.
pub fn rasterize_range(
    source: &mut dyn PageSource,
    pages: Range<usize>,
    settings: &PageSettings,
) -> (Vec<TransformResult>, Vec<UnitError>) {
    let mut results = Vec::with_capacity(pages.len());
    let mut failures = Vec::new();

    for page in pages.clone() {
        let outcome = source.render_page(page).and_then(|img| {
            encode::encode_jpeg(&img, settings.quality)
                .map(|bytes| (bytes, img.width(), img.height()))
                .map_err(|e| format!("encode failed: {e}"))
        });

        match outcome {
            Ok((encoded, width, height)) => {
                debug!("Rendered page {} → {}x{} px", page + 1, width, height);
                results.push(TransformResult {
                    index: page,
                    encoded,
                    width,
                    height,
                    flags: None,
                });
            }
            Err(detail) if settings.isolate_page_failures => {
                warn!("Page {} failed: {}", page + 1, detail);
                failures.push(UnitError::PageFailed { page, detail });
            }
            Err(detail) => {
                warn!(
                    "Page {} failed, dropping pages {}-{}: {}",
                    page + 1,
                    pages.start + 1,
                    pages.end,
                    detail
                );
                return (
                    Vec::new(),
                    vec![UnitError::ChunkFailed {
                        start: pages.start,
                        end: pages.end,
                        detail,
                    }],
                );
            }
        }
    }

    (results, failures)
}

/// Worker entry point for the downsample pipeline.
///
/// Binding or opening failures lose the whole chunk.
pub fn transform_page_unit(unit: WorkUnit, pdf_path: &Path, settings: &PageSettings) -> UnitOutcome {
    let range = match unit.payload {
        UnitPayload::Pages(range) => range,
        UnitPayload::Image(ref path) => {
            return UnitOutcome::failure(
                unit.index,
                UnitError::ImageFailed {
                    index: unit.index,
                    file: path.display().to_string(),
                    detail: "image handed to the page rasteriser".into(),
                },
            )
        }
    };

    let chunk_failed = |detail: String| UnitError::ChunkFailed {
        start: range.start,
        end: range.end,
        detail,
    };

    let pdfium = match engine::bind() {
        Ok(p) => p,
        Err(e) => return UnitOutcome::failure(unit.index, chunk_failed(e.to_string())),
    };
    let document = match engine::open_document(pdfium, pdf_path, settings.password.as_deref()) {
        Ok(d) => d,
        Err(e) => return UnitOutcome::failure(unit.index, chunk_failed(e.to_string())),
    };

    let mut source = PdfiumPages::new(document, settings);
    let (results, failures) = rasterize_range(&mut source, range, settings);
    UnitOutcome {
        unit: unit.index,
        results,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_image;
    use std::collections::HashSet;

    /// Renders 100x140 pages, failing on the listed indices.
    struct FakePages {
        failing: HashSet<usize>,
        rendered: Vec<usize>,
    }

    impl FakePages {
        fn failing(pages: &[usize]) -> Self {
            Self {
                failing: pages.iter().copied().collect(),
                rendered: Vec::new(),
            }
        }
    }

    impl PageSource for FakePages {
        fn render_page(&mut self, page: usize) -> Result<DynamicImage, String> {
            self.rendered.push(page);
            if self.failing.contains(&page) {
                Err(format!("bad page {page}"))
            } else {
                Ok(solid_image(100, 140))
            }
        }
    }

    fn settings(isolate: bool) -> PageSettings {
        PageSettings {
            dpi: 60,
            quality: 30,
            isolate_page_failures: isolate,
            password: None,
        }
    }

    #[test]
    fn scale_from_dpi() {
        assert!((settings(true).scale() - 60.0 / 72.0).abs() < f32::EPSILON);
    }

    #[test]
    fn clean_chunk_renders_in_order() {
        let mut src = FakePages::failing(&[]);
        let (results, failures) = rasterize_range(&mut src, 5..9, &settings(true));
        assert!(failures.is_empty());
        assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), vec![5, 6, 7, 8]);
        assert!(results.iter().all(|r| r.width == 100 && r.height == 140 && r.flags.is_none()));
    }

    #[test]
    fn isolated_failure_keeps_the_rest_of_the_chunk() {
        let mut src = FakePages::failing(&[6]);
        let (results, failures) = rasterize_range(&mut src, 5..9, &settings(true));
        assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), vec![5, 7, 8]);
        assert_eq!(
            failures,
            vec![UnitError::PageFailed {
                page: 6,
                detail: "bad page 6".into()
            }]
        );
    }

    #[test]
    fn unisolated_failure_drops_the_chunk_and_stops() {
        let mut src = FakePages::failing(&[6]);
        let (results, failures) = rasterize_range(&mut src, 5..9, &settings(false));
        assert!(results.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].lost_items(), 4);
        assert_eq!(src.rendered, vec![5, 6]);
    }

    #[test]
    fn image_payload_is_rejected() {
        let outcome = transform_page_unit(
            WorkUnit {
                index: 0,
                payload: UnitPayload::Image("x.jpg".into()),
            },
            Path::new("doc.pdf"),
            &settings(true),
        );
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.failures.len(), 1);
    }
}
