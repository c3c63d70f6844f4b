//! Sequential document assembly.
//!
//! One page per result, in ascending index order, each exactly as large as
//! its image in PDF points. A page that cannot be inserted is reported and
//! skipped; the rest of the document is still built.

use crate::error::UnitError;
use crate::output::{OrderedResultSet, TransformResult};
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::{debug, info, warn};

/// Log a progress line every this many pages.
const LOG_EVERY: usize = 50;

/// Destination for assembled pages.
pub trait PageSink {
    /// Append one page showing `page`'s JPEG over its full area.
    fn add_page(&mut self, page: TransformResult) -> Result<(), String>;
}

/// Outcome of the assembly phase.
#[derive(Debug, Default)]
pub struct Assembly {
    pub pages_written: usize,
    pub failures: Vec<UnitError>,
}

/// Write every result into `sink` in order.
pub fn assemble(
    sink: &mut dyn PageSink,
    results: OrderedResultSet,
    progress: &ProgressCallback,
) -> Assembly {
    let total = results.len();
    progress.on_assembly_start(total);
    info!("Assembling {} pages", total);

    let mut assembly = Assembly::default();
    for result in results.into_vec() {
        let index = result.index;
        match sink.add_page(result) {
            Ok(()) => {
                assembly.pages_written += 1;
                progress.on_page_written(assembly.pages_written, total);
                if assembly.pages_written % LOG_EVERY == 0 {
                    info!("Written {}/{} pages", assembly.pages_written, total);
                }
            }
            Err(detail) => {
                warn!("Could not insert page for item {}: {}", index, detail);
                assembly
                    .failures
                    .push(UnitError::PageInsertFailed { page: index, detail });
            }
        }
    }
    assembly
}

/// A new pdfium document being filled page by page.
pub struct PdfiumSink<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumSink<'a> {
    pub fn new(pdfium: &'a Pdfium) -> Result<Self, PdfiumError> {
        Ok(Self {
            document: pdfium.create_new_pdf()?,
        })
    }

    pub fn document(&self) -> &PdfDocument<'a> {
        &self.document
    }

    fn try_add(&mut self, page: TransformResult) -> Result<(), PdfiumError> {
        let width = PdfPoints::new(page.width as f32);
        let height = PdfPoints::new(page.height as f32);

        // Decode first so a bad JPEG never leaves an empty page behind.
        let mut object =
            PdfPageImageObject::new_from_jpeg_reader(&self.document, Cursor::new(page.encoded))?;
        object.scale(width.value, height.value)?;

        let pdf_page = self
            .document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(width, height))?;
        fill_or_remove(
            pdf_page,
            |p| p.objects_mut().add_object(PdfPageObject::Image(object)).map(|_| ()),
            |p| p.delete(),
        )?;

        debug!("Added page {} ({}x{} pt)", page.index, page.width, page.height);
        Ok(())
    }
}

/// Run `fill` on a freshly created `page`; on failure hand the page to
/// `remove` so no blank page is left behind.
fn fill_or_remove<P, E: std::fmt::Debug>(
    mut page: P,
    fill: impl FnOnce(&mut P) -> Result<(), E>,
    remove: impl FnOnce(P) -> Result<(), E>,
) -> Result<(), E> {
    match fill(&mut page) {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(cleanup) = remove(page) {
                warn!("Could not remove half-built page: {:?}", cleanup);
            }
            Err(e)
        }
    }
}

impl PageSink for PdfiumSink<'_> {
    fn add_page(&mut self, page: TransformResult) -> Result<(), String> {
        self.try_add(page).map_err(|e| format!("{:?}", e))
    }
}
