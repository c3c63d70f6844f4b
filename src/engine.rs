//! pdfium binding and document opening.
//!
//! pdfium keeps process-global state: creating a [`Pdfium`] initialises the
//! library and dropping one tears it down for every thread. The process
//! therefore binds exactly once and every task borrows the same
//! `&'static Pdfium`. Documents opened from it are `!Send` and stay on the
//! thread that opened them.

use crate::error::PdfBatchError;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::debug;

static PDFIUM: OnceLock<Pdfium> = OnceLock::new();
static BIND_LOCK: Mutex<()> = Mutex::new(());

/// The process-wide pdfium instance, bound on first use.
///
/// The library is fetched into the cache if needed. A failed bind is not
/// remembered; the next call tries again.
pub fn bind() -> Result<&'static Pdfium, PdfBatchError> {
    if let Some(pdfium) = PDFIUM.get() {
        return Ok(pdfium);
    }

    // At most one Pdfium is ever created.
    let _guard = BIND_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(pdfium) = PDFIUM.get() {
        return Ok(pdfium);
    }
    let pdfium = pdfium_auto::bind_pdfium(None)
        .map_err(|e| PdfBatchError::PdfiumBindingFailed(e.to_string()))?;
    debug!("pdfium bound for this process");
    Ok(PDFIUM.get_or_init(|| pdfium))
}

/// Open `path`, classifying load failures.
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, PdfBatchError> {
    pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| classify_load_error(path, password.is_some(), format!("{:?}", e)))
}

fn classify_load_error(path: &Path, had_password: bool, detail: String) -> PdfBatchError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            PdfBatchError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            PdfBatchError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        PdfBatchError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

/// Number of pages in the PDF at `path`.
pub fn page_count(pdfium: &Pdfium, path: &Path, password: Option<&str>) -> Result<usize, PdfBatchError> {
    let document = open_document(pdfium, path, password)?;
    Ok(document.pages().len() as usize)
}
