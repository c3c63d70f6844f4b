//! Input validation for the downsample pipeline.
//!
//! pdfium reports a missing file, a permission problem and a non-PDF all as
//! the same opaque load error. Checking up front gives each its own error
//! and exit code before any worker starts.

use crate::error::PdfBatchError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` is a readable file starting with `%PDF`.
pub fn resolve_local(path: &Path) -> Result<PathBuf, PdfBatchError> {
    let path = path.to_path_buf();

    if !path.is_file() {
        return Err(PdfBatchError::FileNotFound { path });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfBatchError::PermissionDenied { path });
        }
        Err(_) => return Err(PdfBatchError::FileNotFound { path }),
    };

    // A file shorter than four bytes leaves zeros in the tail.
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfBatchError::Internal(format!("read {}: {}", path.display(), e))),
        }
    }
    if &magic != b"%PDF" {
        return Err(PdfBatchError::NotAPdf { path, magic });
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn accepts_pdf_magic() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("doc.pdf");
        std::fs::write(&p, b"%PDF-1.4\n...").unwrap();
        assert_eq!(resolve_local(&p).unwrap(), p);
    }

    #[test]
    fn missing_file() {
        let err = resolve_local(Path::new("/no/such/file.pdf")).unwrap_err();
        assert!(matches!(err, PdfBatchError::FileNotFound { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            resolve_local(dir.path()),
            Err(PdfBatchError::FileNotFound { .. })
        ));
    }

    #[test]
    fn rejects_other_content() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("fake.pdf");
        std::fs::write(&p, b"\x89PNG\r\n").unwrap();
        match resolve_local(&p).unwrap_err() {
            PdfBatchError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_short_file() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("tiny.pdf");
        std::fs::write(&p, b"%P").unwrap();
        assert!(matches!(resolve_local(&p), Err(PdfBatchError::NotAPdf { .. })));
    }
}
