//! Input resolution: validate a user-supplied path before the pipeline starts.
//!
//! Validation is deliberately front-loaded. pdfium reports unhelpful
//! generic errors for non-PDF input, so we check the `.pdf` extension and
//! the `%PDF` magic bytes here and hand callers a precise error instead of
//! a pdfium load failure three stages later.

use crate::error::RecipeExtractError;
use std::path::PathBuf;
use tracing::debug;

/// Validate the source path and return it as an owned `PathBuf`.
///
/// Rejects paths that do not exist, do not end in `.pdf` (any case), or
/// whose first four bytes are not the PDF magic.
pub fn resolve_source(input: &str) -> Result<PathBuf, RecipeExtractError> {
    let path = PathBuf::from(input);

    if !path.exists() {
        return Err(RecipeExtractError::FileNotFound { path });
    }

    let is_pdf_ext = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf_ext {
        return Err(RecipeExtractError::WrongFileType { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(RecipeExtractError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RecipeExtractError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(RecipeExtractError::FileNotFound { path });
        }
    }

    debug!("Resolved source PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(dir: &std::path::Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn rejects_a_missing_file() {
        let err = resolve_source("definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, RecipeExtractError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_a_non_pdf_extension() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "notes.txt", b"%PDF-1.7");
        let err = resolve_source(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, RecipeExtractError::WrongFileType { .. }));
    }

    #[test]
    fn rejects_a_file_without_pdf_magic() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "fake.pdf", b"MZPE rest of some binary");
        let err = resolve_source(path.to_str().unwrap()).unwrap_err();
        match err {
            RecipeExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"MZPE"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_pdf_regardless_of_extension_case() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "MENU.PDF", b"%PDF-1.4\n%rest");
        let resolved = resolve_source(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved, path);
    }
}
