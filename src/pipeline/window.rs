//! Page windowing: slice a page range into a standalone temporary PDF.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and must not be called from async contexts.
//! `tokio::task::spawn_blocking` moves document loading and page copying
//! onto the blocking thread pool so Tokio workers never stall on it.
//!
//! ## Why a real file on disk?
//!
//! The extraction service consumes an uploaded file, so the chunk has to
//! exist as bytes somewhere; writing it under a per-run temp directory
//! keeps peak memory flat for large scans and gives every artifact an
//! owner. [`ChunkArtifact`] holds a `TempPath`, so the file disappears on
//! drop even if the driver unwinds mid-chunk.

use crate::error::RecipeExtractError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::Path;
use tempfile::{TempDir, TempPath};
use tracing::debug;

/// Handle to one windowed chunk artifact on disk.
///
/// The underlying file is deleted when the handle drops; the driver also
/// removes it explicitly after every extraction attempt via
/// [`ChunkArtifact::remove`].
#[derive(Debug)]
pub struct ChunkArtifact {
    path: TempPath,
    start_page: usize,
    end_page: usize,
}

impl ChunkArtifact {
    /// Wrap an on-disk chunk file. The artifact takes ownership of the
    /// temp path and with it responsibility for deletion.
    pub fn new(path: TempPath, start_page: usize, end_page: usize) -> Self {
        Self {
            path,
            start_page,
            end_page,
        }
    }

    /// Location of the chunk file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First page of the windowed range (1-indexed, inclusive).
    pub fn start_page(&self) -> usize {
        self.start_page
    }

    /// Last page of the windowed range (inclusive).
    pub fn end_page(&self) -> usize {
        self.end_page
    }

    /// Delete the artifact now instead of waiting for drop.
    pub fn remove(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// Windowing backend: reports document size and produces chunk artifacts.
///
/// [`PdfiumWindower`] is the production implementation; tests drive the
/// pipeline with an in-memory fake.
#[async_trait]
pub trait PageWindower: Send + Sync {
    /// Total pages in the source document.
    async fn page_count(&self, source: &Path) -> Result<usize, RecipeExtractError>;

    /// Extract pages `[start_page, end_page]` (1-indexed, inclusive) into
    /// a standalone artifact. `end_page` past the document's last page is
    /// clamped; the source document is never modified.
    async fn extract_window(
        &self,
        source: &Path,
        start_page: usize,
        end_page: usize,
    ) -> Result<ChunkArtifact, RecipeExtractError>;
}

/// pdfium-backed windower. Chunk artifacts live in a per-run temp
/// directory that is removed when the windower drops.
pub struct PdfiumWindower {
    temp_dir: TempDir,
}

impl PdfiumWindower {
    pub fn new() -> Result<Self, RecipeExtractError> {
        let temp_dir = TempDir::new()
            .map_err(|e| RecipeExtractError::Internal(format!("Chunk temp dir: {e}")))?;
        Ok(Self { temp_dir })
    }
}

#[async_trait]
impl PageWindower for PdfiumWindower {
    async fn page_count(&self, source: &Path) -> Result<usize, RecipeExtractError> {
        let path = source.to_path_buf();
        tokio::task::spawn_blocking(move || page_count_blocking(&path))
            .await
            .map_err(|e| RecipeExtractError::Internal(format!("Page count task panicked: {e}")))?
    }

    async fn extract_window(
        &self,
        source: &Path,
        start_page: usize,
        end_page: usize,
    ) -> Result<ChunkArtifact, RecipeExtractError> {
        let path = source.to_path_buf();
        let dir = self.temp_dir.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            extract_window_blocking(&path, &dir, start_page, end_page)
        })
        .await
        .map_err(|e| RecipeExtractError::Internal(format!("Window task panicked: {e}")))?
    }
}

/// Bind pdfium, preferring a library shipped next to the executable over
/// the system one.
fn bind_pdfium() -> Result<Pdfium, RecipeExtractError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| RecipeExtractError::PdfiumBindingFailed(format!("{e:?}")))
}

fn page_count_blocking(source: &Path) -> Result<usize, RecipeExtractError> {
    let pdfium = bind_pdfium()?;
    let document = load_source(&pdfium, source)?;
    Ok(document.pages().len() as usize)
}

/// Blocking implementation of window extraction.
fn extract_window_blocking(
    source: &Path,
    dir: &Path,
    start_page: usize,
    end_page: usize,
) -> Result<ChunkArtifact, RecipeExtractError> {
    let pdfium = bind_pdfium()?;
    let document = load_source(&pdfium, source)?;
    let total = document.pages().len() as usize;

    let end_page = end_page.min(total);
    if start_page == 0 || start_page > end_page {
        return Err(RecipeExtractError::WindowFailed {
            start: start_page,
            end: end_page,
            detail: format!("page range out of bounds (document has {total} pages)"),
        });
    }

    let to_window_err = |detail: String| RecipeExtractError::WindowFailed {
        start: start_page,
        end: end_page,
        detail,
    };

    let mut chunk = pdfium
        .create_new_pdf()
        .map_err(|e| to_window_err(format!("{e:?}")))?;
    chunk
        .pages_mut()
        .copy_pages_from_document(&document, &format!("{start_page}-{end_page}"), 0)
        .map_err(|e| to_window_err(format!("{e:?}")))?;

    let file = tempfile::Builder::new()
        .prefix(&format!("chunk_{start_page}_{end_page}_"))
        .suffix(".pdf")
        .tempfile_in(dir)
        .map_err(|e| to_window_err(format!("temp file: {e}")))?;
    let temp_path = file.into_temp_path();

    chunk
        .save_to_file(&temp_path)
        .map_err(|e| to_window_err(format!("{e:?}")))?;

    debug!(
        "Windowed pages {}-{} → {}",
        start_page,
        end_page,
        temp_path.display()
    );

    Ok(ChunkArtifact::new(temp_path, start_page, end_page))
}

fn load_source<'a>(
    pdfium: &'a Pdfium,
    source: &Path,
) -> Result<PdfDocument<'a>, RecipeExtractError> {
    pdfium
        .load_pdf_from_file(source, None)
        .map_err(|e| RecipeExtractError::CorruptPdf {
            path: source.to_path_buf(),
            detail: format!("{e:?}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn artifact_for_test(start: usize, end: usize) -> (ChunkArtifact, PathBuf) {
        let file = NamedTempFile::new().unwrap();
        let on_disk = file.path().to_path_buf();
        std::fs::write(&on_disk, b"%PDF-1.4 stub").unwrap();
        (
            ChunkArtifact::new(file.into_temp_path(), start, end),
            on_disk,
        )
    }

    #[test]
    fn artifact_reports_its_range() {
        let (artifact, _) = artifact_for_test(3, 4);
        assert_eq!(artifact.start_page(), 3);
        assert_eq!(artifact.end_page(), 4);
    }

    #[test]
    fn remove_deletes_the_file() {
        let (artifact, on_disk) = artifact_for_test(1, 2);
        assert!(on_disk.exists());
        artifact.remove().unwrap();
        assert!(!on_disk.exists());
    }

    #[test]
    fn drop_deletes_the_file() {
        let (artifact, on_disk) = artifact_for_test(5, 5);
        assert!(on_disk.exists());
        drop(artifact);
        assert!(!on_disk.exists());
    }
}
