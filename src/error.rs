//! Error types for the pdf2recipes library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RecipeExtractError`] is **fatal**: the run cannot proceed at all
//!   (bad input file, unreadable PDF, unwritable checkpoint, missing
//!   credential). Returned as `Err(RecipeExtractError)` from the top-level
//!   `run*` and `inspect` functions.
//!
//! * [`ChunkError`] halts the pipeline after one chunk: the external
//!   extraction service rejected or failed the request for that chunk.
//!   Prior progress stays checkpointed, so the failure is reported inside
//!   [`crate::output::RunStatus::Halted`] rather than as an `Err`, and a
//!   later invocation resumes from the last committed page.
//!
//! There is no retry tier: the service is called exactly once per chunk,
//! and a human re-invokes the process to resume after a halt.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2recipes library.
///
/// Per-chunk extraction failures use [`ChunkError`] and are reported in
/// [`crate::output::RunOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum RecipeExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path does not end in `.pdf`.
    #[error("File '{path}' is not a PDF file (expected a .pdf extension)")]
    WrongFileType { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Exporting a page window out of the source document failed.
    #[error("Failed to window pages {start}-{end}: {detail}")]
    WindowFailed {
        start: usize,
        end: usize,
        detail: String,
    },

    // ── Checkpoint errors ─────────────────────────────────────────────────
    /// Could not persist the progress checkpoint.
    ///
    /// Progress that cannot be recorded cannot be resumed, so a failed
    /// save aborts the run before the next chunk starts.
    #[error("Failed to write checkpoint '{path}': {source}")]
    CheckpointWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Service errors ────────────────────────────────────────────────────
    /// The required API credential is absent from the environment.
    #[error("{var} is not set.\nExport it or add it to a .env file in the working directory.")]
    CredentialMissing { var: String },

    /// A chunk failure surfaced through the streaming API.
    ///
    /// The eager API reports chunk failures inside
    /// [`crate::output::RunStatus::Halted`]; the stream has no outcome
    /// struct to carry them, so they arrive as the final `Err` item.
    #[error(transparent)]
    ChunkFailed(#[from] ChunkError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium in the working directory, or set PDFIUM_LIB_PATH to the\n\
directory containing an existing copy, or install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The extraction-service failure that halted a run.
///
/// Carried in [`crate::output::RunStatus::Halted`] together with the chunk
/// that triggered it. The checkpoint still reflects the last chunk that
/// committed before the halt.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ChunkError {
    /// Uploading the windowed artifact to the service failed.
    #[error("Pages {start}-{end}: upload failed: {detail}")]
    UploadFailed {
        start: usize,
        end: usize,
        detail: String,
    },

    /// The structured-completion request was rejected or errored.
    #[error("Pages {start}-{end}: extraction request failed: {detail}")]
    ApiError {
        start: usize,
        end: usize,
        detail: String,
    },

    /// The service answered with a body this client could not read.
    ///
    /// This is a transport-level failure (unparseable response envelope),
    /// not schema validation: a well-formed envelope whose payload text is
    /// malformed or empty still counts as success.
    #[error("Pages {start}-{end}: unreadable service response: {detail}")]
    InvalidResponse {
        start: usize,
        end: usize,
        detail: String,
    },
}

impl ChunkError {
    /// First page of the chunk the error belongs to.
    pub fn start_page(&self) -> usize {
        match self {
            ChunkError::UploadFailed { start, .. }
            | ChunkError::ApiError { start, .. }
            | ChunkError::InvalidResponse { start, .. } => *start,
        }
    }

    /// Last page of the chunk the error belongs to.
    pub fn end_page(&self) -> usize {
        match self {
            ChunkError::UploadFailed { end, .. }
            | ChunkError::ApiError { end, .. }
            | ChunkError::InvalidResponse { end, .. } => *end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_failed_display() {
        let e = RecipeExtractError::WindowFailed {
            start: 3,
            end: 4,
            detail: "page import error".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pages 3-4"), "got: {msg}");
    }

    #[test]
    fn credential_missing_names_the_variable() {
        let e = RecipeExtractError::CredentialMissing {
            var: "OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn chunk_error_carries_page_range() {
        let e = ChunkError::ApiError {
            start: 5,
            end: 6,
            detail: "quota exceeded".into(),
        };
        assert_eq!(e.start_page(), 5);
        assert_eq!(e.end_page(), 6);
        assert!(e.to_string().contains("Pages 5-6"));
        assert!(e.to_string().contains("quota exceeded"));
    }

    #[test]
    fn chunk_error_round_trips_through_json() {
        let e = ChunkError::UploadFailed {
            start: 1,
            end: 2,
            detail: "connection reset".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: ChunkError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start_page(), 1);
        assert_eq!(back.end_page(), 2);
    }
}
