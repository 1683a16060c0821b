//! Pipeline stages for chunked recipe extraction.
//!
//! Each submodule implements exactly one step. Keeping stages separate
//! makes each independently testable and lets us swap implementations
//! (a different windowing backend, a different extraction service)
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ window ──▶ extract
//! (path)   (pdfium)   (service)
//! ```
//!
//! 1. [`input`]   — validate the user-supplied source path up front
//! 2. [`window`]  — slice a page range into a standalone temp PDF; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`extract`] — upload the chunk and run the structured-completion
//!    round trip; the only stage with network I/O

pub mod extract;
pub mod input;
pub mod window;
