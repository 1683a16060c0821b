//! # pdf2recipes
//!
//! Extract structured recipe cards from PDF cookbooks using vision LLMs.
//!
//! ## Why this crate?
//!
//! Cookbook PDFs are layout-heavy — two-column ingredient tables, decorative
//! spreads, sidebars with allergen notes — and classic text extraction
//! (pdftotext, pdf-extract) scrambles quantities and step order. Instead this
//! crate slices the document into small page windows, uploads each window to a
//! vision model as-is, and asks for output conforming to a strict JSON recipe
//! schema, so every answer parses into the same [`RecipeCard`] shape.
//!
//! Cookbooks are long and APIs flake. Every finished window advances an
//! on-disk run log next to the source file, so a rerun after a crash or a
//! rate-limit storm resumes from the first unprocessed page instead of paying
//! for the whole book again.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve the local file, verify the %PDF magic
//!  ├─ 2. Run log  load <stem>_run_log.json, skip already-processed pages
//!  ├─ 3. Window   copy a page range into a temp PDF via pdfium
//!  ├─ 4. Extract  upload the window, request schema-constrained recipes
//!  └─ 5. Record   keep the raw chunk payload, advance the run log
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2recipes::{run, OpenAiExtractor, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads the API key from OPENAI_API_KEY
//!     let config = RunConfig::default();
//!     let extractor = OpenAiExtractor::from_env(&config)?;
//!     let outcome = run("cookbook.pdf", &extractor, &config).await?;
//!     for chunk in &outcome.chunks {
//!         println!("{}", chunk.raw);
//!     }
//!     eprintln!("pages: {} / chunks: {}",
//!         outcome.stats.pages_processed,
//!         outcome.stats.chunks_processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2recipes` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2recipes = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! Any model behind the Responses API that accepts file inputs works. Rough
//! guidance:
//!
//! | Model | Quality | Best for |
//! |-------|---------|----------|
//! | `gpt-4.1-mini` | ★★★★ | Default — reliable on dense ingredient tables |
//! | `gpt-4.1-nano` | ★★★ | Cheap first pass over very long books |
//! | `gpt-4.1`      | ★★★★★ | Scanned or handwritten-style cookbooks |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod recipe;
pub mod run;
pub mod service;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::{RunConfig, RunConfigBuilder, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{ChunkError, RecipeExtractError};
pub use output::{ChunkRecord, RunOutcome, RunStats, RunStatus, SourceInfo};
pub use pipeline::extract::{Extraction, StructuredExtractor};
pub use pipeline::window::{ChunkArtifact, PageWindower, PdfiumWindower};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use recipe::{recipe_card_schema, Ingredient, RecipeCard};
pub use run::{chunk_plan, inspect, inspect_with_windower, run, run_sync, run_with_windower};
pub use service::{OpenAiExtractor, API_KEY_VAR};
pub use stream::{run_stream, run_stream_with_windower, ChunkStream};
