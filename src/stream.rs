//! Streaming extraction API: emit chunk records as they commit.
//!
//! ## Why stream?
//!
//! A long cookbook takes many minutes of service round trips. A
//! stream-based API lets callers hand each recipe batch to the next system
//! the moment its chunk commits instead of buffering the whole run.
//!
//! Processing stays strictly sequential and checkpointed exactly as in the
//! eager [`crate::run::run`]; only delivery changes. The stream ends after
//! the first `Err` item (a chunk failure or a fatal error), mirroring the
//! eager halt. The completed flag is written when the stream is polled to
//! its natural end; dropping the stream early leaves the checkpoint
//! resumable, never corrupt.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::RunConfig;
use crate::error::RecipeExtractError;
use crate::output::ChunkRecord;
use crate::pipeline::extract::{self, StructuredExtractor};
use crate::pipeline::input;
use crate::pipeline::window::{PageWindower, PdfiumWindower};
use crate::run::{chunk_plan, remove_artifact};
use futures::stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of committed chunk records.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChunkRecord, RecipeExtractError>> + Send>>;

struct StreamState {
    source: PathBuf,
    store: CheckpointStore,
    windower: Arc<dyn PageWindower>,
    extractor: Arc<dyn StructuredExtractor>,
    plan: std::vec::IntoIter<(usize, usize)>,
    total_pages: usize,
    done: bool,
}

/// Extract recipes chunk by chunk, yielding each record as it commits.
///
/// Chunks arrive strictly in page order. An already-completed document
/// yields an empty stream.
///
/// # Returns
/// - `Ok(ChunkStream)` — a stream of `Result<ChunkRecord, RecipeExtractError>`
/// - `Err(RecipeExtractError)` — fatal error before the first chunk
///   (file not found, not a PDF, unreadable document)
///
/// # Example
/// ```rust,no_run
/// use pdf2recipes::{run_stream, OpenAiExtractor, RunConfig};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RunConfig::default();
/// let extractor = Arc::new(OpenAiExtractor::from_env(&config)?);
/// let mut chunks = run_stream("cookbook.pdf", extractor, &config).await?;
/// while let Some(chunk) = chunks.next().await {
///     match chunk {
///         Ok(c) => println!("Pages {}-{}:\n{}", c.start_page, c.end_page, c.raw),
///         Err(e) => eprintln!("Stopped: {e}"),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_stream(
    input_str: impl AsRef<str>,
    extractor: Arc<dyn StructuredExtractor>,
    config: &RunConfig,
) -> Result<ChunkStream, RecipeExtractError> {
    let windower = PdfiumWindower::new()?;
    run_stream_with_windower(input_str, extractor, Arc::new(windower), config).await
}

/// [`run_stream`] with an explicit windowing backend.
pub async fn run_stream_with_windower(
    input_str: impl AsRef<str>,
    extractor: Arc<dyn StructuredExtractor>,
    windower: Arc<dyn PageWindower>,
    config: &RunConfig,
) -> Result<ChunkStream, RecipeExtractError> {
    let input_str = input_str.as_ref();
    info!("Starting streaming extraction: {}", input_str);

    // ── Resolve input and checkpoint ─────────────────────────────────────
    let source = input::resolve_source(input_str)?;
    let store = CheckpointStore::for_source(&source, config.checkpoint_dir.as_deref());
    let checkpoint = store.load();

    if checkpoint.completed {
        info!(
            "{} has already been completely processed",
            source.display()
        );
        return Ok(Box::pin(stream::empty()));
    }

    // ── Count pages and plan ─────────────────────────────────────────────
    let total_pages = windower.page_count(&source).await?;

    if checkpoint.last_processed_page >= total_pages {
        store.save(&Checkpoint {
            last_processed_page: total_pages,
            completed: true,
        })?;
        return Ok(Box::pin(stream::empty()));
    }

    let plan = chunk_plan(total_pages, checkpoint.last_processed_page, config.pages_per_chunk);

    // ── Unfold the sequential loop into a stream ─────────────────────────
    let state = StreamState {
        source,
        store,
        windower,
        extractor,
        plan: plan.into_iter(),
        total_pages,
        done: false,
    };

    let s = stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        match st.plan.next() {
            Some((start_page, end_page)) => {
                let item = next_chunk(&st, start_page, end_page).await;
                if item.is_err() {
                    st.done = true;
                }
                Some((item, st))
            }
            None => {
                // Every chunk committed; persist the completed flag.
                st.done = true;
                let final_checkpoint = Checkpoint {
                    last_processed_page: st.total_pages,
                    completed: true,
                };
                match st.store.save(&final_checkpoint) {
                    Ok(()) => None,
                    Err(e) => Some((Err(e), st)),
                }
            }
        }
    });

    Ok(Box::pin(s))
}

/// Window, extract, and checkpoint one chunk.
async fn next_chunk(
    st: &StreamState,
    start_page: usize,
    end_page: usize,
) -> Result<ChunkRecord, RecipeExtractError> {
    let chunk_start = Instant::now();

    let artifact = st
        .windower
        .extract_window(&st.source, start_page, end_page)
        .await?;
    let (result, _elapsed_ms) = extract::extract_chunk(st.extractor.as_ref(), &artifact).await;
    remove_artifact(artifact);
    let extraction = result?;

    st.store.save(&Checkpoint {
        last_processed_page: end_page,
        completed: false,
    })?;

    Ok(ChunkRecord {
        start_page,
        end_page,
        raw: extraction.raw,
        input_tokens: extraction.input_tokens,
        output_tokens: extraction.output_tokens,
        duration_ms: chunk_start.elapsed().as_millis() as u64,
    })
}
