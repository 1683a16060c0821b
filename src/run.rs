//! Eager (whole-run) extraction entry points.
//!
//! The functions here drive the pipeline to its terminal state and return
//! a single [`RunOutcome`]. Use [`crate::stream::run_stream`] instead when
//! you want each chunk as it commits, e.g. to pipe recipes into another
//! system while a long scan is still being processed.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::RunConfig;
use crate::error::RecipeExtractError;
use crate::output::{ChunkRecord, RunOutcome, RunStats, RunStatus, SourceInfo};
use crate::pipeline::extract::{self, StructuredExtractor};
use crate::pipeline::input;
use crate::pipeline::window::{ChunkArtifact, PageWindower, PdfiumWindower};
use std::time::Instant;
use tracing::{info, warn};

/// Extract recipes from a PDF, resuming from any previous checkpoint.
///
/// This is the primary entry point for the library. The document is
/// processed in fixed-size page chunks; each committed chunk advances the
/// checkpoint, so an interrupted or halted run picks up where it stopped.
///
/// # Arguments
/// * `input_str` — Path to the source PDF
/// * `extractor` — Structured-extraction backend (see
///   [`crate::service::OpenAiExtractor`])
/// * `config`    — Run configuration
///
/// # Returns
/// `Ok(RunOutcome)` when the run reaches a terminal state, including a
/// halt on chunk failure (check `outcome.status`).
///
/// # Errors
/// Returns `Err(RecipeExtractError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Source document unreadable during windowing
/// - Checkpoint file unwritable
///
/// # Example
/// ```rust,no_run
/// use pdf2recipes::{run, OpenAiExtractor, RunConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RunConfig::default();
/// let extractor = OpenAiExtractor::from_env(&config)?;
/// let outcome = run("cookbook.pdf", &extractor, &config).await?;
/// println!("{} chunks extracted", outcome.chunks.len());
/// # Ok(())
/// # }
/// ```
pub async fn run<E>(
    input_str: impl AsRef<str>,
    extractor: &E,
    config: &RunConfig,
) -> Result<RunOutcome, RecipeExtractError>
where
    E: StructuredExtractor + ?Sized,
{
    let windower = PdfiumWindower::new()?;
    run_with_windower(input_str, extractor, &windower, config).await
}

/// [`run`] with an explicit windowing backend.
///
/// Lets tests drive the full pipeline without pdfium and leaves room for
/// alternative PDF engines.
pub async fn run_with_windower<E, W>(
    input_str: impl AsRef<str>,
    extractor: &E,
    windower: &W,
    config: &RunConfig,
) -> Result<RunOutcome, RecipeExtractError>
where
    E: StructuredExtractor + ?Sized,
    W: PageWindower + ?Sized,
{
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction run: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let source = input::resolve_source(input_str)?;

    // ── Step 2: Load checkpoint ──────────────────────────────────────────
    let store = CheckpointStore::for_source(&source, config.checkpoint_dir.as_deref());
    let checkpoint = store.load();

    // ── Step 3: Short-circuit documents a previous run finished ─────────
    // No page count, no extraction calls, no checkpoint writes.
    if checkpoint.completed {
        info!(
            "{} has already been completely processed",
            source.display()
        );
        return Ok(RunOutcome {
            status: RunStatus::AlreadyComplete,
            chunks: Vec::new(),
            checkpoint,
            stats: RunStats {
                total_pages: checkpoint.last_processed_page,
                resumed_from_page: checkpoint.last_processed_page,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
                ..RunStats::default()
            },
        });
    }

    // ── Step 4: Count pages ──────────────────────────────────────────────
    let total_pages = windower.page_count(&source).await?;
    info!("PDF has {} pages", total_pages);

    // ── Step 5: Nothing left to process ──────────────────────────────────
    // Covers empty documents (0 >= 0) and checkpoints at or past the end;
    // both go straight to a completed checkpoint.
    if checkpoint.last_processed_page >= total_pages {
        let final_checkpoint = Checkpoint {
            last_processed_page: total_pages,
            completed: true,
        };
        store.save(&final_checkpoint)?;
        info!("Nothing to process, marking {} complete", source.display());
        return Ok(RunOutcome {
            status: RunStatus::Completed,
            chunks: Vec::new(),
            checkpoint: final_checkpoint,
            stats: RunStats {
                total_pages,
                resumed_from_page: checkpoint.last_processed_page,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
                ..RunStats::default()
            },
        });
    }

    // ── Step 6: Plan remaining chunks ────────────────────────────────────
    let resumed_from = checkpoint.last_processed_page;
    let plan = chunk_plan(total_pages, resumed_from, config.pages_per_chunk);
    if resumed_from > 0 {
        info!("Resuming from page {}", resumed_from + 1);
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_pages, plan.len());
    }

    // ── Step 7: Process chunks strictly in order ─────────────────────────
    let mut chunks: Vec<ChunkRecord> = Vec::with_capacity(plan.len());
    let mut checkpoint = checkpoint;
    let mut window_duration_ms = 0u64;
    let mut extract_duration_ms = 0u64;

    for (start_page, end_page) in plan {
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(start_page, end_page, total_pages);
        }

        let chunk_start = Instant::now();

        let window_start = Instant::now();
        let artifact = windower
            .extract_window(&source, start_page, end_page)
            .await?;
        window_duration_ms += window_start.elapsed().as_millis() as u64;

        let (result, elapsed_ms) = extract::extract_chunk(extractor, &artifact).await;
        extract_duration_ms += elapsed_ms;
        remove_artifact(artifact);

        match result {
            Ok(extraction) => {
                checkpoint = Checkpoint {
                    last_processed_page: end_page,
                    completed: false,
                };
                store.save(&checkpoint)?;

                let record = ChunkRecord {
                    start_page,
                    end_page,
                    raw: extraction.raw,
                    input_tokens: extraction.input_tokens,
                    output_tokens: extraction.output_tokens,
                    duration_ms: chunk_start.elapsed().as_millis() as u64,
                };
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_complete(start_page, end_page, total_pages, record.raw.len());
                }
                chunks.push(record);
            }
            Err(error) => {
                warn!(
                    "Run halted at pages {}-{}: {} (progress up to page {} is saved)",
                    start_page, end_page, error, checkpoint.last_processed_page
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_error(start_page, end_page, &error.to_string());
                    cb.on_run_complete(total_pages, chunks.len());
                }
                let stats = RunStats {
                    total_pages,
                    pages_processed: checkpoint.last_processed_page - resumed_from,
                    chunks_processed: chunks.len(),
                    resumed_from_page: resumed_from,
                    total_duration_ms: total_start.elapsed().as_millis() as u64,
                    window_duration_ms,
                    extract_duration_ms,
                };
                return Ok(RunOutcome {
                    status: RunStatus::Halted {
                        start_page,
                        end_page,
                        error,
                    },
                    chunks,
                    checkpoint,
                    stats,
                });
            }
        }
    }

    // ── Step 8: Mark completion ──────────────────────────────────────────
    let checkpoint = Checkpoint {
        last_processed_page: total_pages,
        completed: true,
    };
    store.save(&checkpoint)?;

    let stats = RunStats {
        total_pages,
        pages_processed: total_pages - resumed_from,
        chunks_processed: chunks.len(),
        resumed_from_page: resumed_from,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        window_duration_ms,
        extract_duration_ms,
    };

    info!(
        "Extraction complete: {} chunks, {} pages, {}ms total",
        stats.chunks_processed, stats.pages_processed, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total_pages, stats.chunks_processed);
    }

    Ok(RunOutcome {
        status: RunStatus::Completed,
        chunks,
        checkpoint,
        stats,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync<E>(
    input_str: impl AsRef<str>,
    extractor: &E,
    config: &RunConfig,
) -> Result<RunOutcome, RecipeExtractError>
where
    E: StructuredExtractor + ?Sized,
{
    tokio::runtime::Runtime::new()
        .map_err(|e| RecipeExtractError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run(input_str, extractor, config))
}

/// Report the document's page count and resume state.
///
/// Touches neither the extraction service nor the checkpoint file, so it
/// needs no credential and never interferes with a run in progress.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<SourceInfo, RecipeExtractError> {
    let windower = PdfiumWindower::new()?;
    inspect_with_windower(input_str, &windower, &RunConfig::default()).await
}

/// [`inspect`] with an explicit windowing backend.
pub async fn inspect_with_windower<W>(
    input_str: impl AsRef<str>,
    windower: &W,
    config: &RunConfig,
) -> Result<SourceInfo, RecipeExtractError>
where
    W: PageWindower + ?Sized,
{
    let source = input::resolve_source(input_str.as_ref())?;
    let store = CheckpointStore::for_source(&source, config.checkpoint_dir.as_deref());
    let total_pages = windower.page_count(&source).await?;
    Ok(SourceInfo {
        total_pages,
        checkpoint: store.load(),
        checkpoint_path: store.path().to_path_buf(),
        path: source,
    })
}

/// Compute the chunk boundaries a run will process.
///
/// Returns consecutive `(start, end)` page windows of at most `width`
/// pages covering `(last_processed, total_pages]`, in increasing order;
/// empty when nothing remains. Pages are 1-indexed, both ends inclusive.
pub fn chunk_plan(total_pages: usize, last_processed: usize, width: usize) -> Vec<(usize, usize)> {
    let width = width.max(1);
    let mut plan = Vec::new();
    let mut start = last_processed + 1;
    while start <= total_pages {
        let end = (start + width - 1).min(total_pages);
        plan.push((start, end));
        start = end + 1;
    }
    plan
}

pub(crate) fn remove_artifact(artifact: ChunkArtifact) {
    let path = artifact.path().to_path_buf();
    if let Err(e) = artifact.remove() {
        warn!("Could not remove chunk artifact {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_for_a_fresh_five_page_document() {
        assert_eq!(chunk_plan(5, 0, 2), vec![(1, 2), (3, 4), (5, 5)]);
    }

    #[test]
    fn plan_resumes_after_the_checkpointed_page() {
        assert_eq!(chunk_plan(4, 2, 2), vec![(3, 4)]);
        assert_eq!(chunk_plan(10, 3, 2), vec![(4, 5), (6, 7), (8, 9), (10, 10)]);
    }

    #[test]
    fn plan_is_empty_when_nothing_remains() {
        assert_eq!(chunk_plan(0, 0, 2), Vec::<(usize, usize)>::new());
        assert_eq!(chunk_plan(4, 4, 2), Vec::<(usize, usize)>::new());
        assert_eq!(chunk_plan(4, 9, 2), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn plan_honours_other_widths() {
        assert_eq!(chunk_plan(5, 0, 1), vec![(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
        assert_eq!(chunk_plan(5, 0, 3), vec![(1, 3), (4, 5)]);
        assert_eq!(chunk_plan(3, 0, 10), vec![(1, 3)]);
        // Width zero behaves as one rather than looping forever.
        assert_eq!(chunk_plan(2, 0, 0), vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn plan_partitions_the_remaining_pages_exactly_once() {
        for total in 0..=9 {
            for width in 1..=4 {
                for done in 0..=total {
                    let plan = chunk_plan(total, done, width);
                    let mut covered = Vec::new();
                    for &(start, end) in &plan {
                        assert!(start <= end, "inverted window in {plan:?}");
                        assert!(end - start + 1 <= width, "window too wide in {plan:?}");
                        covered.extend(start..=end);
                    }
                    let expected: Vec<usize> = (done + 1..=total).collect();
                    assert_eq!(covered, expected, "total={total} width={width} done={done}");
                }
            }
        }
    }
}
