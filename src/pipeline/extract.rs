//! Chunk extraction contract: one artifact in, one structured payload out.
//!
//! This module is intentionally thin. The wire protocol lives in
//! [`crate::service`]; prompt text lives in [`crate::prompts`]; here is
//! only the seam the driver calls through, so tests can substitute a fake
//! service and the pipeline semantics stay independent of any vendor.
//!
//! There is no retry here or anywhere else: a failed chunk halts the run
//! and the checkpoint makes re-invocation cheap, so a human (or cron)
//! retries by running the tool again.

use crate::error::ChunkError;
use crate::pipeline::window::ChunkArtifact;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, warn};

/// What the service returned for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Raw structured response text, unvalidated.
    pub raw: String,
    /// Prompt-side token count, when the service reports usage.
    pub input_tokens: Option<u64>,
    /// Completion-side token count, when the service reports usage.
    pub output_tokens: Option<u64>,
}

/// Structured-extraction backend.
///
/// Implementations upload the artifact, request a schema-constrained
/// completion, and clean up whatever they uploaded regardless of outcome.
/// [`crate::service::OpenAiExtractor`] is the production implementation.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, artifact: &ChunkArtifact) -> Result<Extraction, ChunkError>;
}

/// Run one extraction attempt with logging and timing.
///
/// Returns the elapsed wall-clock milliseconds alongside the result so the
/// driver can aggregate stage timings.
pub async fn extract_chunk<E>(
    extractor: &E,
    artifact: &ChunkArtifact,
) -> (Result<Extraction, ChunkError>, u64)
where
    E: StructuredExtractor + ?Sized,
{
    let start = Instant::now();
    let result = extractor.extract(artifact).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(extraction) => {
            debug!(
                "Pages {}-{}: {} bytes, {:?} input tokens, {:?} output tokens, {}ms",
                artifact.start_page(),
                artifact.end_page(),
                extraction.raw.len(),
                extraction.input_tokens,
                extraction.output_tokens,
                elapsed_ms
            );
        }
        Err(e) => {
            warn!(
                "Pages {}-{}: extraction failed after {}ms — {}",
                artifact.start_page(),
                artifact.end_page(),
                elapsed_ms,
                e
            );
        }
    }

    (result, elapsed_ms)
}
