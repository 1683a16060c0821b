//! Result types returned by a pipeline run.
//!
//! Everything here serialises to JSON so callers (and the `--json` CLI
//! mode) can persist or post-process a whole run as one document. The raw
//! per-chunk payloads are carried verbatim; parsing them into
//! [`crate::recipe::RecipeCard`] is left to the consumer.

use crate::checkpoint::Checkpoint;
use crate::error::ChunkError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Terminal state of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every page of the document has now been processed.
    Completed,
    /// A previous run already finished this document; nothing was done.
    AlreadyComplete,
    /// A chunk failed and the run stopped; progress up to `start_page - 1`
    /// is checkpointed for resume.
    Halted {
        start_page: usize,
        end_page: usize,
        error: ChunkError,
    },
}

impl RunStatus {
    /// True when the document is fully processed (this run or a prior one).
    pub fn is_complete(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::AlreadyComplete)
    }
}

/// One committed chunk: its page range and what the service returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// First page of the chunk (1-indexed, inclusive).
    pub start_page: usize,
    /// Last page of the chunk (inclusive).
    pub end_page: usize,
    /// Raw structured response text, unvalidated.
    pub raw: String,
    /// Prompt-side token count reported by the service, when present.
    pub input_tokens: Option<u64>,
    /// Completion-side token count reported by the service, when present.
    pub output_tokens: Option<u64>,
    /// Wall-clock milliseconds for this chunk, windowing included.
    pub duration_ms: u64,
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Total pages in the source document.
    pub total_pages: usize,
    /// Pages committed by this run (excludes pages a prior run covered).
    pub pages_processed: usize,
    /// Chunks committed by this run.
    pub chunks_processed: usize,
    /// Page after which this run picked up; `0` for a fresh start.
    pub resumed_from_page: usize,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
    /// Time spent windowing chunks out of the source document.
    pub window_duration_ms: u64,
    /// Time spent in extraction service round trips.
    pub extract_duration_ms: u64,
}

/// Everything a run produced: terminal state, per-chunk records, the
/// checkpoint as persisted, and timing statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Chunks committed by this run, in page order. Empty when the run
    /// short-circuited as [`RunStatus::AlreadyComplete`].
    pub chunks: Vec<ChunkRecord>,
    /// Checkpoint state at the end of the run, as on disk.
    pub checkpoint: Checkpoint,
    pub stats: RunStats,
}

impl RunOutcome {
    /// True when the document is fully processed.
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    /// Treat a halt as an error, for callers that have no resume story.
    ///
    /// The committed chunks and checkpoint are lost in the `Err` case;
    /// inspect the outcome directly if partial progress matters.
    pub fn into_result(self) -> Result<Self, ChunkError> {
        match self.status {
            RunStatus::Halted { error, .. } => Err(error),
            _ => Ok(self),
        }
    }
}

/// What [`crate::inspect`] reports: document size and resume state,
/// gathered without touching the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Validated path of the source document.
    pub path: PathBuf,
    pub total_pages: usize,
    /// Checkpoint as currently on disk (fresh if absent).
    pub checkpoint: Checkpoint,
    /// Where the checkpoint for this document lives.
    pub checkpoint_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halted_outcome() -> RunOutcome {
        RunOutcome {
            status: RunStatus::Halted {
                start_page: 3,
                end_page: 4,
                error: ChunkError::ApiError {
                    start: 3,
                    end: 4,
                    detail: "quota exceeded".to_string(),
                },
            },
            chunks: vec![ChunkRecord {
                start_page: 1,
                end_page: 2,
                raw: "{\"title\":\"Soup\"}".to_string(),
                input_tokens: Some(1200),
                output_tokens: Some(180),
                duration_ms: 2400,
            }],
            checkpoint: Checkpoint {
                last_processed_page: 2,
                completed: false,
            },
            stats: RunStats {
                total_pages: 6,
                pages_processed: 2,
                chunks_processed: 1,
                ..RunStats::default()
            },
        }
    }

    #[test]
    fn status_serialises_with_state_tag() {
        let json = serde_json::to_value(RunStatus::AlreadyComplete).unwrap();
        assert_eq!(json["state"], "already_complete");

        let json = serde_json::to_value(&halted_outcome().status).unwrap();
        assert_eq!(json["state"], "halted");
        assert_eq!(json["start_page"], 3);
        assert_eq!(json["end_page"], 4);
    }

    #[test]
    fn into_result_surfaces_the_halting_error() {
        let err = halted_outcome().into_result().unwrap_err();
        assert_eq!(err.start_page(), 3);
        assert_eq!(err.end_page(), 4);
    }

    #[test]
    fn into_result_passes_completed_runs_through() {
        let mut outcome = halted_outcome();
        outcome.status = RunStatus::Completed;
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn already_complete_counts_as_complete() {
        assert!(RunStatus::AlreadyComplete.is_complete());
        assert!(RunStatus::Completed.is_complete());
        assert!(!halted_outcome().status.is_complete());
    }

    #[test]
    fn outcome_round_trips_through_json() {
        let outcome = halted_outcome();
        let json = serde_json::to_string_pretty(&outcome).unwrap();
        let back: RunOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
