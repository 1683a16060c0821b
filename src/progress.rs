//! Progress-callback trait for per-chunk extraction events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive events
//! as the pipeline works through the document chunk by chunk.
//!
//! Callbacks are the least-invasive integration point: callers can forward
//! events to a channel, a database record, or a terminal progress bar
//! without the library knowing how the host application communicates. The
//! trait is `Send + Sync` so implementations remain usable if a future
//! driver processes chunks off the main task.
//!
//! # Example
//!
//! ```rust
//! use pdf2recipes::{RunConfig, RunProgressCallback};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     chunks_done: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_chunk_complete(
//!         &self,
//!         start_page: usize,
//!         end_page: usize,
//!         _total_pages: usize,
//!         _response_len: usize,
//!     ) {
//!         self.chunks_done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Pages {start_page}-{end_page} done");
//!     }
//! }
//!
//! let config = RunConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback {
//!         chunks_done: AtomicUsize::new(0),
//!     }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline driver as it processes each chunk of pages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. A run that is already complete when it starts
/// fires no events at all.
pub trait RunProgressCallback: Send + Sync {
    /// Called once before the first chunk of this run is windowed.
    ///
    /// `chunk_count` is the number of chunks this run still has to process,
    /// which is less than the document total when resuming.
    fn on_run_start(&self, total_pages: usize, chunk_count: usize) {
        let _ = (total_pages, chunk_count);
    }

    /// Called just before a chunk is windowed out of the source document.
    fn on_chunk_start(&self, start_page: usize, end_page: usize, total_pages: usize) {
        let _ = (start_page, end_page, total_pages);
    }

    /// Called when a chunk's extraction committed, checkpoint included.
    ///
    /// `response_len` is the byte length of the raw structured response,
    /// useful for progress displays that track output volume.
    fn on_chunk_complete(
        &self,
        start_page: usize,
        end_page: usize,
        total_pages: usize,
        response_len: usize,
    ) {
        let _ = (start_page, end_page, total_pages, response_len);
    }

    /// Called when a chunk fails and the run is about to halt.
    fn on_chunk_error(&self, start_page: usize, end_page: usize, error: &str) {
        let _ = (start_page, end_page, error);
    }

    /// Called once after the run stops, whether it finished or halted.
    ///
    /// `chunks_processed` counts only the chunks committed by this run.
    fn on_run_complete(&self, total_pages: usize, chunks_processed: usize) {
        let _ = (total_pages, chunks_processed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        run_total: AtomicUsize,
        run_processed: AtomicUsize,
    }

    impl TrackingCallback {
        fn new() -> Self {
            Self {
                starts: AtomicUsize::new(0),
                completes: AtomicUsize::new(0),
                errors: AtomicUsize::new(0),
                run_total: AtomicUsize::new(0),
                run_processed: AtomicUsize::new(0),
            }
        }
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_run_start(&self, total_pages: usize, _chunk_count: usize) {
            self.run_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_chunk_start(&self, _start: usize, _end: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _start: usize, _end: usize, _total: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_error(&self, _start: usize, _end: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total_pages: usize, chunks_processed: usize) {
            self.run_processed.store(chunks_processed, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(6, 3);
        cb.on_chunk_start(1, 2, 6);
        cb.on_chunk_complete(1, 2, 6, 42);
        cb.on_chunk_error(3, 4, "upload refused");
        cb.on_run_complete(6, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::new();

        tracker.on_run_start(6, 3);
        assert_eq!(tracker.run_total.load(Ordering::SeqCst), 6);

        tracker.on_chunk_start(1, 2, 6);
        tracker.on_chunk_complete(1, 2, 6, 100);
        tracker.on_chunk_start(3, 4, 6);
        tracker.on_chunk_complete(3, 4, 6, 250);
        tracker.on_chunk_start(5, 6, 6);
        tracker.on_chunk_error(5, 6, "service timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_run_complete(6, 2);
        assert_eq!(tracker.run_processed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn RunProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_run_start(10, 5);
        cb.on_chunk_start(1, 2, 10);
        cb.on_chunk_complete(1, 2, 10, 512);
    }
}
