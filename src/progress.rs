//! Progress-callback trait for per-unit and per-page events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ImageToPdfConfigBuilder::progress_callback`] or
//! [`crate::config::DownsampleConfigBuilder::progress_callback`] to receive
//! events while a pipeline runs.
//!
//! # Example
//!
//! ```rust
//! use pdfbatch::{ConversionProgressCallback, ImageToPdfConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, index: usize, total_units: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("unit {} finished ({}/{})", index, done, total_units);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! });
//!
//! let config = ImageToPdfConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by both pipelines as work progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_unit_complete` and `on_unit_error` are called from the collector as
/// outcomes arrive, in completion order. `on_page_written` is called from the
/// single assembly thread. Implementations still need `Send + Sync` because
/// the callback is shared between the async task and the blocking thread.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the transform phase starts.
    ///
    /// # Arguments
    /// * `total_units`: number of images or pages that will be transformed
    fn on_conversion_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called when one unit (an image or a page) transformed successfully.
    ///
    /// # Arguments
    /// * `index`: original 0-based index of the unit
    /// * `total_units`: total units
    fn on_unit_complete(&self, index: usize, total_units: usize) {
        let _ = (index, total_units);
    }

    /// Called for each image or page dropped from the batch.
    ///
    /// A dropped chunk fires once per page it covers, with the same `error`.
    fn on_unit_error(&self, index: usize, total_units: usize, error: &str) {
        let _ = (index, total_units, error);
    }

    /// Called once before the first page is written to the output.
    ///
    /// # Arguments
    /// * `total_pages`: pages that survived the transform phase
    fn on_assembly_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page is inserted into the output document.
    ///
    /// # Arguments
    /// * `written`: pages written so far (1-based)
    /// * `total_pages`: pages that will be written
    fn on_page_written(&self, written: usize, total_pages: usize) {
        let _ = (written, total_pages);
    }

    /// Called once after the output has been saved.
    ///
    /// # Arguments
    /// * `total_units`: units attempted
    /// * `success_count`: pages in the saved document
    fn on_conversion_complete(&self, total_units: usize, success_count: usize) {
        let _ = (total_units, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in both config structs.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Resolve an optional configured callback to something callable.
pub(crate) fn resolve(cb: &Option<ProgressCallback>) -> ProgressCallback {
    cb.clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback) as ProgressCallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        completes: AtomicUsize,
        errors: AtomicUsize,
        written: AtomicUsize,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, total_units: usize) {
            self.started_total.store(total_units, Ordering::SeqCst);
        }

        fn on_unit_complete(&self, _index: usize, _total_units: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_error(&self, _index: usize, _total_units: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_written(&self, written: usize, _total_pages: usize) {
            self.written.store(written, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _total_units: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_unit_complete(0, 5);
        cb.on_unit_error(1, 5, "some error");
        cb.on_assembly_start(4);
        cb.on_page_written(1, 4);
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_conversion_start(3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        tracker.on_unit_complete(0, 3);
        tracker.on_unit_complete(2, 3);
        tracker.on_unit_error(1, 3, "truncated file");
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_page_written(1, 2);
        tracker.on_page_written(2, 2);
        assert_eq!(tracker.written.load(Ordering::SeqCst), 2);

        tracker.on_conversion_complete(3, 2);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn resolve_falls_back_to_noop() {
        let cb = resolve(&None);
        cb.on_conversion_start(10);
        cb.on_page_written(1, 10);
    }
}
