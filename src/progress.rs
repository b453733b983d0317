//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the document. Progress reporting is
//! not part of the conversion result: a callback cannot change or abort it.
//!
//! # Example
//!
//! ```rust
//! use scan2docx::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::Arc;
//!
//! struct Percent;
//!
//! impl ConversionProgressCallback for Percent {
//!     fn on_progress(&self, completed: usize, total: usize) {
//!         eprintln!("{}%", completed * 100 / total.max(1));
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Percent))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each page.
///
/// Pages are processed one at a time in page order, so events for one
/// conversion never overlap. Implementations are still `Send + Sync`
/// because a shared callback may serve several conversions at once.
/// All methods have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after rasterisation, before the first OCR call.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be processed
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before OCR starts on a page.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages selected for conversion
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when OCR succeeds on a page.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages selected for conversion
    /// * `text_len`    — characters recognised; 0 for a blank page
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when OCR fails on a page and the page is skipped.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages selected for conversion
    /// * `error`       — human-readable error description
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called after every page, whatever its outcome.
    ///
    /// # Arguments
    /// * `pages_completed` — pages finished so far, including this one
    /// * `pages_total`     — pages selected for conversion
    fn on_progress(&self, pages_completed: usize, pages_total: usize) {
        let _ = (pages_completed, pages_total);
    }

    /// Called once after all pages have been attempted.
    ///
    /// # Arguments
    /// * `total_pages`   — pages selected for conversion
    /// * `success_count` — pages that went through OCR without error
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        progress: Mutex<Vec<(usize, usize)>>,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _text_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_progress(&self, pages_completed: usize, pages_total: usize) {
            self.progress.lock().unwrap().push((pages_completed, pages_total));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_progress(2, 5);
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 100);
        tracker.on_progress(1, 2);
        tracker.on_page_start(2, 2);
        tracker.on_page_error(2, 2, "tesseract exited with status 1");
        tracker.on_progress(2, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.progress.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(10);
        cb.on_progress(1, 10);
    }
}
