//! Streaming conversion API: emit pages as OCR finishes them.
//!
//! Unlike the eager [`crate::convert::convert_bytes`] which returns only
//! after every page is done, [`convert_stream`] yields a `PageResult` per
//! page so callers can show text as soon as it is recognised. Pages are OCR'd
//! one at a time and always arrive in page order.
//!
//! A page whose OCR fails arrives as `Ok(PageResult)` with `error` set, the
//! same as in the eager API. An unavailable engine arrives as a single
//! `Err` item, after which the stream ends.
//!
//! A configured progress callback gets the same per-page events as in the
//! eager API, fired as each item is produced. `on_conversion_complete` fires
//! once the last page has been yielded.

use crate::config::ConversionConfig;
use crate::convert::{self, PreparedConversion};
use crate::engine::OcrEngine;
use crate::error::Scan2DocxError;
use crate::output::PageResult;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::ocr;
use futures::stream;
use image::DynamicImage;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

struct StreamState {
    pages: std::vec::IntoIter<(usize, DynamicImage)>,
    engine: Arc<dyn OcrEngine>,
    config: ConversionConfig,
    total_pages: usize,
    completed: usize,
    succeeded: usize,
    finished: bool,
}

/// A boxed stream of page results.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageResult, Scan2DocxError>> + Send>>;

/// Convert PDF bytes, streaming pages as they are recognised.
///
/// Rendering happens before this returns, so input errors (not a PDF,
/// corrupt file, wrong password) and a missing OCR engine are reported here
/// rather than through the stream.
///
/// # Example
/// ```rust,no_run
/// use scan2docx::{convert_stream, ConversionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("scan.pdf")?;
/// let mut pages = convert_stream(&bytes, &ConversionConfig::default()).await?;
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("page {}: {} chars", page.page_num, page.text.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<PageStream, Scan2DocxError> {
    input::check_pdf_header("<memory>", bytes)?;
    let resolved = ResolvedInput {
        name: "<memory>".to_string(),
        bytes: bytes.to_vec(),
    };

    let PreparedConversion {
        engine, rendered, ..
    } = convert::prepare(resolved, config).await?;
    info!("Streaming OCR for {} pages", rendered.len());

    let total_pages = rendered.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_pages);
    }

    let state = StreamState {
        pages: rendered.into_iter(),
        engine,
        config: config.clone(),
        total_pages,
        completed: 0,
        succeeded: 0,
        finished: false,
    };
    let s = stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }
        let Some((idx, image)) = st.pages.next() else {
            if let Some(ref cb) = st.config.progress_callback {
                cb.on_conversion_complete(st.total_pages, st.succeeded);
            }
            return None;
        };

        let page_num = idx + 1;
        if let Some(ref cb) = st.config.progress_callback {
            cb.on_page_start(page_num, st.total_pages);
        }
        let result = ocr::process_page(&st.engine, page_num, &image, &st.config).await;
        match &result {
            Ok(page) => {
                st.completed += 1;
                if page.is_success() {
                    st.succeeded += 1;
                }
                convert::report_page(&st.config, page, st.completed, st.total_pages);
            }
            Err(_) => st.finished = true,
        }
        Some((result, st))
    });

    Ok(Box::pin(s))
}
