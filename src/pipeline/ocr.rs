//! Per-page OCR: encode the page, call the engine, classify the outcome.
//!
//! This is the only stage that decides between "abort the run" and "skip
//! this page". An unavailable engine will fail on every page, so it becomes
//! a fatal [`Scan2DocxError::EngineUnavailable`]; anything else is stored on
//! the page's [`PageResult`] and the caller moves on to the next page.

use crate::config::ConversionConfig;
use crate::engine::OcrEngine;
use crate::error::{OcrError, PageError, Scan2DocxError};
use crate::output::PageResult;
use crate::pipeline::encode;
use image::DynamicImage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Run OCR on one rendered page.
///
/// ## Return Value
///
/// `Ok(PageResult)` for both recognised and skipped pages (check
/// `result.error`). `Err` only when the engine is unavailable.
pub async fn process_page(
    engine: &Arc<dyn OcrEngine>,
    page_num: usize,
    image: &DynamicImage,
    config: &ConversionConfig,
) -> Result<PageResult, Scan2DocxError> {
    let start = Instant::now();

    let png = match encode::encode_page(image) {
        Ok(png) => png,
        Err(e) => {
            warn!("Page {}: image encoding failed: {}", page_num, e);
            return Ok(skipped(
                page_num,
                start,
                PageError::EncodeFailed {
                    page: page_num,
                    detail: e.to_string(),
                },
            ));
        }
    };

    let call = engine.recognize(&png, &config.languages);
    let outcome = match config.page_timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Page {}: OCR timed out after {}s", page_num, secs);
                return Ok(skipped(page_num, start, PageError::Timeout { page: page_num, secs }));
            }
        },
        None => call.await,
    };

    match outcome {
        Ok(text) => {
            let duration = start.elapsed();
            debug!(
                "Page {}: {} chars recognised by {} in {:?}",
                page_num,
                text.chars().count(),
                engine.name(),
                duration
            );
            Ok(PageResult {
                page_num,
                text,
                duration_ms: duration.as_millis() as u64,
                error: None,
            })
        }
        Err(OcrError::EngineUnavailable { detail }) => {
            Err(Scan2DocxError::EngineUnavailable { detail })
        }
        Err(OcrError::Failed { detail }) => {
            warn!("Page {}: OCR failed: {}", page_num, detail);
            Ok(skipped(
                page_num,
                start,
                PageError::OcrFailed {
                    page: page_num,
                    detail,
                },
            ))
        }
    }
}

fn skipped(page_num: usize, start: Instant, error: PageError) -> PageResult {
    PageResult {
        page_num,
        text: String::new(),
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(error),
    }
}
