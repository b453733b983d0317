//! Eager (full-document) conversion entry points.
//!
//! ## Flow
//!
//! 1. resolve the input to bytes and check the `%PDF` header
//! 2. resolve the OCR engine (fails fast when Tesseract is missing)
//! 3. read metadata and rasterise the selected pages in one batch
//! 4. OCR the pages one at a time, in page order
//! 5. add a paragraph plus page break for every page with text
//! 6. serialise the DOCX
//!
//! Steps 1–3 and an unavailable engine in step 4 are fatal. A page whose OCR
//! fails is recorded in [`ConversionOutput::pages`] and left out of the
//! document. Use [`crate::stream::convert_stream`] to receive pages one by
//! one instead.

use crate::config::{ConversionConfig, PageSelection};
use crate::docx::DocxDocument;
use crate::engine::{OcrEngine, TesseractEngine};
use crate::error::{OcrError, Scan2DocxError};
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, PageResult};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::render::{self, PdfiumRasterizer, Rasterizer, RenderRequest};
use crate::pipeline::ocr;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Display name used for in-memory inputs.
const MEMORY_SOURCE: &str = "<memory>";

/// Convert a scanned PDF file or URL to DOCX.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config`    — Conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some pages failed OCR
/// (check `output.stats.failed_pages` or [`ConversionOutput::failed_pages`]).
///
/// # Errors
/// Returns `Err(Scan2DocxError)` only for fatal errors:
/// - File not found / permission denied / download failed
/// - Not a valid PDF, or PDFium cannot open or render it
/// - The OCR engine is unavailable
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Scan2DocxError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    convert_resolved(resolved, config).await
}

/// Convert PDF bytes in memory to DOCX.
///
/// This is the recommended API when the PDF comes from an upload, a
/// database, or any other in-memory buffer. The DOCX bytes are in
/// `output.document`.
///
/// # Example
/// ```rust,no_run
/// use scan2docx::{convert_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("scan.pdf")?;
/// let output = convert_bytes(&bytes, &ConversionConfig::default()).await?;
/// std::fs::write("scan_OCR_Output.docx", &output.document)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Scan2DocxError> {
    input::check_pdf_header(MEMORY_SOURCE, bytes)?;
    let resolved = ResolvedInput {
        name: MEMORY_SOURCE.to_string(),
        bytes: bytes.to_vec(),
    };
    convert_resolved(resolved, config).await
}

/// Convert a PDF and write the DOCX directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Scan2DocxError> {
    let output = convert(input_str, config).await?;
    let path = output_path.as_ref();
    let write_err = |e: std::io::Error| Scan2DocxError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("docx.tmp");
    let written = match tokio::fs::write(&tmp_path, &output.document).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {} bytes to {}", output.document.len(), path.display());
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Scan2DocxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Scan2DocxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Extract PDF metadata without rendering or OCR.
///
/// Does not need Tesseract. Uses the rasteriser, library path and password
/// from `config`.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, Scan2DocxError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    render::extract_metadata(
        resolve_rasterizer(config),
        Arc::new(resolved),
        config.password.clone(),
    )
    .await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Everything needed to start OCR: the engine and the rendered pages.
pub(crate) struct PreparedConversion {
    pub engine: Arc<dyn OcrEngine>,
    pub metadata: DocumentMetadata,
    pub rendered: Vec<(usize, DynamicImage)>,
    pub render_duration_ms: u64,
}

/// Resolve the engine, read metadata, and rasterise the selected pages.
pub(crate) async fn prepare(
    resolved: ResolvedInput,
    config: &ConversionConfig,
) -> Result<PreparedConversion, Scan2DocxError> {
    let engine = resolve_engine(config)?;
    debug!("Using OCR engine '{}'", engine.name());

    let rasterizer = resolve_rasterizer(config);
    let input = Arc::new(resolved);

    let metadata = render::extract_metadata(
        Arc::clone(&rasterizer),
        Arc::clone(&input),
        config.password.clone(),
    )
    .await?;
    info!("PDF has {} pages", metadata.page_count);

    let page_indices = select_pages(&config.pages, metadata.page_count)?;
    debug!("Selected {} pages for conversion", page_indices.len());

    let render_start = Instant::now();
    let request = RenderRequest {
        dpi: config.dpi,
        max_pixels: config.max_rendered_pixels,
        password: config.password.clone(),
        page_indices,
    };
    let rendered = render::render_pages(rasterizer, input, request).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", rendered.len(), render_duration_ms);

    Ok(PreparedConversion {
        engine,
        metadata,
        rendered,
        render_duration_ms,
    })
}

async fn convert_resolved(
    resolved: ResolvedInput,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Scan2DocxError> {
    let total_start = Instant::now();

    let PreparedConversion {
        engine,
        metadata,
        rendered,
        render_duration_ms,
    } = prepare(resolved, config).await?;

    let selected = rendered.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    let ocr_start = Instant::now();
    let pages = process_sequential(&engine, rendered, config).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    let document = assemble_document(&pages, config, &metadata);
    let bytes = document.to_bytes()?;

    let failed = pages.iter().filter(|p| !p.is_success()).count();
    let paragraphs = pages.iter().filter(|p| p.has_content()).count();
    let stats = ConversionStats {
        total_pages: metadata.page_count,
        processed_pages: pages.len(),
        paragraphs,
        empty_pages: pages.len() - paragraphs - failed,
        failed_pages: failed,
        document_bytes: bytes.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        ocr_duration_ms,
    };

    if failed > 0 {
        let missing: Vec<usize> = pages
            .iter()
            .filter(|p| !p.is_success())
            .map(|p| p.page_num)
            .collect();
        warn!("OCR failed on {} pages, left out of the document: {:?}", failed, missing);
    }
    info!(
        "Conversion complete: {} paragraphs from {}/{} pages, {}ms total",
        paragraphs, stats.processed_pages, stats.total_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(selected, selected - failed);
    }

    Ok(ConversionOutput {
        document: bytes,
        pages,
        metadata,
        stats,
    })
}

/// Use the configured engine, or locate Tesseract.
pub(crate) fn resolve_engine(config: &ConversionConfig) -> Result<Arc<dyn OcrEngine>, Scan2DocxError> {
    if let Some(ref engine) = config.ocr_engine {
        return Ok(Arc::clone(engine));
    }

    match TesseractEngine::resolve(config.tesseract_path.as_deref()) {
        Ok(engine) => {
            debug!("Resolved tesseract at {}", engine.executable().display());
            Ok(Arc::new(engine))
        }
        Err(OcrError::EngineUnavailable { detail }) | Err(OcrError::Failed { detail }) => {
            Err(Scan2DocxError::EngineUnavailable { detail })
        }
    }
}

/// Use the configured rasteriser, or PDFium.
pub(crate) fn resolve_rasterizer(config: &ConversionConfig) -> Arc<dyn Rasterizer> {
    match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new(config.pdfium_lib_path.clone())),
    }
}

/// Expand the page selection; an explicit selection matching no page is an error.
fn select_pages(selection: &PageSelection, total_pages: usize) -> Result<Vec<usize>, Scan2DocxError> {
    let indices = selection.to_indices(total_pages);
    if indices.is_empty() && *selection != PageSelection::All {
        return Err(Scan2DocxError::PageOutOfRange {
            page: selection.first_requested(),
            total: total_pages,
        });
    }
    Ok(indices)
}

/// OCR pages one at a time in page order.
///
/// Each image is dropped as soon as its page is done. Returns early only
/// when the engine is unavailable.
async fn process_sequential(
    engine: &Arc<dyn OcrEngine>,
    rendered: Vec<(usize, DynamicImage)>,
    config: &ConversionConfig,
) -> Result<Vec<PageResult>, Scan2DocxError> {
    let total_pages = rendered.len();
    let mut results = Vec::with_capacity(total_pages);

    for (done, (idx, image)) in rendered.into_iter().enumerate() {
        let page_num = idx + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page_num, total_pages);
        }

        let result = ocr::process_page(engine, page_num, &image, config).await?;
        drop(image);

        report_page(config, &result, done + 1, total_pages);
        results.push(result);
    }

    Ok(results)
}

/// Send the outcome of one finished page to the progress callback.
pub(crate) fn report_page(
    config: &ConversionConfig,
    result: &PageResult,
    pages_completed: usize,
    total_pages: usize,
) {
    if let Some(ref cb) = config.progress_callback {
        match &result.error {
            None => cb.on_page_complete(
                result.page_num,
                total_pages,
                result.text.trim().chars().count(),
            ),
            Some(e) => cb.on_page_error(result.page_num, total_pages, &e.to_string()),
        }
        cb.on_progress(pages_completed, total_pages);
    }
}

/// Build the document: one paragraph and one page break per page with text.
///
/// The paragraph keeps the engine's text untrimmed; trimming only decides
/// whether the page counts as blank.
pub(crate) fn assemble_document(
    pages: &[PageResult],
    config: &ConversionConfig,
    metadata: &DocumentMetadata,
) -> DocxDocument {
    let mut doc = DocxDocument::new();

    if config.include_metadata {
        if let Some(ref title) = metadata.title {
            doc.set_title(title.as_str());
        }
        if let Some(ref author) = metadata.author {
            doc.set_creator(author.as_str());
        }
    }

    for page in pages.iter().filter(|p| p.has_content()) {
        doc.add_paragraph(page.text.as_str());
        doc.add_page_break();
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::Block;
    use crate::error::PageError;

    fn page(num: usize, text: &str) -> PageResult {
        PageResult {
            page_num: num,
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn assemble_skips_blank_and_failed_pages() {
        let failed = PageResult {
            error: Some(PageError::OcrFailed {
                page: 3,
                detail: "x".into(),
            }),
            ..page(3, "")
        };
        let pages = vec![page(1, "Hello\n"), page(2, " \n\u{000C}"), failed, page(4, "World")];
        let doc = assemble_document(&pages, &ConversionConfig::default(), &DocumentMetadata::default());
        assert_eq!(
            doc.blocks(),
            &[
                Block::Paragraph("Hello\n".into()),
                Block::PageBreak,
                Block::Paragraph("World".into()),
                Block::PageBreak,
            ]
        );
    }

    #[test]
    fn select_pages_rejects_out_of_range_selection() {
        let err = select_pages(&PageSelection::Single(9), 3).unwrap_err();
        assert!(matches!(err, Scan2DocxError::PageOutOfRange { page: 9, total: 3 }));
    }

    #[test]
    fn select_pages_allows_empty_document() {
        assert!(select_pages(&PageSelection::All, 0).unwrap().is_empty());
    }

    #[test]
    fn configured_engine_is_used_as_is() {
        let engine: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::new("/opt/ocr/tesseract"));
        let config = ConversionConfig::builder()
            .ocr_engine(Arc::clone(&engine))
            .build()
            .unwrap();
        let resolved = resolve_engine(&config).unwrap();
        assert!(Arc::ptr_eq(&resolved, &engine));
    }

    #[test]
    fn missing_explicit_tesseract_is_fatal() {
        let config = ConversionConfig::builder()
            .tesseract_path("/nonexistent/tesseract")
            .build()
            .unwrap();
        let err = resolve_engine(&config).err().expect("should fail");
        assert!(err.is_engine_unavailable());
    }
}
