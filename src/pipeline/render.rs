//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Why both DPI and a pixel cap?
//!
//! OCR accuracy follows DPI, so pages are scaled by `dpi / 72`. An A0 poster
//! at 300 DPI would still be a 10,000 × 14,000 px bitmap, so
//! `max_rendered_pixels` caps the longest edge on top of that.

use crate::error::Scan2DocxError;
use crate::output::DocumentMetadata;
use crate::pipeline::input::ResolvedInput;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming the PDFium shared library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// What to render and how.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub dpi: u32,
    pub max_pixels: u32,
    pub password: Option<String>,
    /// 0-based page indices, ascending.
    pub page_indices: Vec<usize>,
}

/// Turns PDF bytes into page images.
///
/// Methods are blocking; the pipeline calls them from `spawn_blocking`.
/// Every error is fatal for the conversion: a PDF that cannot be opened or
/// rendered yields no document at all.
pub trait Rasterizer: Send + Sync {
    /// Read document metadata, including the page count.
    fn inspect(
        &self,
        input: &ResolvedInput,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, Scan2DocxError>;

    /// Render the requested pages, returning `(page_index_0based, image)`
    /// in ascending page order.
    fn rasterize(
        &self,
        input: &ResolvedInput,
        request: &RenderRequest,
    ) -> Result<Vec<(usize, DynamicImage)>, Scan2DocxError>;
}

/// [`Rasterizer`] backed by the PDFium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    lib_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// `lib_path` overrides `PDFIUM_LIB_PATH` and the system search path.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    fn bind(&self) -> Result<Pdfium, Scan2DocxError> {
        let explicit = self
            .lib_path
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_LIB_ENV).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty());

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(&path).map_err(|e| {
                Scan2DocxError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
            })?,
            None => Pdfium::bind_to_system_library()
                .map_err(|e| Scan2DocxError::PdfiumBindingFailed(e.to_string()))?,
        };
        Ok(Pdfium::new(bindings))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn inspect(
        &self,
        input: &ResolvedInput,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, Scan2DocxError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&input.bytes, password)
            .map_err(|e| load_error(&input.name, password, e))?;

        let metadata = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
        })
    }

    fn rasterize(
        &self,
        input: &ResolvedInput,
        request: &RenderRequest,
    ) -> Result<Vec<(usize, DynamicImage)>, Scan2DocxError> {
        let pdfium = self.bind()?;
        let password = request.password.as_deref();
        let document = pdfium
            .load_pdf_from_byte_slice(&input.bytes, password)
            .map_err(|e| load_error(&input.name, password, e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(request.dpi as f32 / 72.0)
            .set_maximum_width(request.max_pixels as i32)
            .set_maximum_height(request.max_pixels as i32);

        let mut results = Vec::with_capacity(request.page_indices.len());

        for &idx in &request.page_indices {
            if idx >= total_pages {
                return Err(Scan2DocxError::PageOutOfRange {
                    page: idx + 1,
                    total: total_pages,
                });
            }

            let page = pages
                .get(idx as u16)
                .map_err(|e| Scan2DocxError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                Scan2DocxError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            results.push((idx, image));
        }

        Ok(results)
    }
}

/// Map a pdfium load failure onto the password / corruption variants.
fn load_error(name: &str, password: Option<&str>, e: PdfiumError) -> Scan2DocxError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            Scan2DocxError::WrongPassword {
                source_name: name.to_string(),
            }
        } else {
            Scan2DocxError::PasswordRequired {
                source_name: name.to_string(),
            }
        }
    } else {
        Scan2DocxError::CorruptPdf {
            source_name: name.to_string(),
            detail: err_str,
        }
    }
}

/// Rasterise selected pages on the blocking pool.
pub async fn render_pages(
    rasterizer: Arc<dyn Rasterizer>,
    input: Arc<ResolvedInput>,
    request: RenderRequest,
) -> Result<Vec<(usize, DynamicImage)>, Scan2DocxError> {
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&input, &request))
        .await
        .map_err(|e| Scan2DocxError::Internal(format!("Render task panicked: {}", e)))?
}

/// Extract document metadata on the blocking pool without rendering pages.
pub async fn extract_metadata(
    rasterizer: Arc<dyn Rasterizer>,
    input: Arc<ResolvedInput>,
    password: Option<String>,
) -> Result<DocumentMetadata, Scan2DocxError> {
    tokio::task::spawn_blocking(move || rasterizer.inspect(&input, password.as_deref()))
        .await
        .map_err(|e| Scan2DocxError::Internal(format!("Metadata task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_classified() {
        let err = load_error(
            "locked.pdf",
            None,
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError),
        );
        assert!(matches!(err, Scan2DocxError::PasswordRequired { .. }));

        let err = load_error(
            "locked.pdf",
            Some("nope"),
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError),
        );
        assert!(matches!(err, Scan2DocxError::WrongPassword { .. }));
    }

    #[test]
    fn other_load_errors_are_corrupt_pdf() {
        let err = load_error(
            "broken.pdf",
            None,
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError),
        );
        match err {
            Scan2DocxError::CorruptPdf { source_name, .. } => assert_eq!(source_name, "broken.pdf"),
            other => panic!("expected CorruptPdf, got {other:?}"),
        }
    }

    #[test]
    fn missing_library_is_a_binding_error() {
        let r = PdfiumRasterizer::new(Some(PathBuf::from("/nonexistent/libpdfium.so")));
        let input = ResolvedInput {
            name: "x.pdf".into(),
            bytes: b"%PDF-1.4".to_vec(),
        };
        let err = r.inspect(&input, None).unwrap_err();
        assert!(matches!(err, Scan2DocxError::PdfiumBindingFailed(_)));
    }
}
