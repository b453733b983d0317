//! Error types for the scan2docx library.
//!
//! Three error types mark three different blast radii:
//!
//! * [`Scan2DocxError`] — **Fatal**: the conversion cannot proceed at all
//!   (input is not a PDF, PDFium cannot be loaded, Tesseract is missing).
//!   Returned as `Err(Scan2DocxError)` from the top-level `convert*` functions.
//!
//! * [`PageError`] — **Non-fatal**: OCR failed on a single page but every
//!   other page is fine. Stored inside [`crate::output::PageResult`] so the
//!   caller can see exactly which pages are missing from the document.
//!
//! * [`OcrError`] — returned by an [`crate::engine::OcrEngine`]. The pipeline
//!   turns `EngineUnavailable` into a fatal error and everything else into a
//!   [`PageError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan2docx library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Scan2DocxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("Input '{source_name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    // ── Rasterisation errors ──────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{source_name}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { source_name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{source_name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{source_name}'")]
    WrongPassword { source_name: String },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is required to rasterise PDF pages. You can:\n\
  • Install libpdfium system-wide.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Pass --pdfium /path/to/libpdfium on the command line.\n"
    )]
    PdfiumBindingFailed(String),

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine cannot be located or invoked at all.
    ///
    /// No page could succeed without it, so the whole run aborts.
    #[error(
        "OCR engine unavailable: {detail}\n\n\
Install Tesseract with the required language packs, then either put\n\
`tesseract` on PATH, set SCAN2DOCX_TESSERACT, or pass --tesseract <PATH>.\n"
    )]
    EngineUnavailable { detail: String },

    /// Some pages succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_result`] when
    /// the caller wants to treat any page failure as an error.
    #[error("{failed}/{total} pages failed OCR: {pages:?}")]
    PartialFailure {
        failed: usize,
        total: usize,
        pages: Vec<usize>,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The DOCX package could not be serialised.
    #[error("Failed to build DOCX document: {0}")]
    DocumentWriteFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Scan2DocxError {
    /// `true` when the source bytes themselves were rejected.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Scan2DocxError::FileNotFound { .. }
                | Scan2DocxError::PermissionDenied { .. }
                | Scan2DocxError::InvalidInput { .. }
                | Scan2DocxError::NotAPdf { .. }
                | Scan2DocxError::CorruptPdf { .. }
        )
    }

    /// `true` when the OCR engine could not be used at all.
    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, Scan2DocxError::EngineUnavailable { .. })
    }
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageResult`] when a page fails. The page
/// contributes nothing to the document; the conversion carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The rendered page could not be encoded for the OCR engine.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The OCR engine ran but failed on this page.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// OCR did not finish within the per-page timeout.
    #[error("Page {page}: OCR timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::EncodeFailed { page, .. }
            | PageError::OcrFailed { page, .. }
            | PageError::Timeout { page, .. } => *page,
        }
    }
}

/// Errors reported by an [`crate::engine::OcrEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    /// The engine binary or its language data cannot be found.
    #[error("{detail}")]
    EngineUnavailable { detail: String },

    /// A single recognition call failed.
    #[error("{detail}")]
    Failed { detail: String },
}

impl OcrError {
    pub fn unavailable(detail: impl Into<String>) -> Self {
        OcrError::EngineUnavailable {
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        OcrError::Failed {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Scan2DocxError::PartialFailure {
            failed: 1,
            total: 10,
            pages: vec![4],
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
        assert!(msg.contains('4'), "got: {msg}");
    }

    #[test]
    fn engine_unavailable_mentions_hint() {
        let e = Scan2DocxError::EngineUnavailable {
            detail: "tesseract not found on PATH".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("tesseract not found on PATH"));
        assert!(msg.contains("SCAN2DOCX_TESSERACT"));
        assert!(e.is_engine_unavailable());
        assert!(!e.is_input_error());
    }

    #[test]
    fn not_a_pdf_is_input_error() {
        let e = Scan2DocxError::NotAPdf {
            source_name: "scan.png".into(),
            magic: b"\x89PNG".to_vec(),
        };
        assert!(e.is_input_error());
        assert!(e.to_string().contains("scan.png"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::Timeout { page: 7, secs: 30 };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn page_error_serialises() {
        let e = PageError::OcrFailed {
            page: 2,
            detail: "exit status 1".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("OcrFailed"));
        let back: PageError = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, e);
    }
}
