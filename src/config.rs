//! Configuration types for scanned-PDF-to-DOCX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Collaborators that used to be global
//! state (the Tesseract executable, the PDFium library) are explicit fields
//! here, so two conversions in one process can use different setups.

use crate::engine::OcrEngine;
use crate::error::Scan2DocxError;
use crate::pipeline::render::Rasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Tesseract language hints used when none are configured.
pub const DEFAULT_LANGUAGES: &str = "vie+eng";

/// Configuration for a scanned-PDF-to-DOCX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use scan2docx::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(300)
///     .languages("deu+eng")
///     .page_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 200.
    ///
    /// Tesseract is tuned for text around 300 DPI; 200 keeps memory modest
    /// while still reading body text reliably. Raise it for small print.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 5000.
    ///
    /// Caps either dimension independent of DPI so an oversized page (a
    /// poster, an engineering drawing) cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// Tesseract language hints, `+`-joined. Default: `vie+eng`.
    pub languages: String,

    /// Explicit path to the `tesseract` executable.
    ///
    /// When `None`, the `SCAN2DOCX_TESSERACT` environment variable and then
    /// `PATH` are searched. See [`crate::engine::TesseractEngine::resolve`].
    pub tesseract_path: Option<PathBuf>,

    /// Explicit path to the PDFium shared library.
    ///
    /// When `None`, `PDFIUM_LIB_PATH` and then the system library search
    /// path are used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Pre-constructed OCR engine. Takes precedence over `tesseract_path`.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Pre-constructed rasteriser. Takes precedence over `pdfium_lib_path`.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Per-page OCR timeout in seconds. Default: none.
    ///
    /// A page that exceeds it is skipped like any other per-page failure.
    pub page_timeout_secs: Option<u64>,

    /// Copy PDF title and author into the DOCX core properties. Default: true.
    pub include_metadata: bool,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Observer notified as each page finishes.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 5000,
            languages: DEFAULT_LANGUAGES.to_string(),
            tesseract_path: None,
            pdfium_lib_path: None,
            ocr_engine: None,
            rasterizer: None,
            password: None,
            pages: PageSelection::default(),
            page_timeout_secs: None,
            include_metadata: true,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("languages", &self.languages)
            .field("tesseract_path", &self.tesseract_path)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("include_metadata", &self.include_metadata)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn languages(mut self, langs: impl Into<String>) -> Self {
        self.config.languages = langs.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = Some(path.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = Some(secs);
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Scan2DocxError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Scan2DocxError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        validate_languages(&c.languages)?;
        if c.page_timeout_secs == Some(0) {
            return Err(Scan2DocxError::InvalidConfig(
                "Page timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Tesseract language codes are ASCII identifiers joined with `+`.
fn validate_languages(langs: &str) -> Result<(), Scan2DocxError> {
    let valid = !langs.is_empty()
        && langs.split('+').all(|code| {
            !code.is_empty()
                && code
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        });
    if valid {
        Ok(())
    } else {
        Err(Scan2DocxError::InvalidConfig(format!(
            "Invalid OCR language list '{langs}' (expected codes like 'vie+eng')"
        )))
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// First requested page number, used in out-of-range errors.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.languages, "vie+eng");
        assert!(c.tesseract_path.is_none());
        assert!(c.page_timeout_secs.is_none());
        assert_eq!(c.pages, PageSelection::All);
    }

    #[test]
    fn build_rejects_out_of_range_dpi() {
        for dpi in [1, 71, 601, 10_000] {
            let err = ConversionConfig::builder().dpi(dpi).build().unwrap_err();
            assert!(matches!(err, Scan2DocxError::InvalidConfig(_)), "dpi {dpi}");
        }
        assert_eq!(ConversionConfig::builder().dpi(72).build().unwrap().dpi, 72);
        assert_eq!(ConversionConfig::builder().dpi(600).build().unwrap().dpi, 600);
    }

    #[test]
    fn builder_rejects_bad_languages() {
        for bad in ["", "vie+", "+eng", "vie eng", "eng;rm"] {
            let err = ConversionConfig::builder().languages(bad).build();
            assert!(
                matches!(err, Err(Scan2DocxError::InvalidConfig(_))),
                "accepted {bad:?}"
            );
        }
        assert!(ConversionConfig::builder()
            .languages("chi_sim+eng")
            .build()
            .is_ok());
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = ConversionConfig::builder().page_timeout_secs(0).build();
        assert!(matches!(err, Err(Scan2DocxError::InvalidConfig(_))));
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn page_selection_all() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert!(PageSelection::All.to_indices(0).is_empty());
    }

    #[test]
    fn page_selection_range_clipping() {
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
    }

    #[test]
    fn page_selection_set_dedup_and_sort() {
        let indices = PageSelection::Set(vec![3, 1, 3, 2, 99]).to_indices(5);
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn first_requested_page() {
        assert_eq!(PageSelection::Single(9).first_requested(), 9);
        assert_eq!(PageSelection::Set(vec![5, 2]).first_requested(), 2);
    }
}
