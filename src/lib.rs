//! # scan2docx
//!
//! Turn scanned PDF documents into editable Word files using OCR.
//!
//! A scanned PDF holds pictures of pages, not text. This crate rasterises
//! each page with PDFium, hands the picture to an OCR engine (Tesseract by
//! default), and writes the recognised text into a DOCX: one paragraph per
//! page, each followed by a page break. Pages that come back blank are left
//! out.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Input   resolve local file or download from URL; check %PDF
//!  ├─ 2. Engine  locate Tesseract (explicit path → env var → PATH)
//!  ├─ 3. Render  rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 4. Encode  page image → PNG
//!  ├─ 5. OCR     one page at a time, in page order
//!  └─ 6. Output  paragraph + page break per non-blank page → DOCX bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2docx::{convert, output_file_name, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("scan.pdf", &config).await?;
//!     std::fs::write(output_file_name("scan.pdf"), &output.document)?;
//!     eprintln!("{} paragraphs, {} pages failed",
//!         output.stats.paragraphs,
//!         output.stats.failed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2docx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! scan2docx = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Programs
//!
//! | Program | Located via | Needed by |
//! |---------|-------------|-----------|
//! | `tesseract` (with `vie` and `eng` data) | `--tesseract`, `SCAN2DOCX_TESSERACT`, `PATH` | OCR |
//! | PDFium shared library | `--pdfium`, `PDFIUM_LIB_PATH`, system library path | rendering, [`inspect`] |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod docx;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection, DEFAULT_LANGUAGES};
pub use convert::{convert, convert_bytes, convert_sync, convert_to_file, inspect};
pub use docx::{Block, DocxDocument};
pub use engine::{OcrEngine, TesseractEngine, TESSERACT_ENV};
pub use error::{OcrError, PageError, Scan2DocxError};
pub use output::{
    output_file_name, ConversionOutput, ConversionStats, DocumentMetadata, PageResult,
    DOCX_MIME_TYPE,
};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer, RenderRequest, PDFIUM_LIB_ENV};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, PageStream};
