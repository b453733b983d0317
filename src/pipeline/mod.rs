//! Pipeline stages for scanned-PDF-to-DOCX conversion.
//!
//! Each submodule implements exactly one transformation step, so a stage can
//! be swapped (another rasteriser, another OCR engine) without touching the
//! others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr
//! (path/URL) (pdfium)   (PNG)   (engine)
//! ```
//!
//! 1. [`input`]  — read the local file or download the URL; check `%PDF`
//! 2. [`render`] — rasterise selected pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`] — PNG-encode each `DynamicImage` for the engine's stdin
//! 4. [`ocr`]    — call the engine, turning per-page failures into
//!    [`crate::error::PageError`] and a missing engine into a fatal error
//!
//! Assembling the recognised text into a document lives in [`crate::docx`].

pub mod encode;
pub mod input;
pub mod ocr;
pub mod render;
