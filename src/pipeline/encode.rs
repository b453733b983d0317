//! Image encoding: `DynamicImage` → PNG bytes for the OCR engine.
//!
//! Tesseract reads the page from stdin, so each rendered bitmap is written
//! to an in-memory PNG. PNG is lossless; JPEG artefacts around glyph edges
//! measurably hurt recognition at scan resolutions. The alpha channel is
//! dropped because Tesseract binarises on luminance anyway and RGBA pages
//! are a third larger.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as PNG bytes.
pub fn encode_page(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded {}x{} page → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}
