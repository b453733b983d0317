//! Result types returned by the conversion entry points.
//!
//! A conversion that reaches the end always yields a [`ConversionOutput`],
//! even when some pages failed OCR. The per-page [`PageResult`] list keeps
//! those failures visible: the DOCX simply lacks the content, so the report
//! is the only place the caller can find out which pages are missing.

use crate::error::{PageError, Scan2DocxError};
use serde::{Deserialize, Serialize};

/// MIME type of the generated document.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Suffix appended to the source file stem when deriving the output name.
pub const OUTPUT_SUFFIX: &str = "_OCR_Output.docx";

/// Complete output of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Serialised DOCX package.
    #[serde(skip)]
    pub document: Vec<u8>,
    /// One entry per processed page, in page order.
    pub pages: Vec<PageResult>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Pages whose OCR failed, in page order.
    pub fn failed_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| p.error.is_some())
            .map(|p| p.page_num)
            .collect()
    }

    /// Treat any page failure as an error.
    ///
    /// Returns the output unchanged when every page was recognised (blank
    /// pages count as recognised).
    pub fn into_result(self) -> Result<Self, Scan2DocxError> {
        let failed = self.failed_pages();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(Scan2DocxError::PartialFailure {
                failed: failed.len(),
                total: self.pages.len(),
                pages: failed,
            })
        }
    }
}

/// Outcome of OCR on a single page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Recognised text exactly as the engine returned it. Empty on failure.
    pub text: String,
    /// Wall-clock time spent on OCR for this page.
    pub duration_ms: u64,
    /// Set when the page was skipped because OCR failed.
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// `true` when the page produces a paragraph in the document.
    pub fn has_content(&self) -> bool {
        self.error.is_none() && !self.text.trim().is_empty()
    }
}

/// Metadata read from the PDF information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate statistics for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source PDF.
    pub total_pages: usize,
    /// Pages that were rasterised and handed to OCR.
    pub processed_pages: usize,
    /// Pages that produced a paragraph.
    pub paragraphs: usize,
    /// Pages recognised as blank.
    pub empty_pages: usize,
    /// Pages skipped because OCR failed.
    pub failed_pages: usize,
    /// Size of the serialised DOCX.
    pub document_bytes: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
}

/// Derive the download name for a converted file.
///
/// `scan.pdf` becomes `scan_OCR_Output.docx`; directory components are
/// dropped and a name without an extension keeps its full stem.
pub fn output_file_name(input_name: &str) -> String {
    let file_name = input_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input_name);
    let stem = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };
    let stem = if stem.is_empty() { "document" } else { stem };
    format!("{stem}{OUTPUT_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(num: usize, text: &str, error: Option<PageError>) -> PageResult {
        PageResult {
            page_num: num,
            text: text.to_string(),
            duration_ms: 0,
            error,
        }
    }

    fn output(pages: Vec<PageResult>) -> ConversionOutput {
        ConversionOutput {
            document: Vec::new(),
            pages,
            metadata: DocumentMetadata::default(),
            stats: ConversionStats::default(),
        }
    }

    #[test]
    fn output_name_replaces_extension() {
        assert_eq!(output_file_name("scan.pdf"), "scan_OCR_Output.docx");
        assert_eq!(output_file_name("a.b.pdf"), "a.b_OCR_Output.docx");
    }

    #[test]
    fn output_name_strips_directories() {
        assert_eq!(output_file_name("/tmp/in/report.PDF"), "report_OCR_Output.docx");
        assert_eq!(output_file_name(r"C:\scans\x.pdf"), "x_OCR_Output.docx");
    }

    #[test]
    fn output_name_without_extension() {
        assert_eq!(output_file_name("scan"), "scan_OCR_Output.docx");
        assert_eq!(output_file_name(".hidden"), ".hidden_OCR_Output.docx");
        assert_eq!(output_file_name(""), "document_OCR_Output.docx");
    }

    #[test]
    fn blank_page_has_no_content_but_succeeds() {
        let p = page(1, "  \n\t", None);
        assert!(p.is_success());
        assert!(!p.has_content());
    }

    #[test]
    fn into_result_passes_clean_output() {
        let out = output(vec![page(1, "Hello", None), page(2, "", None)]);
        assert!(out.into_result().is_ok());
    }

    #[test]
    fn into_result_reports_failed_pages() {
        let err = PageError::OcrFailed {
            page: 2,
            detail: "boom".into(),
        };
        let out = output(vec![page(1, "Hello", None), page(2, "", Some(err))]);
        assert_eq!(out.failed_pages(), vec![2]);
        match out.into_result() {
            Err(Scan2DocxError::PartialFailure { failed, total, pages }) => {
                assert_eq!((failed, total), (1, 2));
                assert_eq!(pages, vec![2]);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn json_report_omits_document_bytes() {
        let mut out = output(vec![page(1, "Hello", None)]);
        out.document = vec![0x50, 0x4b, 0x03, 0x04];
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("document").is_none());
        assert_eq!(json["pages"][0]["text"], "Hello");
    }
}
