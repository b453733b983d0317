//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The converter works on an in-memory byte slice, so both local files and
//! downloads end up as a [`ResolvedInput`] holding the bytes plus a display
//! name. The `%PDF` header is checked here, before PDFium or the OCR engine
//! ever see the data, so garbage input fails fast with a readable error.

use crate::error::Scan2DocxError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Magic bytes every PDF file starts with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// How far into the file the header may appear. Some producers prepend junk.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// PDF bytes together with a name for messages and output naming.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// File name (local) or last URL segment (download).
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes.
///
/// If the input is a URL, download it. If the input is a local file,
/// read it. Either way the PDF header is validated.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Scan2DocxError> {
    if input.trim().is_empty() {
        return Err(Scan2DocxError::InvalidInput {
            input: input.to_string(),
        });
    }

    let resolved = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };

    check_pdf_header(&resolved.name, &resolved.bytes)?;
    Ok(resolved)
}

/// Reject bytes that do not carry a `%PDF` header.
pub fn check_pdf_header(name: &str, bytes: &[u8]) -> Result<(), Scan2DocxError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Ok(());
    }
    Err(Scan2DocxError::NotAPdf {
        source_name: name.to_string(),
        magic: bytes.iter().take(8).copied().collect(),
    })
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, Scan2DocxError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Scan2DocxError::PermissionDenied { path: path.clone() },
        _ => Scan2DocxError::FileNotFound { path: path.clone() },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedInput { name, bytes })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Scan2DocxError> {
    info!("Downloading PDF from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| Scan2DocxError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Scan2DocxError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Scan2DocxError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Scan2DocxError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(parsed.clone()).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(Scan2DocxError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_send_err)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(ResolvedInput {
        name: filename_from_url(&parsed),
        bytes: bytes.to_vec(),
    })
}

/// Last non-empty path segment, or `downloaded.pdf`.
fn filename_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn header_accepted() {
        assert!(check_pdf_header("a.pdf", b"%PDF-1.7\n...").is_ok());
        assert!(check_pdf_header("a.pdf", b"\xEF\xBB\xBF%PDF-1.4").is_ok());
    }

    #[test]
    fn header_rejected() {
        let err = check_pdf_header("scan.png", b"\x89PNG\r\n\x1a\n....").unwrap_err();
        match err {
            Scan2DocxError::NotAPdf { source_name, magic } => {
                assert_eq!(source_name, "scan.png");
                assert_eq!(&magic[..4], b"\x89PNG");
            }
            other => panic!("expected NotAPdf, got {other:?}"),
        }
        assert!(check_pdf_header("empty.pdf", b"").is_err());
    }

    #[test]
    fn filename_from_url_segments() {
        let u = reqwest::Url::parse("https://example.com/files/scan.pdf").unwrap();
        assert_eq!(filename_from_url(&u), "scan.pdf");
        let u = reqwest::Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&u), "downloaded.pdf");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Scan2DocxError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_non_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"just some text").unwrap();
        let err = resolve_input(path.to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, Scan2DocxError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn local_pdf_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%%EOF").unwrap();
        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.name, "scan.pdf");
        assert!(resolved.bytes.starts_with(PDF_MAGIC));
    }
}
