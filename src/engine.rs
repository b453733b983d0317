//! OCR engine abstraction and the Tesseract command-line backend.
//!
//! The pipeline only sees [`OcrEngine`]: PNG bytes in, text out. The one
//! distinction it cares about is [`OcrError::EngineUnavailable`] (nothing
//! will work, abort) versus [`OcrError::Failed`] (this page is bad, skip it).
//!
//! ## Locating Tesseract
//!
//! [`TesseractEngine::resolve`] looks for the executable in this order:
//!
//! 1. the explicit path from [`crate::ConversionConfig::tesseract_path`]
//! 2. the `SCAN2DOCX_TESSERACT` environment variable
//! 3. `tesseract` on `PATH`
//!
//! and fails with `EngineUnavailable` when none of them exists. An explicit
//! path that does not exist is an error on its own; it never falls through
//! to a different binary.

use crate::error::OcrError;
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Environment variable naming the Tesseract executable.
pub const TESSERACT_ENV: &str = "SCAN2DOCX_TESSERACT";

/// Text recognition for one page image.
///
/// Implementations must be `Send + Sync`; the converter holds them behind an
/// `Arc` and may run several conversions at once.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "ocr"
    }

    /// Recognise the text in a PNG-encoded page.
    ///
    /// `languages` is a `+`-joined list of language codes, e.g. `vie+eng`.
    async fn recognize(&self, png: &[u8], languages: &str) -> Result<String, OcrError>;
}

/// OCR backed by the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
}

impl TesseractEngine {
    /// Use the executable at `executable` without any lookup.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Locate Tesseract from the explicit path, the environment, or `PATH`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, OcrError> {
        resolve_with(
            explicit,
            std::env::var_os(TESSERACT_ENV),
            std::env::var_os("PATH"),
        )
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// First line of `tesseract --version`.
    pub async fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .output()
            .await
            .map_err(|e| spawn_error(&self.executable, e))?;

        if !output.status.success() {
            return Err(OcrError::unavailable(format!(
                "'{}' --version exited with {}",
                self.executable.display(),
                output.status
            )));
        }

        // Tesseract 3.x printed the version on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        Ok(text
            .lines()
            .next()
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string()))
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, png: &[u8], languages: &str) -> Result<String, OcrError> {
        let mut child = Command::new(&self.executable)
            .args(["stdin", "stdout", "-l", languages])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.executable, e))?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(png).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| OcrError::failed(format!("waiting for tesseract: {e}")))?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(classify_failure(output.status.code(), &stderr));
        }
        if let Err(e) = fed {
            return Err(OcrError::failed(format!("writing image to tesseract: {e}")));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract returned {} bytes", text.len());
        Ok(text)
    }
}

/// Resolution order with the environment passed in, so tests need not
/// touch process-global state.
fn resolve_with(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    path_var: Option<OsString>,
) -> Result<TesseractEngine, OcrError> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(TesseractEngine::new(path))
        } else {
            Err(OcrError::unavailable(format!(
                "configured tesseract path '{}' does not exist",
                path.display()
            )))
        };
    }

    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(&value);
        return if path.is_file() {
            Ok(TesseractEngine::new(path))
        } else {
            Err(OcrError::unavailable(format!(
                "{TESSERACT_ENV}='{}' does not exist",
                path.display()
            )))
        };
    }

    path_var
        .as_deref()
        .and_then(|p| find_on_path("tesseract", p))
        .map(TesseractEngine::new)
        .ok_or_else(|| OcrError::unavailable("tesseract was not found on PATH"))
}

fn find_on_path(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| {
            let plain = dir.join(program);
            let exe = dir.join(format!("{program}.exe"));
            if cfg!(windows) {
                vec![exe, plain]
            } else {
                vec![plain]
            }
        })
        .find(|candidate| candidate.is_file())
}

fn spawn_error(executable: &Path, e: std::io::Error) -> OcrError {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => OcrError::unavailable(format!(
            "cannot run '{}': {e}",
            executable.display()
        )),
        _ => OcrError::failed(format!("spawning '{}': {e}", executable.display())),
    }
}

/// Missing language data fails every page the same way, so it counts as an
/// unavailable engine rather than a page failure.
fn classify_failure(code: Option<i32>, stderr: &str) -> OcrError {
    const MISSING_DATA: [&str; 3] = [
        "Failed loading language",
        "Error opening data file",
        "Could not initialize tesseract",
    ];

    let detail: String = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join("; ");
    let detail = match (code, detail.is_empty()) {
        (Some(c), true) => format!("tesseract exited with status {c}"),
        (None, true) => "tesseract was terminated by a signal".to_string(),
        (_, false) => detail,
    };

    if MISSING_DATA.iter().any(|m| stderr.contains(m)) {
        OcrError::unavailable(detail)
    } else {
        OcrError::failed(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_binary(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, b"#!/bin/sh\n").unwrap();
        p
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = fake_binary(dir.path(), "my-tesseract");
        let engine = resolve_with(
            Some(&explicit),
            Some(OsString::from("/nonexistent/env-tesseract")),
            None,
        )
        .unwrap();
        assert_eq!(engine.executable(), explicit);
    }

    #[test]
    fn explicit_missing_path_does_not_fall_through() {
        let dir = tempfile::tempdir().unwrap();
        fake_binary(dir.path(), "tesseract");
        let err = resolve_with(
            Some(Path::new("/nonexistent/tesseract")),
            None,
            Some(dir.path().as_os_str().to_owned()),
        )
        .unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable { .. }));
    }

    #[test]
    fn env_used_before_path() {
        let env_dir = tempfile::tempdir().unwrap();
        let path_dir = tempfile::tempdir().unwrap();
        let from_env = fake_binary(env_dir.path(), "tess");
        fake_binary(path_dir.path(), "tesseract");
        let engine = resolve_with(
            None,
            Some(from_env.clone().into_os_string()),
            Some(path_dir.path().as_os_str().to_owned()),
        )
        .unwrap();
        assert_eq!(engine.executable(), from_env);
    }

    #[test]
    fn empty_env_is_ignored() {
        let path_dir = tempfile::tempdir().unwrap();
        let on_path = fake_binary(path_dir.path(), "tesseract");
        let engine = resolve_with(
            None,
            Some(OsString::new()),
            Some(path_dir.path().as_os_str().to_owned()),
        )
        .unwrap();
        assert_eq!(engine.executable(), on_path);
    }

    #[cfg(unix)]
    #[test]
    fn path_lookup_searches_every_entry() {
        let empty = tempfile::tempdir().unwrap();
        let with_bin = tempfile::tempdir().unwrap();
        let expected = fake_binary(with_bin.path(), "tesseract");
        let path_var = std::env::join_paths([empty.path(), with_bin.path()]).unwrap();
        let engine = resolve_with(None, None, Some(path_var)).unwrap();
        assert_eq!(engine.executable(), expected);
    }

    #[test]
    fn nothing_found_is_unavailable() {
        let empty = tempfile::tempdir().unwrap();
        let err = resolve_with(None, None, Some(empty.path().as_os_str().to_owned()))
            .unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable { .. }));
        let err = resolve_with(None, None, None).unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable { .. }));
    }

    #[test]
    fn missing_language_data_is_unavailable() {
        let stderr = "Error opening data file /usr/share/tessdata/vie.traineddata\n\
                      Failed loading language 'vie'\n";
        assert!(matches!(
            classify_failure(Some(1), stderr),
            OcrError::EngineUnavailable { .. }
        ));
    }

    #[test]
    fn other_failures_are_per_page() {
        let err = classify_failure(Some(1), "Error in pixReadStream: Unknown format\n");
        match err {
            OcrError::Failed { detail } => assert!(detail.contains("Unknown format")),
            other => panic!("expected Failed, got {other:?}"),
        }
        let err = classify_failure(Some(2), "");
        assert_eq!(err, OcrError::failed("tesseract exited with status 2"));
    }

    #[tokio::test]
    async fn missing_executable_reports_unavailable() {
        let engine = TesseractEngine::new("/nonexistent/bin/tesseract");
        let err = engine.recognize(b"not used", "eng").await.unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable { .. }));
    }

    #[cfg(unix)]
    fn fake_tesseract(dir: &Path, body: &str) -> TesseractEngine {
        use std::os::unix::fs::PermissionsExt;
        let p = dir.join("tesseract");
        fs::write(&p, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&p, fs::Permissions::from_mode(0o755)).unwrap();
        TesseractEngine::new(p)
    }

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really an image";

    #[cfg(unix)]
    #[tokio::test]
    async fn recognize_returns_stdout_untrimmed() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_tesseract(dir.path(), r"cat > /dev/null; printf 'Xin chao\n\f'");
        let text = engine.recognize(PNG, "vie+eng").await.unwrap();
        assert_eq!(text, "Xin chao\n\u{c}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recognize_feeds_png_on_stdin_with_language_args() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_tesseract(dir.path(), r#"printf '%s|' "$@"; wc -c | tr -d ' '"#);
        let text = engine.recognize(PNG, "vie+eng").await.unwrap();
        assert_eq!(text.trim(), format!("stdin|stdout|-l|vie+eng|{}", PNG.len()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recognize_missing_language_data_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_tesseract(
            dir.path(),
            r#"echo "Failed loading language 'vie'" >&2; exit 1"#,
        );
        let err = engine.recognize(PNG, "vie+eng").await.unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recognize_other_failure_skips_page() {
        let dir = tempfile::tempdir().unwrap();
        let engine = fake_tesseract(dir.path(), r"echo 'Error in pixReadStream' >&2; exit 1");
        let err = engine.recognize(PNG, "vie+eng").await.unwrap_err();
        assert_eq!(err, OcrError::failed("Error in pixReadStream"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn recognize_non_executable_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(fake_binary(dir.path(), "tesseract"));
        let err = engine.recognize(PNG, "eng").await.unwrap_err();
        assert!(matches!(err, OcrError::EngineUnavailable { .. }), "{err:?}");
    }
}
