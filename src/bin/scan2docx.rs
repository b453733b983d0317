//! CLI binary for scan2docx.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, writes the DOCX, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2docx::{
    convert_to_file, inspect, output_file_name, ConversionConfig, ConversionProgressCallback,
    PageSelection, ProgressCallback, TesseractEngine, DEFAULT_LANGUAGES,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_conversion_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Rendering pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Recognising text on {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed = self.elapsed_secs(page_num);
        let (mark, note) = if text_len == 0 {
            (dim("○"), dim("blank"))
        } else {
            (green("✓"), dim(&format!("{text_len:>5} chars")))
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            mark,
            page_num,
            total,
            note,
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.elapsed_secs(page_num);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_progress(&self, pages_completed: usize, _pages_total: usize) {
        self.bar.set_position(pages_completed as u64);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognised  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (writes scan_OCR_Output.docx in the current directory)
  scan2docx scan.pdf

  # Choose the output file
  scan2docx scan.pdf -o letters/scan.docx

  # Other languages, higher resolution for small print
  scan2docx --lang deu+eng --dpi 300 vertrag.pdf

  # Only some pages
  scan2docx --pages 3-15 book.pdf

  # Convert from URL
  scan2docx https://example.com/archive/scan.pdf

  # Inspect PDF metadata (no Tesseract needed)
  scan2docx --inspect-only scan.pdf

  # Machine-readable per-page report; fail if any page failed OCR
  scan2docx --json --strict scan.pdf > report.json

ENVIRONMENT VARIABLES:
  SCAN2DOCX_TESSERACT     Path to the tesseract executable
  PDFIUM_LIB_PATH         Path to the PDFium shared library
  RUST_LOG                Log filter, e.g. scan2docx=debug

SETUP:
  1. Install Tesseract with the language data you need, e.g.
       apt install tesseract-ocr tesseract-ocr-vie tesseract-ocr-eng
  2. Make libpdfium available (system library path or PDFIUM_LIB_PATH)
  3. Convert:  scan2docx scan.pdf
"#;

/// Convert scanned PDF files to editable DOCX using OCR.
#[derive(Parser, Debug)]
#[command(
    name = "scan2docx",
    version,
    about = "Convert scanned PDF files to editable DOCX using OCR",
    long_about = "Convert scanned PDF documents (local files or URLs) into Word documents. \
Every page is rendered to an image and read by Tesseract; each page with text becomes one \
paragraph followed by a page break.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the DOCX here instead of <name>_OCR_Output.docx in the current directory.
    #[arg(short, long, env = "SCAN2DOCX_OUTPUT")]
    output: Option<PathBuf>,

    /// Tesseract languages, joined with '+'.
    #[arg(long = "lang", env = "SCAN2DOCX_LANG", default_value = DEFAULT_LANGUAGES)]
    languages: String,

    /// Path to the tesseract executable.
    #[arg(long, env = "SCAN2DOCX_TESSERACT")]
    tesseract: Option<PathBuf>,

    /// Path to the PDFium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,

    /// Rendering DPI (72–600).
    #[arg(long, env = "SCAN2DOCX_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "SCAN2DOCX_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SCAN2DOCX_PASSWORD")]
    password: Option<String>,

    /// Give up on a page after this many seconds of OCR.
    #[arg(long, env = "SCAN2DOCX_PAGE_TIMEOUT")]
    page_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SCAN2DOCX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON report (pages, metadata, stats) to stdout.
    #[arg(long, env = "SCAN2DOCX_JSON")]
    json: bool,

    /// Exit with an error if any page failed OCR.
    #[arg(long, env = "SCAN2DOCX_STRICT")]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCAN2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCAN2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCAN2DOCX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    if cli.verbose {
        log_tesseract_version(&cli).await;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(output_file_name(&cli.input)));

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert_to_file(&cli.input, &output_path, &config)
        .await
        .context("Conversion failed")?;
    let stats = &output.stats;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} paragraphs from {}/{} pages  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.paragraphs,
            stats.processed_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if stats.empty_pages > 0 {
            eprintln!("   {}", dim(&format!("{} blank pages left out", stats.empty_pages)));
        }
    }

    // Skipped pages are always reported, even with --quiet.
    for page in output.pages.iter().filter(|p| !p.is_success()) {
        if let Some(ref e) = page.error {
            eprintln!("{} {}", red("✗"), e);
        }
    }

    if cli.strict {
        output.into_result().context("Some pages were not converted")?;
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .languages(cli.languages.clone())
        .pages(parse_pages(&cli.pages)?)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.tesseract {
        builder = builder.tesseract_path(path.clone());
    }
    if let Some(ref path) = cli.pdfium {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(secs) = cli.page_timeout {
        builder = builder.page_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Log which Tesseract will run. Resolution errors are left to the conversion.
async fn log_tesseract_version(cli: &Cli) {
    let Ok(engine) = TesseractEngine::resolve(cli.tesseract.as_deref()) else {
        return;
    };
    match engine.version().await {
        Ok(v) => debug!("{} ({})", v, engine.executable().display()),
        Err(e) => debug!("Could not read tesseract version: {}", e),
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if pages.contains(&0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got 0)");
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_forms() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(parse_pages("1,3,5").unwrap(), PageSelection::Set(vec![1, 3, 5]));
    }

    #[test]
    fn parse_pages_rejects_bad_input() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("9-2").is_err());
        assert!(parse_pages("1,0").is_err());
        assert!(parse_pages("abc").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["scan2docx", "scan.pdf"]).unwrap();
        assert_eq!(cli.languages, "vie+eng");
        assert_eq!(cli.dpi, 200);
        assert!(cli.output.is_none());
    }
}
