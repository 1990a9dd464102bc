//! CLI binary for edgequake-pdfsplit.
//!
//! A thin shim over the library crate that maps CLI flags to `SplitConfig`
//! plus a classifier and a storage backend, and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_pdfsplit::{
    AzureClassifierConfig, AzureDocumentClassifier, ClassificationResult, GraphStorage,
    GraphStorageConfig, LocalDirStorage, PageFailurePolicy, PdfiumExtractor, ProgressCallback,
    RemoteStorage, RunReport, SkipEvent, SplitConfig, SplitPipeline, SplitProgressCallback,
};
use edgequake_pdfsplit::pipeline::input::resolve_local;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Terminal progress callback: a spinner while classifying and splitting,
/// then a bar over the uploads with one log line per artifact.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Classifying");
        bar.set_message("Waiting for Document Intelligence…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Uploading");
    }
}

impl SplitProgressCallback for CliProgressCallback {
    fn on_classified(&self, documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Classification complete. Found {documents} documents."))
        ));
        self.bar.set_prefix("Splitting");
        self.bar.set_message("");
    }

    fn on_partitioned(&self, artifacts: usize, events: &[SkipEvent]) {
        for event in events {
            self.bar
                .println(format!("  {} {}", yellow("↷"), dim(&event.to_string())));
        }
        if artifacts > 0 {
            self.activate_bar(artifacts);
        }
    }

    fn on_upload_start(&self, _index: usize, _total: usize, filename: &str) {
        self.bar.set_message(filename.to_string());
    }

    fn on_upload_complete(&self, filename: &str, folder: &str) {
        self.bar.println(format!(
            "  {} {:<40} {}",
            green("✓"),
            filename,
            dim(&format!("→ {folder}"))
        ));
        self.bar.inc(1);
    }

    fn on_upload_error(&self, filename: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar
            .println(format!("  {} {:<40} {}", red("✗"), filename, red(&msg)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, uploaded: usize, failed: usize) {
        self.bar.finish_and_clear();
        let total = uploaded + failed;
        if total == 0 {
            return;
        }
        if failed == 0 {
            eprintln!(
                "{} {} files uploaded successfully",
                green("✔"),
                bold(&uploaded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files uploaded  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&uploaded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Classify, split and upload to SharePoint
  pdfsplit intake.pdf

  # Only show what the classifier found
  pdfsplit --classify-only intake.pdf

  # Write split files to a local directory instead of SharePoint
  pdfsplit --output-dir ./out intake.pdf

  # Add a document type and its destination folder
  pdfsplit --types passport,license,visa --target visa=Travel/Visa intake.pdf

  # Stop at the first page that cannot be extracted
  pdfsplit --abort-on-page-error intake.pdf

  # JSON report
  pdfsplit --json intake.pdf > report.json

OUTPUT NAMES:
  {base}_{type}.pdf for the first page of a type, then {base}_{type}_2.pdf, …
  where {base} is the input file name without its extension.

ENVIRONMENT VARIABLES:
  AZURE_DI_ENDPOINT       Document Intelligence endpoint
  AZURE_DI_KEY            Document Intelligence API key
  AZURE_DI_CLASSIFIER_ID  Trained classifier id
  SHAREPOINT_SITE_URL     e.g. https://contoso.sharepoint.com
  SHAREPOINT_SITE_PATH    e.g. /sites/Automation/Prime
  SHAREPOINT_LIBRARY      Document library folder (default: Files)
  AZURE_TENANT_ID         Entra ID tenant for Microsoft Graph
  AZURE_CLIENT_ID         App registration client id
  AZURE_CLIENT_SECRET     App registration client secret
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Override log filter (e.g. edgequake_pdfsplit=debug)
"#;

/// Classify a PDF, split it into single-page documents by type, and upload them.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsplit",
    version,
    about = "Classify a PDF, split it by document type, and upload the pages",
    long_about = "Classify a multi-document PDF with an Azure AI Document Intelligence custom \
classifier, split every claimed page into its own PDF, and upload each file to the SharePoint \
(or local) folder configured for its document type.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Document Intelligence endpoint.
    #[arg(long, env = "AZURE_DI_ENDPOINT")]
    endpoint: String,

    /// Document Intelligence API key.
    #[arg(long, env = "AZURE_DI_KEY", hide_env_values = true)]
    api_key: String,

    /// Trained classifier id.
    #[arg(long, env = "AZURE_DI_CLASSIFIER_ID")]
    classifier_id: String,

    /// Give up waiting for classification after this many seconds.
    #[arg(long, env = "PDFSPLIT_CLASSIFY_TIMEOUT", default_value_t = 300)]
    classify_timeout: u64,

    /// Recognized document types (comma-separated, case-insensitive).
    #[arg(long, env = "PDFSPLIT_TYPES", value_delimiter = ',', default_value = "passport,license")]
    types: Vec<String>,

    /// Destination folder for a type: TYPE=FOLDER. Repeatable.
    /// Defaults: passport=Passport, license=License.
    #[arg(long = "target", value_name = "TYPE=FOLDER")]
    targets: Vec<String>,

    /// Write split files below this directory instead of SharePoint.
    #[arg(short, long, env = "PDFSPLIT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// SharePoint site URL.
    #[arg(long, env = "SHAREPOINT_SITE_URL")]
    site_url: Option<String>,

    /// Server-relative SharePoint site path.
    #[arg(long, env = "SHAREPOINT_SITE_PATH", default_value = "")]
    site_path: String,

    /// Document library folder that holds all targets.
    #[arg(long, env = "SHAREPOINT_LIBRARY", default_value = "Files")]
    library: String,

    /// Entra ID tenant for Microsoft Graph.
    #[arg(long, env = "AZURE_TENANT_ID")]
    tenant_id: Option<String>,

    /// App registration client id.
    #[arg(long, env = "AZURE_CLIENT_ID")]
    client_id: Option<String>,

    /// App registration client secret.
    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Fail the whole run if any claimed page cannot be extracted.
    #[arg(long, env = "PDFSPLIT_ABORT_ON_PAGE_ERROR")]
    abort_on_page_error: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFSPLIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Print the classification and stop (no splitting, no upload).
    #[arg(long)]
    classify_only: bool,

    /// Output a JSON report instead of text.
    #[arg(long, env = "PDFSPLIT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFSPLIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFSPLIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFSPLIT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.classify_only;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn SplitProgressCallback>)
    } else {
        None
    };
    let Prepared { pipeline, storage } = prepare(&cli, progress_cb)?;

    // ── Classify-only mode ───────────────────────────────────────────────
    let Some(storage) = storage else {
        let result = pipeline
            .classify_file(&cli.input)
            .await
            .context("Classification failed")?;
        print_classification(&cli, &result)?;
        return Ok(());
    };

    if !cli.quiet && !cli.json {
        eprintln!("{} {}", dim("Destination:"), storage.describe());
    }
    let pipeline = pipeline.with_storage(storage);

    // ── Run ──────────────────────────────────────────────────────────────
    let report = pipeline
        .run(&cli.input)
        .await
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    // Per-artifact upload failures are reported, not fatal.
    print_report(&cli, &report, show_progress)?;
    Ok(())
}

/// A pipeline ready to run, plus its destination unless `--classify-only`.
struct Prepared {
    pipeline: SplitPipeline,
    storage: Option<Arc<dyn RemoteStorage>>,
}

/// Everything that can be checked without a network call, input file first.
fn prepare(cli: &Cli, progress: Option<ProgressCallback>) -> Result<Prepared> {
    resolve_local(&cli.input)?;
    let config = build_config(cli, progress)?;

    let mut azure = AzureClassifierConfig::new(&cli.endpoint, &cli.api_key);
    azure.max_wait_secs = cli.classify_timeout;
    let classifier =
        AzureDocumentClassifier::new(azure).context("Invalid Document Intelligence settings")?;

    let extractor = PdfiumExtractor::new(config.pdfium_library_path.clone());
    let storage = if cli.classify_only {
        None
    } else {
        extractor
            .check_available()
            .context("PDFium library not available (set PDFIUM_LIB_PATH)")?;
        Some(build_storage(cli)?)
    };

    let pipeline = SplitPipeline::new(config, Arc::new(classifier), Arc::new(extractor));
    Ok(Prepared { pipeline, storage })
}

/// Map CLI args to `SplitConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SplitConfig> {
    let mut builder = SplitConfig::builder()
        .classifier_id(&cli.classifier_id)
        .recognized_types(cli.types.iter().map(|t| t.trim()).filter(|t| !t.is_empty()))
        .page_failure_policy(if cli.abort_on_page_error {
            PageFailurePolicy::Abort
        } else {
            PageFailurePolicy::Skip
        });

    for target in &cli.targets {
        let (doc_type, folder) = parse_target(target)?;
        builder = builder.storage_target(doc_type, folder);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--target TYPE=FOLDER`.
fn parse_target(s: &str) -> Result<(&str, &str)> {
    match s.split_once('=') {
        Some((t, f)) if !t.trim().is_empty() && !f.trim().is_empty() => Ok((t.trim(), f.trim())),
        _ => bail!("Invalid --target '{}': expected TYPE=FOLDER", s),
    }
}

/// Local directory when `--output-dir` is given, SharePoint otherwise.
fn build_storage(cli: &Cli) -> Result<Arc<dyn RemoteStorage>> {
    if let Some(ref dir) = cli.output_dir {
        return Ok(Arc::new(LocalDirStorage::new(dir)));
    }

    let (Some(site_url), Some(tenant), Some(client_id), Some(secret)) = (
        cli.site_url.as_ref(),
        cli.tenant_id.as_ref(),
        cli.client_id.as_ref(),
        cli.client_secret.as_ref(),
    ) else {
        bail!(
            "No destination: pass --output-dir, or set SHAREPOINT_SITE_URL, AZURE_TENANT_ID, \
             AZURE_CLIENT_ID and AZURE_CLIENT_SECRET"
        );
    };

    let config = GraphStorageConfig::new(tenant, client_id, secret, site_url, &cli.site_path)
        .document_library(&cli.library);
    let storage = GraphStorage::new(config).context("Invalid SharePoint settings")?;
    Ok(Arc::new(storage))
}

fn print_classification(cli: &Cli, result: &ClassificationResult) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("Failed to serialise classification")?
        );
        return Ok(());
    }

    println!("=== CLASSIFICATION RESULT ===");
    if result.is_empty() {
        println!("No documents found.");
    }
    for (i, doc) in result.documents.iter().enumerate() {
        println!();
        println!("Document {}", i + 1);
        println!("Type:       {}", doc.doc_type);
        println!("Confidence: {:.3}", doc.confidence);
        for page in doc.page_numbers() {
            println!("Page:       {}", page);
        }
    }
    Ok(())
}

fn print_report(cli: &Cli, report: &RunReport, show_progress: bool) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialise report")?
        );
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    if report.artifacts == 0 {
        eprintln!("No valid documents to upload");
        return Ok(());
    }

    // The callback already printed per-file lines and the summary tick.
    if !show_progress {
        for event in &report.events {
            eprintln!("  {} {}", yellow("↷"), event);
        }
        for upload in &report.uploads {
            eprintln!("  {} {}  →  {}", green("✓"), upload.filename, upload.location);
        }
        for failure in &report.failures {
            eprintln!("  {} {}", red("✗"), failure);
        }
    }
    eprintln!(
        "{}  {}/{} files  {}ms total",
        if report.is_complete() { green("✔") } else { cyan("⚠") },
        report.uploads.len(),
        report.artifacts,
        report.stats.total_duration_ms,
    );
    Ok(())
}
