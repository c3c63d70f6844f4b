//! CLI binary for pdfbatch.
//!
//! A thin shim over the library crate that maps CLI flags onto
//! `ImageToPdfConfig` / `DownsampleConfig` and prints the run summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdfbatch::{
    downsample_pdf, images_to_pdf, ConversionProgressCallback, ConversionReport,
    DownsampleConfig, ImageToPdfConfig, PdfBatchError, ProgressCallback, RotationAngle,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};
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

fn bar_style(unit: &str) -> ProgressStyle {
    ProgressStyle::with_template(&format!(
        "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>4}}/{{len}} {unit}  \
         ⏱ {{elapsed_precise}}  ETA {{eta_precise}}"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(TICKS)
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar for the transform phase, reused for assembly.
struct CliProgressCallback {
    bar: ProgressBar,
    unit: &'static str,
    /// A dropped chunk reports each lost page with the same message.
    last_error: Mutex<String>,
}

impl CliProgressCallback {
    fn new(unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message(format!("Scanning {unit}…"));
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            unit,
            last_error: Mutex::new(String::new()),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_units: usize) {
        self.bar.set_style(bar_style(self.unit));
        self.bar.set_length(total_units as u64);
        self.bar.set_prefix("Processing");
        self.bar.reset_eta();
    }

    fn on_unit_complete(&self, _index: usize, _total_units: usize) {
        self.bar.inc(1);
    }

    fn on_unit_error(&self, _index: usize, _total_units: usize, error: &str) {
        let mut last = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        if *last != error {
            let msg = if error.chars().count() > 100 {
                format!("{}…", error.chars().take(99).collect::<String>())
            } else {
                error.to_string()
            };
            self.bar.println(format!("  {} {}", yellow("⚠"), msg));
            *last = error.to_string();
        }
        self.bar.inc(1);
    }

    fn on_assembly_start(&self, total_pages: usize) {
        self.bar.set_style(bar_style("pages"));
        self.bar.set_length(total_pages as u64);
        self.bar.set_position(0);
        self.bar.set_prefix("Assembling");
        self.bar.reset_eta();
    }

    fn on_page_written(&self, written: usize, _total_pages: usize) {
        self.bar.set_position(written as u64);
    }

    fn on_conversion_complete(&self, _total_units: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Folder of scans → one PDF, landscape pages turned portrait
  pdfbatch images ./scans -o book.pdf

  # Keep orientation, larger pages, better quality
  pdfbatch images ./photos -o album.pdf --no-portrait --max-width 2000 --max-height 2000 -q 92

  # Rotate landscape images the other way
  pdfbatch images ./scans -o book.pdf --rotation 90

  # Shrink a PDF (writes report_dwn.pdf)
  pdfbatch downsample report.pdf

  # Sharper result, custom output, JSON report on stdout
  pdfbatch --json downsample report.pdf --dpi 96 --quality 50 -o small.pdf

EXIT CODES:
  0  success (some units may still have been skipped)
  1  other error
  2  no input found
  3  no input could be processed
  4  output could not be saved

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory
  RUST_LOG                Override the log filter (e.g. pdfbatch=debug)
"#;

/// Assemble image folders into PDFs and shrink existing PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdfbatch",
    version,
    about = "Assemble image folders into PDFs and shrink existing PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the run report as JSON on stdout instead of a summary.
    #[arg(long, global = true, env = "PDFBATCH_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "PDFBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFBATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short = 's', long, global = true, env = "PDFBATCH_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Combine every image in a folder into one PDF.
    Images(ImagesArgs),
    /// Re-render a PDF at a lower resolution.
    Downsample(DownsampleArgs),
}

#[derive(Args, Debug)]
struct ImagesArgs {
    /// Folder holding .jpg .jpeg .png .bmp .tiff files (not searched recursively).
    dir: PathBuf,

    /// Output PDF. Default: `<DIR>.pdf` next to the folder.
    #[arg(short, long, env = "PDFBATCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Maximum page width in pixels.
    #[arg(long, env = "PDFBATCH_MAX_WIDTH", default_value_t = 1200)]
    max_width: u32,

    /// Maximum page height in pixels.
    #[arg(long, env = "PDFBATCH_MAX_HEIGHT", default_value_t = 1600)]
    max_height: u32,

    /// JPEG quality (1–100).
    #[arg(short, long, env = "PDFBATCH_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Keep landscape images landscape.
    #[arg(long, env = "PDFBATCH_NO_PORTRAIT")]
    no_portrait: bool,

    /// Rotation for landscape images: -90 (clockwise), 90, 180 or 270.
    #[arg(long, env = "PDFBATCH_ROTATION", default_value_t = -90, allow_hyphen_values = true)]
    rotation: i32,

    /// Worker threads. Default: all cores.
    #[arg(short, long, env = "PDFBATCH_WORKERS")]
    workers: Option<usize>,
}

#[derive(Args, Debug)]
struct DownsampleArgs {
    /// PDF to shrink.
    input: PathBuf,

    /// Output PDF. Default: `<stem>_dwn.pdf` next to the input.
    #[arg(short, long, env = "PDFBATCH_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering DPI (72 keeps the page size in pixels equal to points).
    #[arg(long, env = "PDFBATCH_DPI", default_value_t = 60,
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    dpi: u32,

    /// JPEG quality (1–100).
    #[arg(short, long, env = "PDFBATCH_QUALITY", default_value_t = 30,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Worker threads (at most 8). Default: min(cores, 8).
    #[arg(short, long, env = "PDFBATCH_WORKERS")]
    workers: Option<usize>,

    /// Drop a whole chunk of pages when any page in it fails.
    #[arg(long, env = "PDFBATCH_FAIL_WHOLE_CHUNK")]
    fail_whole_chunk: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFBATCH_PASSWORD")]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are hidden while the progress bar is active.
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

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Exit code of the first library error in the chain, or 1.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PdfBatchError>())
        .map(PdfBatchError::exit_code)
        .unwrap_or(1)
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    ensure_pdfium(cli.quiet)?;

    match &cli.command {
        Command::Images(args) => run_images(cli, args, show_progress).await,
        Command::Downsample(args) => run_downsample(cli, args, show_progress).await,
    }
}

/// Make sure the pdfium library is on disk before any work starts.
///
/// On the very first run this downloads it (~30 MB); afterwards it is only a
/// path check.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length() != Some(t) {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

fn progress_for(show_progress: bool, unit: &'static str) -> Option<ProgressCallback> {
    show_progress.then(|| CliProgressCallback::new(unit) as ProgressCallback)
}

// ── images ───────────────────────────────────────────────────────────────────

fn default_images_output(dir: &Path) -> PathBuf {
    let trimmed: PathBuf = dir.components().collect();
    let name = trimmed
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "images".to_string());
    trimmed.with_file_name(format!("{name}.pdf"))
}

async fn run_images(cli: &Cli, args: &ImagesArgs, show_progress: bool) -> Result<()> {
    let mut builder = ImageToPdfConfig::builder()
        .max_size(args.max_width, args.max_height)
        .quality(args.quality)
        .force_portrait(!args.no_portrait)
        .rotation(RotationAngle::try_from(args.rotation)?);
    if let Some(n) = args.workers {
        builder = builder.workers(n);
    }
    if let Some(cb) = progress_for(show_progress, "images") {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_images_output(&args.dir));

    if !cli.quiet && !cli.json {
        eprintln!("{}", cyan(&bold("Image folder → PDF")));
        eprintln!("Source folder:  {}", args.dir.display());
        eprintln!("Output PDF:     {}", output.display());
        if config.force_portrait {
            eprintln!("Portrait mode:  enabled, rotating {}", config.rotation);
        } else {
            eprintln!("Portrait mode:  disabled");
        }
        eprintln!("Workers:        {}", config.workers);
        eprintln!();
    }

    let report = images_to_pdf(&args.dir, &output, &config)
        .await
        .context("Image conversion failed")?;

    if cli.json {
        print_json(&report)?;
    } else if !cli.quiet {
        print_images_summary(&report, &config);
    }
    Ok(())
}

fn print_images_summary(report: &ConversionReport, config: &ImageToPdfConfig) {
    let stats = &report.stats;
    let tally = &report.tally;
    let processed = stats.pages_written;

    eprintln!("{} Processed {} images successfully", green("✔"), bold(&processed.to_string()));
    eprintln!("  EXIF orientation corrected: {}", tally.exif_corrected);
    eprintln!("  Landscape rotated to portrait: {}", tally.rotated);
    if !tally.rotation_angles.is_empty() {
        let angles: Vec<String> = tally.rotation_angles.iter().map(|a| format!("{a}°")).collect();
        eprintln!("    └─ angles used: {}", angles.join(", "));
    }
    eprintln!("  Resized: {}", tally.resized);
    print_failures(report);

    eprintln!();
    eprintln!("{}", "=".repeat(60));
    eprintln!("Output file:      {}", bold(&report.output_path.display().to_string()));
    match &report.summary {
        Some(summary) if summary.page_count > 0 => {
            let pct = |n: usize| n as f64 / summary.page_count as f64 * 100.0;
            eprintln!("Total pages:      {}", summary.page_count);
            eprintln!(
                "Portrait pages:   {} ({:.1}%)",
                summary.portrait_pages,
                pct(summary.portrait_pages)
            );
            eprintln!(
                "Landscape pages:  {} ({:.1}%)",
                summary.landscape_pages,
                pct(summary.landscape_pages)
            );
            eprintln!("File size:        {:.1} MB", mb(summary.file_size_bytes));
            eprintln!("Average per page: {:.2} MB", mb(summary.avg_page_bytes()));
            eprintln!();
            if config.force_portrait && summary.all_portrait() {
                eprintln!("{} All pages are in portrait orientation", green("✔"));
            } else if summary.landscape_pages > 0 {
                eprintln!(
                    "{} {} pages remained in landscape orientation",
                    yellow("⚠"),
                    summary.landscape_pages
                );
            }
        }
        _ => {
            eprintln!("File size:        {:.1} MB", mb(stats.output_size_bytes));
            eprintln!(
                "{} Could not read the PDF back for validation; check it manually",
                yellow("⚠")
            );
        }
    }
    eprintln!("{}", dim(&format!("Done in {}ms", stats.total_duration_ms)));
}

// ── downsample ───────────────────────────────────────────────────────────────

async fn run_downsample(cli: &Cli, args: &DownsampleArgs, show_progress: bool) -> Result<()> {
    let mut builder = DownsampleConfig::builder()
        .dpi(args.dpi)
        .quality(args.quality)
        .isolate_page_failures(!args.fail_whole_chunk);
    if let Some(n) = args.workers {
        builder = builder.workers(n);
    }
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress_for(show_progress, "pages") {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    if !cli.quiet && !cli.json {
        eprintln!("{}", cyan(&bold("PDF downsample")));
        eprintln!("Input PDF:      {}", args.input.display());
        eprintln!("Target DPI:     {}", config.dpi);
        eprintln!("JPEG quality:   {}", config.quality);
        eprintln!("Workers:        {}", config.workers);
        eprintln!();
    }

    let report = downsample_pdf(&args.input, args.output.as_deref(), &config)
        .await
        .with_context(|| format!("Downsampling {} failed", args.input.display()))?;

    if cli.json {
        print_json(&report)?;
    } else if !cli.quiet {
        print_downsample_summary(&report);
    }
    Ok(())
}

fn print_downsample_summary(report: &ConversionReport) {
    let stats = &report.stats;
    eprintln!(
        "{} {}/{} pages written",
        if report.failures.is_empty() { green("✔") } else { yellow("⚠") },
        bold(&stats.pages_written.to_string()),
        stats.total_units
    );
    print_failures(report);
    if let Some(input) = stats.input_size_bytes {
        eprintln!("Original file size:    {:.2} MB", mb(input));
    }
    eprintln!("Downsampled file size: {:.2} MB", mb(stats.output_size_bytes));
    if let Some(pct) = stats.size_reduction_percent() {
        eprintln!("Size reduction:        {:.1}%", pct);
    }
    eprintln!("Saved at: {}", bold(&report.output_path.display().to_string()));
    eprintln!("{}", dim(&format!("Done in {}ms", stats.total_duration_ms)));
}

// ── shared ───────────────────────────────────────────────────────────────────

fn print_failures(report: &ConversionReport) {
    if report.failures.is_empty() {
        return;
    }
    eprintln!(
        "{} {} skipped:",
        yellow("⚠"),
        report.stats.failed_units
    );
    for f in &report.failures {
        eprintln!("    {}", dim(&f.to_string()));
    }
}

fn print_json(report: &ConversionReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
    println!("{json}");
    Ok(())
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}
