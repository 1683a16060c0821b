//! CLI binary for pdf2recipes.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RunConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2recipes::{
    inspect_with_windower, run, OpenAiExtractor, PdfiumWindower, ProgressCallback, RunConfig,
    RunProgressCallback, RunStatus,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-chunk log
/// lines using [indicatif]. Chunks run strictly in order, so a single slot
/// tracks the in-flight chunk's start time.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Wall-clock start time of the in-flight chunk.
    started: Mutex<Option<Instant>>,
    /// Number of chunks planned for this run, set by `on_run_start`.
    planned: AtomicUsize,
    /// Count of chunks that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_run_start` (called before any chunks are processed).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            planned: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize, chunk_count: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know how many chunks this run will upload.
        self.planned.store(chunk_count, Ordering::SeqCst);
        self.activate_bar(chunk_count);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Extracting recipes from {total_pages} pages in {chunk_count} chunks…"
            ))
        ));
    }

    fn on_chunk_start(&self, start_page: usize, end_page: usize, _total_pages: usize) {
        *self.started.lock().unwrap() = Some(Instant::now());
        self.bar.set_message(format!("pages {start_page}-{end_page}"));
    }

    fn on_chunk_complete(
        &self,
        start_page: usize,
        end_page: usize,
        _total_pages: usize,
        response_len: usize,
    ) {
        let elapsed_ms = self
            .started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Pages {:>3}-{:<3}  {:<8}  {}",
            green("✓"),
            start_page,
            end_page,
            dim(&format!("{response_len:>5} chars")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, start_page: usize, end_page: usize, error: &str) {
        let elapsed_ms = self
            .started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Pages {:>3}-{:<3}  {}  {}",
            red("✗"),
            start_page,
            end_page,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _total_pages: usize, chunks_processed: usize) {
        let planned = self.planned.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if self.errors.load(Ordering::SeqCst) == 0 {
            eprintln!(
                "{} {} chunks extracted successfully",
                green("✔"),
                bold(&chunks_processed.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} chunks extracted  (run halted, progress saved)",
                if chunks_processed == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&chunks_processed.to_string()),
                planned,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every recipe to stdout
  pdf2recipes cookbook.pdf

  # Wider windows, stronger model
  pdf2recipes --pages-per-chunk 4 --model gpt-4.1 cookbook.pdf

  # Structured JSON output for piping into jq
  pdf2recipes --json cookbook.pdf > recipes.json

  # Custom extraction prompt from a file
  pdf2recipes --prompt prompts/desserts.txt cookbook.pdf

  # Point at a self-hosted OpenAI-compatible gateway
  pdf2recipes --base-url http://localhost:4000/v1 cookbook.pdf

  # Show page count and resume state (no API key needed)
  pdf2recipes --inspect-only cookbook.pdf

RESUMING:
  Progress is recorded in <file>_run_log.json after every chunk. A rerun
  skips pages the log marks processed and continues from the first
  unprocessed page; delete the log to reprocess from the beginning.

MODELS:
  Model          Input $/1M  Output $/1M  Notes
  ─────────────  ──────────  ───────────  ─────
  gpt-4.1-mini   $0.40       $1.60        default
  gpt-4.1-nano   $0.10       $0.40        cheap first pass over long books
  gpt-4.1        $2.00       $8.00        scanned or dense layouts

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY               API key (required unless --inspect-only)
  PDF2RECIPES_MODEL            Override model ID
  PDF2RECIPES_BASE_URL         Override endpoint base URL
  PDF2RECIPES_PAGES_PER_CHUNK  Override chunk width

  Variables may also be supplied via a .env file in the working directory.

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Extract:         pdf2recipes cookbook.pdf

  Page windowing needs the pdfium shared library: place libpdfium next to
  the binary or install it system-wide (prebuilt copies are published at
  bblanchon/pdfium-binaries).
"#;

/// Extract structured recipe cards from PDF cookbooks using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2recipes",
    version,
    about = "Extract structured recipe cards from PDF cookbooks using Vision LLMs",
    long_about = "Extract structured recipe cards from PDF cookbooks using Vision Language Models. \
Each window of pages is uploaded as-is to an OpenAI-compatible endpoint, which returns recipes \
conforming to a strict JSON schema. Progress is checkpointed after every chunk, so interrupted \
runs resume where they stopped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file to extract recipes from.
    input: String,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1-nano, gpt-4.1).
    #[arg(
        long,
        env = "PDF2RECIPES_MODEL",
        long_help = "Vision LLM model to use. Default: gpt-4.1-mini ($0.40/$1.60 per 1M tokens).\n\
          Any Responses-API model that accepts file inputs works."
    )]
    model: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    #[arg(long, env = "PDF2RECIPES_BASE_URL")]
    base_url: Option<String>,

    /// Pages per uploaded chunk.
    #[arg(long, env = "PDF2RECIPES_PAGES_PER_CHUNK", default_value_t = 2)]
    pages_per_chunk: usize,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "PDF2RECIPES_PROMPT")]
    prompt: Option<PathBuf>,

    /// Cap on tokens the model may generate per chunk.
    #[arg(long, env = "PDF2RECIPES_MAX_OUTPUT_TOKENS")]
    max_output_tokens: Option<u32>,

    /// Per-chunk extraction call timeout in seconds.
    #[arg(long, env = "PDF2RECIPES_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Directory for the run log file (default: current directory).
    #[arg(long, env = "PDF2RECIPES_CHECKPOINT_DIR")]
    checkpoint_dir: Option<PathBuf>,

    /// Output structured JSON (RunOutcome) instead of recipe text.
    #[arg(long, env = "PDF2RECIPES_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2RECIPES_NO_PROGRESS")]
    no_progress: bool,

    /// Print page count and resume state only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2RECIPES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and extracted recipes.
    #[arg(short, long, env = "PDF2RECIPES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up OPENAI_API_KEY and friends from a local .env, if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    // In verbose mode we always want all logs regardless of progress.
    let filter = if cli.verbose { "debug" } else { filter };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut builder = RunConfig::builder();
        if let Some(ref dir) = cli.checkpoint_dir {
            builder = builder.checkpoint_dir(dir);
        }
        let config = builder.build().context("Invalid configuration")?;

        let windower = PdfiumWindower::new().context("Failed to initialise the PDF engine")?;
        let info = inspect_with_windower(&cli.input, &windower, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise source info")?
            );
        } else {
            println!("File:       {}", info.path.display());
            println!("Pages:      {}", info.total_pages);
            println!("Run log:    {}", info.checkpoint_path.display());
            println!("Processed:  {} pages", info.checkpoint.last_processed_page);
            println!("Complete:   {}", info.checkpoint.completed);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    // The progress bar is initialised with a spinner (no chunk count yet);
    // `on_run_start` resizes it to the correct total once the PDF has been
    // inspected. `show_progress` was already computed above.

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RunProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let extractor = OpenAiExtractor::from_env(&config)
        .context("Failed to initialise the extraction client")?;

    // ── Run extraction ───────────────────────────────────────────────────
    let outcome = run(&cli.input, &extractor, &config)
        .await
        .context("Extraction run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
        return Ok(());
    }

    // ── Print extracted chunks ───────────────────────────────────────────
    {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for chunk in &outcome.chunks {
            // Re-emit the payload pretty-printed when it parses as JSON.
            let payload = match serde_json::from_str::<serde_json::Value>(&chunk.raw) {
                Ok(value) => {
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| chunk.raw.clone())
                }
                Err(_) => chunk.raw.clone(),
            };
            writeln!(handle, "=== Pages {}-{} ===", chunk.start_page, chunk.end_page)
                .context("Failed to write to stdout")?;
            writeln!(handle, "{payload}").context("Failed to write to stdout")?;
            writeln!(handle).ok();
        }
    }

    // ── Status + summary ─────────────────────────────────────────────────
    match &outcome.status {
        RunStatus::AlreadyComplete => {
            if !cli.quiet {
                eprintln!(
                    "{} {} has already been completely processed.",
                    green("✔"),
                    bold(&cli.input)
                );
                eprintln!("   Delete its run log to reprocess from the beginning.");
            }
        }
        RunStatus::Halted { error, .. } => {
            // The per-chunk log already showed the red ✗; repeat the error
            // on stderr so it survives scrollback and piped stdout.
            eprintln!("{} {}", red("✘"), error);
            eprintln!("   Progress is saved; rerun the same command to resume.");
        }
        RunStatus::Completed => {
            if !cli.quiet && !show_progress {
                // Only print inline stats when the progress callback is disabled.
                eprintln!(
                    "Processed {} pages in {} chunks in {}ms",
                    outcome.stats.pages_processed,
                    outcome.stats.chunks_processed,
                    outcome.stats.total_duration_ms
                );
            } else if !cli.quiet {
                let tokens_in: u64 = outcome.chunks.iter().filter_map(|c| c.input_tokens).sum();
                let tokens_out: u64 = outcome.chunks.iter().filter_map(|c| c.output_tokens).sum();
                eprintln!(
                    "   {} tokens in  /  {} tokens out  —  {}ms total",
                    dim(&tokens_in.to_string()),
                    dim(&tokens_out.to_string()),
                    outcome.stats.total_duration_ms,
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `RunConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RunConfig> {
    let mut builder = RunConfig::builder().pages_per_chunk(cli.pages_per_chunk);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(ref dir) = cli.checkpoint_dir {
        builder = builder.checkpoint_dir(dir);
    }
    if let Some(n) = cli.max_output_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read extraction prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
