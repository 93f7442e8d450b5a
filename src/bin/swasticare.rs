//! CLI binary for swasticare.
//!
//! A thin shim over the library crate: `analyze` runs one image from disk,
//! `serve` starts the upload page.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use swasticare::{
    analyze_file, analyze_file_to, AnalysisConfig, AnalysisOutcome, AnalysisProgressCallback,
    FileHandle, MimePolicy, Notice, NoticeLevel, PipelineStage, ProgressCallback,
};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the run through its stages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Staging");
        bar.set_message("Writing image…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_staged(&self, _path: &Path, bytes: usize) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!("{bytes} bytes"));
    }

    fn on_uploaded(&self, handle: &FileHandle) {
        self.bar.println(format!("  {} {}", green("✓"), dim(&handle.uri)));
        self.bar.set_prefix("Analysing");
        self.bar.set_message("Waiting for the model…");
    }

    fn on_response(&self, text_len: usize) {
        self.bar.println(format!(
            "  {} {}",
            green("✓"),
            dim(&format!("{text_len} chars received"))
        ));
    }

    fn on_stage(&self, stage: PipelineStage) {
        if stage == PipelineStage::Cleaned {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse one image, report on stdout
  swasticare analyze chest-xray.png

  # Write the report to a file
  swasticare analyze scan.jpg -o report.md

  # JSON output with notices and stats
  swasticare analyze --json scan.png > outcome.json

  # Send the real MIME type instead of image/png
  swasticare analyze --mime-policy extension scan.jpg

  # Start the upload page on port 8501
  swasticare serve --port 8501

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY           Google Gemini API key
  SWASTICARE_MODEL         Override model ID
  SWASTICARE_STAGING_DIR   Where uploads are staged before upload
  RUST_LOG                 Log filter; overrides --verbose / --quiet

The report is produced by a general-purpose model. It is not a diagnosis.
"#;

/// Analyse medical images with a remote vision model.
#[derive(Parser, Debug)]
#[command(
    name = "swasticare",
    version,
    about = "Analyse medical images with a remote vision model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    model: ModelArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SWASTICARE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SWASTICARE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse one local PNG or JPEG image.
    Analyze {
        /// Path to a .png, .jpg or .jpeg file.
        image: PathBuf,

        /// Write the Markdown report to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the whole outcome (notices, file handle, report, stats) as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Serve the upload page.
    Serve {
        /// Address to bind.
        #[arg(long, env = "SWASTICARE_BIND", default_value = "127.0.0.1")]
        bind: IpAddr,

        /// Port to listen on.
        #[arg(short, long, env = "SWASTICARE_PORT", default_value_t = 8501)]
        port: u16,
    },
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
struct ModelArgs {
    /// Gemini API key.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, global = true, env = "SWASTICARE_MODEL", default_value = swasticare::config::DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, global = true, default_value_t = 0.5)]
    temperature: f32,

    /// Nucleus sampling mass (0.0–1.0).
    #[arg(long, global = true, default_value_t = 0.95)]
    top_p: f32,

    /// Top-k sampling.
    #[arg(long, global = true, default_value_t = 64)]
    top_k: u32,

    /// Max output tokens.
    #[arg(long, global = true, default_value_t = 8192)]
    max_output_tokens: u32,

    /// MIME type sent with the upload: fixed (image/png), extension, declared.
    #[arg(long, global = true, value_enum, default_value = "fixed")]
    mime_policy: MimePolicyArg,

    /// Directory for staged uploads.
    #[arg(long, global = true, env = "SWASTICARE_STAGING_DIR", default_value = ".")]
    staging_dir: PathBuf,

    /// Bound each remote call to this many seconds. Unbounded when unset.
    #[arg(long, global = true, env = "SWASTICARE_API_TIMEOUT")]
    api_timeout: Option<u64>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MimePolicyArg {
    Fixed,
    Extension,
    Declared,
}

impl From<MimePolicyArg> for MimePolicy {
    fn from(v: MimePolicyArg) -> Self {
        match v {
            MimePolicyArg::Fixed => MimePolicy::default(),
            MimePolicyArg::Extension => MimePolicy::FromExtension,
            MimePolicyArg::Declared => MimePolicy::Declared,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers an interactive analyze run; keep library INFO logs
    // out of its way unless asked for.
    let interactive_analyze = matches!(cli.command, Command::Analyze { json: false, .. });
    let show_progress = interactive_analyze && !cli.quiet;
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

    match cli.command {
        Command::Analyze {
            ref image,
            ref output,
            json,
        } => {
            let spinner = (show_progress && !cli.verbose).then(CliProgressCallback::new);
            let progress_cb = spinner
                .clone()
                .map(|cb| cb as ProgressCallback);
            let config = build_config(&cli.model, progress_cb)?;
            let result = run_analyze(image, output.as_deref(), json, cli.quiet, &config).await;
            // Input errors fail before the pipeline reports `Cleaned`.
            if let Some(spinner) = spinner {
                spinner.bar.finish_and_clear();
            }
            result
        }
        Command::Serve { bind, port } => {
            let config = build_config(&cli.model, None)?;
            let addr = SocketAddr::new(bind, port);
            if !cli.quiet {
                eprintln!("{} Serving on {}", green("◆"), bold(&format!("http://{addr}")));
            }
            swasticare::web::serve(addr, config)
                .await
                .context("Server failed")
        }
    }
}

async fn run_analyze(
    image: &Path,
    output: Option<&Path>,
    json: bool,
    quiet: bool,
    config: &AnalysisConfig,
) -> Result<()> {
    let result = match output {
        Some(out) => analyze_file_to(image, out, config).await,
        None => analyze_file(image, config).await,
    };
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(failure) => {
            if !quiet {
                print_notices(&failure.notices);
            }
            return Err(failure).with_context(|| format!("Analysis of {} failed", image.display()));
        }
    };

    if json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
        return ensure_report(&outcome);
    }

    if !quiet {
        print_notices(&outcome.notices);
    }

    match (output, outcome.report.as_ref()) {
        (Some(out), Some(_)) => {
            if !quiet {
                eprintln!(
                    "{}  {}ms  →  {}",
                    green("✔"),
                    outcome.stats.total_duration_ms,
                    bold(&out.display().to_string()),
                );
            }
        }
        (None, Some(report)) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(report.to_markdown().as_bytes())
                .context("Failed to write to stdout")?;
        }
        (_, None) => {}
    }

    if !quiet && outcome.report.is_some() {
        eprintln!(
            "   {} tokens in  /  {} tokens out  ({}ms total)",
            dim(&outcome.stats.prompt_tokens.to_string()),
            dim(&outcome.stats.output_tokens.to_string()),
            outcome.stats.total_duration_ms,
        );
    }

    ensure_report(&outcome)
}

/// Exit status for a finished run: an error notice means no report.
fn ensure_report(outcome: &AnalysisOutcome) -> Result<()> {
    if outcome.has_errors() {
        anyhow::bail!("No report was produced");
    }
    Ok(())
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        let line = notice.to_line();
        let line = match notice.level {
            NoticeLevel::Success => green(&line),
            NoticeLevel::Warning => yellow(&line),
            NoticeLevel::Error => red(&line),
        };
        eprintln!("{line}");
    }
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(args: &ModelArgs, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .model(args.model.clone())
        .temperature(args.temperature)
        .top_p(args.top_p)
        .top_k(args.top_k)
        .max_output_tokens(args.max_output_tokens)
        .mime_policy(args.mime_policy.into())
        .staging_dir(args.staging_dir.clone());

    if let Some(ref key) = args.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_notice_fails_the_run() {
        let mut outcome = AnalysisOutcome::default();
        outcome
            .notices
            .push(Notice::error("Error: File not found at path: /tmp/temp_x.png"));

        let err = ensure_report(&outcome).unwrap_err();
        assert_eq!(err.to_string(), "No report was produced");
    }

    #[test]
    fn warning_only_run_succeeds() {
        let mut outcome = AnalysisOutcome::default();
        outcome.notices.push(Notice::warning("Please upload an image before submitting."));

        assert!(ensure_report(&outcome).is_ok());
    }
}
