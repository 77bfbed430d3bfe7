//! Check command: DOI presence, resolution and metadata consistency.

use anyhow::{Context, bail};
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::{OwoColorize, Stream};
use tracing::{debug, instrument};

use doi_lint_core::check::{CheckEvent, CheckObserver, Checker, RunReport, Silent};
use doi_lint_core::config::Config;

use super::read_input_file;

const RULE_WIDTH: usize = 70;

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Bibliography files to check.
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<Utf8PathBuf>,

    /// Skip metadata verification (only check DOI presence and resolution).
    #[arg(long)]
    pub no_metadata_check: bool,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Pause after each metadata lookup, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,
}

/// Apply command-line overrides on top of the loaded configuration.
fn effective_config(args: &CheckArgs, config: &Config) -> Config {
    let mut config = config.clone();
    if args.no_metadata_check {
        config.verify_metadata = false;
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(delay) = args.delay_ms {
        config.request_delay_ms = delay;
    }
    config
}

/// Check every book and article entry in the given files.
///
/// Fails when a file is missing or unreadable (immediately) or when any
/// entry failed its checks (after every file has been processed).
#[instrument(name = "cmd_check", skip_all, fields(files = args.files.len()))]
pub fn cmd_check(
    args: CheckArgs,
    global_json: bool,
    quiet: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let config = effective_config(&args, config);
    debug!(
        verify_metadata = config.verify_metadata,
        timeout_secs = config.timeout_secs,
        request_delay_ms = config.request_delay_ms,
        "executing check command"
    );

    let checker = Checker::from_config(&config).context("failed to set up DOI checks")?;
    let max_input = config.input_limit();

    let mut silent = Silent;
    let mut printer = ProgressPrinter;
    let observer: &mut dyn CheckObserver = if global_json || quiet {
        &mut silent
    } else {
        &mut printer
    };

    let mut run = RunReport::new();
    for path in &args.files {
        let content = read_input_file(path, max_input)?;
        run.record(checker.check_source(path, &content, observer));
    }

    if global_json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_summary(&run);
    }

    if !run.passed() {
        bail!("{} of {} entries failed DOI checks", run.errors.len(), run.checked);
    }
    Ok(())
}

/// Streams human-readable progress to stdout.
struct ProgressPrinter;

impl CheckObserver for ProgressPrinter {
    fn on_event(&mut self, event: CheckEvent<'_>) {
        match event {
            CheckEvent::FileStarted { path } => {
                println!(
                    "\nChecking {}...",
                    path.if_supports_color(Stream::Stdout, |t| t.bold())
                );
            }
            CheckEvent::FragmentSkipped { fragment } => println!(
                "  {}  Skipped malformed entry at line {}: {}",
                "⚠️".if_supports_color(Stream::Stdout, |t| t.yellow()),
                fragment.line,
                fragment.snippet
            ),
            CheckEvent::EntryStarted { entry } => {
                println!("  Checking {} '{}'...", entry.entry_type, entry.key);
            }
            CheckEvent::DoiMissing { message } | CheckEvent::ResolveFailed { message } => println!(
                "    ❌ {}",
                message.if_supports_color(Stream::Stdout, |t| t.red())
            ),
            CheckEvent::DoiFound { doi } => println!(
                "    DOI: {}",
                doi.if_supports_color(Stream::Stdout, |t| t.cyan())
            ),
            CheckEvent::Resolved { status } => println!(
                "    {} DOI URL is valid (status {status})",
                "✓".if_supports_color(Stream::Stdout, |t| t.green())
            ),
            CheckEvent::FetchingMetadata => println!(
                "    {}",
                "Fetching DOI metadata...".if_supports_color(Stream::Stdout, |t| t.dimmed())
            ),
            CheckEvent::MetadataWarning { warning } => println!(
                "    ⚠️  {}",
                warning.if_supports_color(Stream::Stdout, |t| t.yellow())
            ),
            CheckEvent::MetadataConsistent => println!(
                "    {} Metadata appears consistent",
                "✓".if_supports_color(Stream::Stdout, |t| t.green())
            ),
            CheckEvent::MetadataUnavailable => println!(
                "    ⚠️  {}",
                "Could not fetch metadata from CrossRef API"
                    .if_supports_color(Stream::Stdout, |t| t.yellow())
            ),
        }
    }
}

fn print_summary(run: &RunReport) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}");
    println!("{}", "SUMMARY".if_supports_color(Stream::Stdout, |t| t.bold()));
    println!("{rule}");
    println!("Total entries checked: {}", run.checked);
    println!("Errors found: {}", run.errors.len());

    if run.passed() {
        println!(
            "\n{} All checks passed!",
            "✓".if_supports_color(Stream::Stdout, |t| t.green())
        );
    } else {
        println!(
            "\n{}",
            "ERRORS:".if_supports_color(Stream::Stdout, |t| t.red())
        );
        for error in &run.errors {
            println!("  • {error}");
        }
    }
}
