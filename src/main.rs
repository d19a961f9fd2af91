use std::io::Read;
use std::path::{Path, PathBuf};

use cadence_core::{CadenceConfig, OutputFormat};
use cadence_difflens::files::split_unified_diff;
use cadence_difflens::filter::{DiffFilter, SkippedFile};
use cadence_difflens::hunk::Hunk;
use cadence_difflens::parser::parse_hunks;
use cadence_difflens::size::{measure_files, SizeReport};
use cadence_transform::pipeline::{MergeRequestInput, MergeRequestReport, Pipeline};
use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

const CONFIG_FILE: &str = ".cadence.toml";

#[derive(Parser)]
#[command(
    name = "cadence",
    version,
    about = "Merge-request lifecycle and diff metrics",
    long_about = "Cadence derives review-cycle timestamps and diff size figures from\n\
                   already-extracted merge request data.\n\n\
                   Examples:\n  \
                     git diff main | cadence diff          Size report for a full diff\n  \
                     cadence hunks --file body.patch       Classify one file's hunks\n  \
                     cadence classify --input mrs.json     Lifecycle metrics for merge requests\n  \
                     cadence init                          Write a default .cadence.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .cadence.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Parse the hunks of a single file's diff
    #[command(long_about = "Parse the hunks of a single file's diff.\n\n\
        Input is the hunk section of one file's unified diff, as stored per file by\n\
        forge APIs. Every line is classified and each hunk's changed lines are split\n\
        into pure deletions, pure insertions and edits.\n\n\
        Examples:\n  cadence hunks --file body.patch\n  cadence hunks --format json < body.patch")]
    Hunks {
        /// Read the diff from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Measure a full multi-file diff
    #[command(long_about = "Measure a full multi-file diff.\n\n\
        Splits `git diff` output per file, skips lock, generated, vendored and\n\
        configured files, and labels the change by its effective line count.\n\n\
        Examples:\n  git diff main | cadence diff\n  cadence diff --file changes.patch --format markdown")]
    Diff {
        /// Read the diff from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Derive lifecycle metrics for merge requests
    #[command(long_about = "Derive lifecycle metrics for merge requests.\n\n\
        Input is a JSON merge request object, or an array of them, carrying the\n\
        author, review notes, timeline events or stored timeline rows, and per-file\n\
        diffs. Arrays are processed in parallel.\n\n\
        Examples:\n  cadence classify --input mr.json\n  cadence classify --input batch.json --format json")]
    Classify {
        /// JSON input file (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Create a default .cadence.toml configuration file
    #[command(long_about = "Create a default .cadence.toml configuration file.\n\n\
        Writes every option with its default value.\n\
        Fails if .cadence.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// `classify` accepts a single merge request or a batch.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifyInput {
    Batch(Vec<MergeRequestInput>),
    Single(Box<MergeRequestInput>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffOutput<'a> {
    size: &'a SizeReport,
    skipped: &'a [SkippedFile],
}

const DEFAULT_CONFIG: &str = r#"# Cadence Configuration

[diff]
# Glob patterns for files left out of size metrics
skip_patterns = []
# File extensions left out of size metrics, without the dot
skip_extensions = []
# Skip lock files, vendored code, minified bundles and generated sources
skip_generated = true

[size]
# Inclusive upper bounds in effective lines for each size label
xs = 10
s = 50
m = 250
l = 1000

[batch]
# Worker threads for `cadence classify` batches (default: one per CPU)
# threads = 4
"#;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CadenceConfig> {
    let config = match path {
        Some(path) => CadenceConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                CadenceConfig::from_file(default_path)?
            } else {
                CadenceConfig::default()
            }
        }
    };
    Ok(config)
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn print_hunks(hunks: &[Hunk], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(hunks)?,
        OutputFormat::Markdown => {
            println!("# Hunks\n");
            if hunks.is_empty() {
                println!("No hunks found.");
                return Ok(());
            }
            println!("| Header | + | - | Pure - | Pure + | Edits |");
            println!("|--------|---|---|--------|--------|-------|");
            for hunk in hunks {
                println!(
                    "| `{}` | {} | {} | {} | {} | {} |",
                    hunk.header(),
                    hunk.additions,
                    hunk.deletions,
                    hunk.internals.d,
                    hunk.internals.i,
                    hunk.internals.c,
                );
            }
        }
        OutputFormat::Text => {
            if hunks.is_empty() {
                println!("No hunks found.");
                return Ok(());
            }
            for hunk in hunks {
                println!("{}  {hunk}", hunk.header());
                println!(
                    "  pure deletions {}, pure insertions {}, edits {}",
                    hunk.internals.d, hunk.internals.i, hunk.internals.c
                );
                for change in &hunk.changes {
                    println!("  {} {}", change.kind(), change.content());
                }
            }
        }
    }
    Ok(())
}

fn print_diff(report: &SizeReport, skipped: &[SkippedFile], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&DiffOutput {
            size: report,
            skipped,
        })?,
        OutputFormat::Markdown => {
            print!("{}", report.to_markdown());
            if !skipped.is_empty() {
                println!("\n## Skipped\n");
                for file in skipped {
                    println!("- `{}` ({})", file.path.display(), file.reason);
                }
            }
        }
        OutputFormat::Text => {
            print!("{report}");
            for file in skipped {
                println!("Skipped {} ({})", file.path.display(), file.reason);
            }
        }
    }
    Ok(())
}

fn format_time(ts: Option<cadence_core::Timestamp>) -> String {
    ts.map(|ts| ts.to_rfc3339()).unwrap_or_else(|| "-".into())
}

fn print_reports(reports: &[MergeRequestReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(reports)?,
        OutputFormat::Markdown => {
            println!("# Merge Requests\n");
            println!("| Id | Coding | Pickup | Review | Depth | Reviewed | Approved | Size |");
            println!("|----|--------|--------|--------|-------|----------|----------|------|");
            for report in reports {
                let m = &report.metrics;
                println!(
                    "| {} | {} | {} | {} | {} | {} | {} | {} |",
                    report.id,
                    format_time(m.started_coding_at),
                    format_time(m.started_pickup_at),
                    format_time(m.started_review_at),
                    m.review_depth,
                    m.reviewed,
                    m.approved,
                    report.size.label,
                );
            }
        }
        OutputFormat::Text => {
            for report in reports {
                let m = &report.metrics;
                println!("{}", report.id);
                println!("  started coding   {}", format_time(m.started_coding_at));
                println!("  started pickup   {}", format_time(m.started_pickup_at));
                println!("  started review   {}", format_time(m.started_review_at));
                println!(
                    "  review depth {}, reviewed {}, approved {}",
                    m.review_depth, m.reviewed, m.approved
                );
                println!(
                    "  size {} ({} effective lines in {} files, {} skipped)",
                    report.size.label,
                    report.size.overall.effective_lines,
                    report.size.per_file.len(),
                    report.skipped.len(),
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    debug!(format = %cli.format, "configuration loaded");

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
        }
        Some(Command::Hunks { ref file }) => {
            let input = read_input(file.as_deref())?;
            let hunks = parse_hunks(&input)?;
            print_hunks(&hunks, cli.format)?;
        }
        Some(Command::Diff { ref file }) => {
            let input = read_input(file.as_deref())?;
            let files = split_unified_diff(&input)?;
            let result = DiffFilter::from_config(&config.diff).filter(files);
            let report = measure_files(&result.kept, &config.size);
            print_diff(&report, &result.skipped, cli.format)?;
        }
        Some(Command::Classify { ref input }) => {
            let raw = read_input(input.as_deref())?;
            let inputs = match serde_json::from_str::<ClassifyInput>(&raw)
                .into_diagnostic()
                .wrap_err("parsing merge request input")?
            {
                ClassifyInput::Batch(inputs) => inputs,
                ClassifyInput::Single(input) => vec![*input],
            };
            let total = inputs.len();

            let mut reports = Vec::with_capacity(total);
            let mut failed = 0;
            for result in Pipeline::new(&config).run_batch(inputs) {
                match result {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        error!(error = %e, "merge request failed");
                        failed += 1;
                    }
                }
            }

            print_reports(&reports, cli.format)?;
            if failed > 0 {
                miette::bail!("{failed} of {total} merge requests failed");
            }
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "cadence", &mut std::io::stdout());
        }
    }

    Ok(())
}
