use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use mvloc_domain::Operation;
use mvloc_services::{CopyCriteria, DEFAULT_CRITERIA};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod commands;
mod exit_status;
mod ui;

use exit_status::ExitStatus;

#[derive(Parser)]
#[command(
    name = "mvloc",
    version,
    about = "Keep translation catalogs in sync with an evolving source text corpus"
)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only log warnings and errors to the console
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Commands,
}

/// Options shared by every operation; they override `mvloc.toml`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOpts {
    /// Directory holding the current source snapshots
    #[arg(long)]
    pub source_dir: Option<PathBuf>,
    /// Directory holding the previous source snapshots
    #[arg(long)]
    pub baseline_dir: Option<PathBuf>,
    /// Directory holding `<resource>/<language>.po` locale files
    #[arg(long)]
    pub locale_dir: Option<PathBuf>,
    /// Directory export files are written to
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
    /// Drop removed keys instead of archiving them
    #[arg(long)]
    pub no_archive: bool,
    /// Warn about entries stale for more than this many source revisions
    #[arg(long, allow_negative_numbers = true)]
    pub stale_threshold: Option<i64>,
    /// Severity of placeholder mismatches: error, warning or ignore
    #[arg(long)]
    pub placeholder_severity: Option<String>,
    /// Export format: json or xml
    #[arg(long)]
    pub format: Option<String>,
    /// Treat translations identical to the source text as untranslated on export
    #[arg(long)]
    pub empty_identical: bool,
    /// Print the report as JSON on stdout instead of the console summary
    #[arg(long)]
    pub json: bool,
}

/// Options of the batch commands.
#[derive(Args, Debug, Clone, Default)]
pub struct BatchOpts {
    /// Target languages (repeatable); defaults to `languages` from mvloc.toml
    #[arg(long = "lang", short = 'l')]
    pub languages: Vec<String>,
    /// Where the text report is written
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Also write the report as JSON to this path
    #[arg(long)]
    pub json_report: Option<PathBuf>,
    /// Run tasks on different locale files in parallel
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync one locale file (`resource:language`) with its source
    Sync {
        target: String,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check one locale file without modifying it
    Validate {
        target: String,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Export the translated strings of one locale file
    Export {
        target: String,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Sync every resource for every language and write a report
    BatchSync {
        /// First delete locale files of the target languages whose source is gone
        #[arg(long)]
        clean: bool,
        #[command(flatten)]
        batch: BatchOpts,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate every resource for every language and write a report
    BatchValidate {
        #[command(flatten)]
        batch: BatchOpts,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Export every resource for every language and write a report
    BatchExport {
        #[command(flatten)]
        batch: BatchOpts,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Run the tasks listed in a plan file, in order, and write a report
    BatchRun {
        /// TOML file with `[[task]]` tables (resource, language, operation)
        #[arg(long)]
        plan: PathBuf,
        #[command(flatten)]
        batch: BatchOpts,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Copy translations from one catalog into another of the same language
    Merge {
        /// Catalog the translations are copied from
        from: PathBuf,
        /// Catalog they are copied into
        into: PathBuf,
        /// Where the merged catalog is written; may be INTO itself
        output: PathBuf,
        /// `X:Y:Z`: donor conditions, target conditions, copied fields.
        /// Conditions: o obsolete, f fuzzy, e empty, n new (donor only), `!` negates.
        /// Fields: v translation, l source reference, o obsolete flag, f fuzzy flag.
        #[arg(long, short, default_value = DEFAULT_CRITERIA)]
        criteria: CopyCriteria,
        /// Move donor keys onto the source location of INTO before merging
        #[arg(long, short = 'l')]
        copy_sourcelocation: bool,
    },
    /// Write JSON schemas of the report types
    Schema {
        #[arg(long, default_value = "./docs/assets/schemas")]
        out_dir: PathBuf,
    },
}

trait Runnable {
    fn run(self, use_color: bool) -> Result<ExitStatus>;
}

impl Runnable for Commands {
    fn run(self, use_color: bool) -> Result<ExitStatus> {
        tracing::debug!(event = "command_start", command = ?self);
        match self {
            Commands::Sync { target, opts } => {
                commands::run::run_single(Operation::Sync, &target, opts, use_color)
            }
            Commands::Validate { target, opts } => {
                commands::run::run_single(Operation::Validate, &target, opts, use_color)
            }
            Commands::Export { target, opts } => {
                commands::run::run_single(Operation::Export, &target, opts, use_color)
            }
            Commands::BatchSync { clean, batch, opts } => {
                commands::run::run_planned(Operation::Sync, clean, batch, opts, use_color)
            }
            Commands::BatchValidate { batch, opts } => {
                commands::run::run_planned(Operation::Validate, false, batch, opts, use_color)
            }
            Commands::BatchExport { batch, opts } => {
                commands::run::run_planned(Operation::Export, false, batch, opts, use_color)
            }
            Commands::BatchRun { plan, batch, opts } => {
                commands::run::run_plan_file(&plan, batch, opts, use_color)
            }
            Commands::Merge {
                from,
                into,
                output,
                criteria,
                copy_sourcelocation,
            } => Ok(commands::merge::run_merge(
                &from,
                &into,
                &output,
                &criteria,
                copy_sourcelocation,
            )),
            Commands::Schema { out_dir } => Ok(commands::schema::run_schema(&out_dir)),
        }
    }
}

/// Console layer on stderr plus a daily-rolling debug log under `logs/`.
/// The returned guard flushes the file writer when dropped.
fn init_tracing(quiet: bool) -> WorkerGuard {
    let file_appender = rolling::daily("logs", "mvloc.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if quiet { "warn" } else { "info" };
    let console_filter = if quiet {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitStatus::Usage.into()
            } else {
                ExitStatus::Success.into()
            };
        }
    };
    let _guard = init_tracing(cli.quiet);

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    match cli.cmd.run(use_color) {
        Ok(status) => status.into(),
        // commands report their own failures once work has started
        Err(err) => {
            tracing::error!(event = "command_rejected", error = %format!("{err:#}"));
            ui_err!("{err:#}");
            ExitStatus::Usage.into()
        }
    }
}
