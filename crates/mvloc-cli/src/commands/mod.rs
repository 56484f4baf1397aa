pub mod merge;
pub mod run;
pub mod schema;

use crate::exit_status::ExitStatus;
use crate::{BatchOpts, RunOpts};
use color_eyre::eyre::{Report, Result};
use mvloc_config::{BatchCfg, ExportCfg, MvlocConfig, Settings, SyncCfg, ValidateCfg};

fn path_str(p: Option<std::path::PathBuf>) -> Option<String> {
    p.map(|p| p.display().to_string())
}

/// Command-line flags as the top configuration layer.
fn flags_layer(opts: &RunOpts, batch: Option<&BatchOpts>) -> MvlocConfig {
    MvlocConfig {
        source_lang: None,
        languages: batch
            .filter(|b| !b.languages.is_empty())
            .map(|b| b.languages.clone()),
        source_dir: path_str(opts.source_dir.clone()),
        baseline_dir: path_str(opts.baseline_dir.clone()),
        locale_dir: path_str(opts.locale_dir.clone()),
        export_dir: path_str(opts.export_dir.clone()),
        report: path_str(batch.and_then(|b| b.report.clone())),
        sync: opts.no_archive.then_some(SyncCfg {
            archive_removed: Some(false),
        }),
        validate: Some(ValidateCfg {
            stale_threshold: opts.stale_threshold,
            placeholder_severity: opts.placeholder_severity.clone(),
        }),
        export: Some(ExportCfg {
            empty_identical: opts.empty_identical.then_some(true),
            format: opts.format.clone(),
        }),
        batch: batch.filter(|b| b.parallel).map(|_| BatchCfg {
            parallel: Some(true),
        }),
    }
}

/// Flags over `mvloc.toml` (working directory, then user config dir), validated.
pub fn resolve_settings(opts: &RunOpts, batch: Option<&BatchOpts>) -> Result<Settings> {
    let file = mvloc_config::load_config()?;
    let settings = Settings::resolve(flags_layer(opts, batch).or(file))?;
    tracing::debug!(event = "settings_resolved", settings = ?settings);
    Ok(settings)
}

/// An error once work has started fails the run; it is not a usage error.
pub(crate) fn failed(err: Report) -> ExitStatus {
    tracing::error!(event = "command_failed", error = %format!("{err:#}"));
    crate::ui_err!("{err:#}");
    ExitStatus::Failure
}
