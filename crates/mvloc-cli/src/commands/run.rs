use super::{failed, resolve_settings};
use crate::exit_status::ExitStatus;
use crate::{ui, BatchOpts, RunOpts};
use color_eyre::eyre::{Result, WrapErr};
use mvloc_domain::{BatchReport, Operation};
use mvloc_services::{
    clean_orphans, load_plan, plan_tasks, run_batch, BatchTask, JsonReportSink, LocaleTarget,
    ReportSink, RunContext, Settings, TextReportSink,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

fn present(report: &BatchReport, json: bool, use_color: bool) -> Result<()> {
    if json {
        JsonReportSink::new(std::io::stdout().lock()).emit(report)
    } else {
        ui::print_summary(report, use_color);
        Ok(())
    }
}

fn write_json_report(path: &Path, report: &BatchReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file =
        File::create(path).wrap_err_with(|| format!("creating report {}", path.display()))?;
    JsonReportSink::new(BufWriter::new(file)).emit(report)
}

/// `sync` / `validate` / `export` on a single `resource:language` target.
pub fn run_single(
    operation: Operation,
    target: &str,
    opts: RunOpts,
    use_color: bool,
) -> Result<ExitStatus> {
    let settings = resolve_settings(&opts, None)?;
    let target: LocaleTarget = target.parse()?;
    target.ensure_translatable(&settings)?;
    let mut ctx = RunContext::new(settings);
    let report = run_batch(&mut ctx, &[BatchTask::new(target, operation)]);
    if let Err(e) = present(&report, opts.json, use_color) {
        return Ok(failed(e));
    }
    Ok(report.status.into())
}

/// `batch-*`: every resource under the source directory times every language.
/// With `clean`, orphaned locale files of those languages are deleted first.
pub fn run_planned(
    operation: Operation,
    clean: bool,
    batch: BatchOpts,
    opts: RunOpts,
    use_color: bool,
) -> Result<ExitStatus> {
    let settings = resolve_settings(&opts, Some(&batch))?;
    let tasks = plan_tasks(&settings, &settings.languages, operation)?;
    if clean {
        match clean_orphans(&settings, &settings.languages) {
            Ok(removed) if !opts.json => {
                for path in removed {
                    crate::ui_ok!("removed orphaned {}", path.display());
                }
            }
            Ok(_) => {}
            Err(e) => return Ok(failed(e)),
        }
    }
    run_with_report(settings, &tasks, &batch, &opts, use_color)
}

/// `batch-run --plan`: an explicit task list.
pub fn run_plan_file(
    plan: &Path,
    batch: BatchOpts,
    opts: RunOpts,
    use_color: bool,
) -> Result<ExitStatus> {
    let settings = resolve_settings(&opts, Some(&batch))?;
    let tasks = load_plan(plan)?;
    for task in &tasks {
        task.target.ensure_translatable(&settings)?;
    }
    run_with_report(settings, &tasks, &batch, &opts, use_color)
}

fn run_with_report(
    settings: Settings,
    tasks: &[BatchTask],
    batch: &BatchOpts,
    opts: &RunOpts,
    use_color: bool,
) -> Result<ExitStatus> {
    let report_path = settings.report.clone();
    let mut ctx = RunContext::new(settings);
    let report = run_batch(&mut ctx, tasks);
    let mut status = ExitStatus::from(report.status);

    if let Err(e) = TextReportSink::new(&report_path).emit(&report) {
        status = failed(e);
    }
    if let Some(path) = &batch.json_report {
        if let Err(e) = write_json_report(path, &report) {
            status = failed(e);
        }
    }

    if let Err(e) = present(&report, opts.json, use_color) {
        return Ok(failed(e));
    }
    if !opts.json {
        crate::ui_ok!("report written to {}", report_path.display());
    }
    Ok(status)
}
