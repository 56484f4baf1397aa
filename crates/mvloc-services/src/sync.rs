use crate::util::{find_source, old_snapshot, LocaleTarget};
use mvloc_config::Settings;
use mvloc_core::Result;
use mvloc_domain::{Operation, TaskOutcome, TaskReport};
use mvloc_store::{load_locale, load_snapshot, save_locale};

/// Bring one locale file up to date with its source. The file is rewritten
/// only when its bytes change; findings never block the write.
pub fn sync_target(settings: &Settings, target: &LocaleTarget) -> Result<TaskReport> {
    let source = load_snapshot(&find_source(settings, &target.resource)?)?;
    let locale_path = target.locale_path(settings);
    let existing = load_locale(&locale_path, &target.language)?;
    let old = old_snapshot(settings, &target.resource, || existing.synced_snapshot())?;

    let diff = mvloc_sync::diff(&old, &source);
    let (merged, stats) = mvloc_sync::merge(&existing, &diff, &settings.merge);
    let findings = mvloc_validate::validate(&merged, &source, &settings.validate);
    let written = save_locale(&locale_path, &merged)?;

    tracing::info!(
        event = "sync_done",
        locale = %target,
        written,
        created = stats.created,
        staled = stats.staled,
        archived = stats.archived,
        pruned = stats.pruned,
        revived = stats.revived,
        findings = findings.len()
    );

    Ok(TaskReport {
        resource: target.resource.clone(),
        language: target.language.clone(),
        operation: Operation::Sync,
        outcome: TaskOutcome::from_findings(&findings),
        counts: diff.counts(),
        findings,
        output: written.then(|| locale_path.display().to_string()),
    })
}
