use crate::util::{find_source, pending_counts, LocaleTarget};
use mvloc_config::Settings;
use mvloc_core::Result;
use mvloc_domain::{Operation, TaskOutcome, TaskReport};
use mvloc_store::{load_locale, load_snapshot};

/// Check one locale file without touching it. Counts describe the drift a
/// sync would pick up.
pub fn validate_target(settings: &Settings, target: &LocaleTarget) -> Result<TaskReport> {
    let source = load_snapshot(&find_source(settings, &target.resource)?)?;
    let file = load_locale(&target.locale_path(settings), &target.language)?;
    let counts = pending_counts(settings, &target.resource, &file, &source)?;
    let findings = mvloc_validate::validate(&file, &source, &settings.validate);

    tracing::debug!(event = "validate_done", locale = %target, findings = findings.len());

    Ok(TaskReport {
        resource: target.resource.clone(),
        language: target.language.clone(),
        operation: Operation::Validate,
        outcome: TaskOutcome::from_findings(&findings),
        counts,
        findings,
        output: None,
    })
}
