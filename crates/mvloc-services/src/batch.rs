use crate::{export_target, sync_target, validate_target, LocaleTarget};
use color_eyre::eyre::Report;
use mvloc_config::Settings;
use mvloc_core::MvlocError;
use mvloc_domain::{BatchReport, Finding, FindingKind, Operation, TaskOutcome, TaskReport};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;

/// One requested operation on one locale file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTask {
    pub target: LocaleTarget,
    pub operation: Operation,
}

impl BatchTask {
    pub fn new(target: LocaleTarget, operation: Operation) -> Self {
        Self { target, operation }
    }
}

impl fmt::Display for BatchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation, self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Finished(TaskOutcome),
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending => f.write_str("pending"),
            TaskState::Running => f.write_str("running"),
            TaskState::Finished(o) => write!(f, "{o}"),
        }
    }
}

/// Per-run state threaded through the orchestrator: the settings and the
/// report being assembled. Nothing else is shared between tasks.
#[derive(Debug)]
pub struct RunContext {
    settings: Settings,
    completed: Vec<TaskReport>,
}

impl RunContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            completed: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Reports collected so far, in input order.
    pub fn completed(&self) -> &[TaskReport] {
        &self.completed
    }

    fn record(&mut self, report: TaskReport) {
        self.completed.push(report);
    }

    fn finish(&mut self) -> BatchReport {
        BatchReport::new(std::mem::take(&mut self.completed))
    }
}

fn failure_finding(err: &Report) -> Finding {
    let (kind, key) = match err.downcast_ref::<MvlocError>() {
        Some(e @ MvlocError::Parse { .. }) => (FindingKind::ParseError, e.key()),
        _ => (FindingKind::IoError, None),
    };
    Finding::error(kind, key, format!("{err:#}"))
}

fn failed_report(task: &BatchTask, err: &Report) -> TaskReport {
    TaskReport {
        resource: task.target.resource.clone(),
        language: task.target.language.clone(),
        operation: task.operation,
        outcome: TaskOutcome::Failed,
        counts: Default::default(),
        findings: vec![failure_finding(err)],
        output: None,
    }
}

fn log_state(task: &BatchTask, state: TaskState) {
    tracing::debug!(event = "task_state", task = %task, state = %state);
}

/// Run one task to a terminal state. Errors become a failed report; they
/// never escape.
pub fn run_task(settings: &Settings, task: &BatchTask) -> TaskReport {
    log_state(task, TaskState::Running);
    let result = match task.operation {
        Operation::Sync => sync_target(settings, &task.target),
        Operation::Validate => validate_target(settings, &task.target),
        Operation::Export => export_target(settings, &task.target),
    };
    let report = result.unwrap_or_else(|err| {
        tracing::warn!(event = "task_failed", task = %task, error = %format!("{err:#}"));
        failed_report(task, &err)
    });
    log_state(task, TaskState::Finished(report.outcome));
    report
}

/// Run every task and return one report entry per task, in input order.
///
/// With `settings.parallel` tasks touching different locale files run on the
/// rayon pool; tasks on the same locale file keep their relative order.
pub fn run_batch(ctx: &mut RunContext, tasks: &[BatchTask]) -> BatchReport {
    for t in tasks {
        log_state(t, TaskState::Pending);
    }
    tracing::info!(event = "batch_start", tasks = tasks.len(), parallel = ctx.settings.parallel);

    if ctx.settings.parallel {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_target: HashMap<&LocaleTarget, usize> = HashMap::new();
        for (i, t) in tasks.iter().enumerate() {
            let g = *by_target.entry(&t.target).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(i);
        }

        let settings = &ctx.settings;
        let mut done: Vec<(usize, TaskReport)> = groups
            .par_iter()
            .flat_map_iter(|group| {
                group
                    .iter()
                    .map(|&i| (i, run_task(settings, &tasks[i])))
                    .collect::<Vec<_>>()
            })
            .collect();
        done.sort_by_key(|(i, _)| *i);
        for (_, report) in done {
            ctx.record(report);
        }
    } else {
        for t in tasks {
            let report = run_task(&ctx.settings, t);
            ctx.record(report);
        }
    }

    let report = ctx.finish();
    tracing::info!(
        event = "batch_done",
        status = %report.status,
        failed = report.count_outcome(TaskOutcome::Failed)
    );
    report
}
