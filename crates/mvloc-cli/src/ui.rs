// Console output helpers. Logs go through tracing; these are for the user.

use mvloc_domain::{BatchReport, Severity, TaskOutcome};
use owo_colors::OwoColorize;

#[macro_export]
macro_rules! ui_ok {
    ($($arg:tt)*) => {{
        println!("✔ {}", format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! ui_err {
    ($($arg:tt)*) => {{
        eprintln!("✖ {}", format!($($arg)*));
    }};
}

fn outcome_tag(outcome: TaskOutcome, use_color: bool) -> String {
    let (icon, word) = match outcome {
        TaskOutcome::Success => ("✔", "ok"),
        TaskOutcome::SuccessWithWarnings => ("⚠", "warnings"),
        TaskOutcome::Failed => ("✖", "failed"),
    };
    if !use_color {
        return format!("{icon} {word}");
    }
    match outcome {
        TaskOutcome::Success => format!("{} {}", icon.green(), word.green()),
        TaskOutcome::SuccessWithWarnings => format!("{} {}", icon.yellow(), word.yellow()),
        TaskOutcome::Failed => format!("{} {}", icon.red(), word.red()),
    }
}

/// One line per task plus its findings, then a totals line.
pub fn print_summary(report: &BatchReport, use_color: bool) {
    for t in &report.tasks {
        let c = &t.counts;
        let target = if use_color {
            t.target().cyan().to_string()
        } else {
            t.target()
        };
        println!(
            "{} {} {} (+{} ~{} -{} ={})",
            outcome_tag(t.outcome, use_color),
            t.operation,
            target,
            c.added,
            c.changed,
            c.removed,
            c.unchanged
        );
        for f in &t.findings {
            let sev = match (use_color, f.severity) {
                (false, s) => s.to_string(),
                (true, Severity::Error) => f.severity.red().to_string(),
                (true, Severity::Warning) => f.severity.yellow().to_string(),
            };
            match &f.key {
                Some(k) => println!("    {sev} [{}] {k}: {}", f.kind, f.message),
                None => println!("    {sev} [{}] {}", f.kind, f.message),
            }
        }
    }
    let totals = report.totals();
    let status = if use_color {
        match report.status {
            mvloc_domain::AggregateStatus::Success => report.status.green().to_string(),
            mvloc_domain::AggregateStatus::PartialFailure => report.status.yellow().to_string(),
            mvloc_domain::AggregateStatus::Failure => report.status.red().to_string(),
        }
    } else {
        report.status.to_string()
    };
    println!(
        "{} task(s): {} failed; added={} changed={} removed={} unchanged={}; {}",
        report.tasks.len(),
        report.count_outcome(TaskOutcome::Failed),
        totals.added,
        totals.changed,
        totals.removed,
        totals.unchanged,
        status
    );
}
