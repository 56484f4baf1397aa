use color_eyre::eyre::WrapErr;
use mvloc_core::Result;
use mvloc_domain::{BatchReport, KeyCounts, TaskOutcome};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Consumer of a finished batch report.
pub trait ReportSink {
    fn emit(&mut self, report: &BatchReport) -> Result<()>;
}

fn counts_line(c: &KeyCounts) -> String {
    format!(
        "added={} changed={} removed={} unchanged={}",
        c.added, c.changed, c.removed, c.unchanged
    )
}

/// Human-readable report: one section per task in input order, then a `TOTAL:` line.
pub fn render_text(report: &BatchReport) -> String {
    let mut out = String::new();
    for (i, t) in report.tasks.iter().enumerate() {
        let _ = writeln!(out, "[{}] {} {}", i + 1, t.operation, t.target());
        let _ = writeln!(out, "  outcome: {}", t.outcome);
        let _ = writeln!(out, "  counts: {}", counts_line(&t.counts));
        if let Some(path) = &t.output {
            let _ = writeln!(out, "  output: {path}");
        }
        if t.findings.is_empty() {
            let _ = writeln!(out, "  findings: none");
        } else {
            let _ = writeln!(out, "  findings:");
            for f in &t.findings {
                match &f.key {
                    Some(k) => {
                        let _ = writeln!(out, "    {} {} [{}]: {}", f.severity, f.kind, k, f.message);
                    }
                    None => {
                        let _ = writeln!(out, "    {} {}: {}", f.severity, f.kind, f.message);
                    }
                }
            }
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "TOTAL: tasks={} success={} success-with-warnings={} failed={} {} status={}",
        report.tasks.len(),
        report.count_outcome(TaskOutcome::Success),
        report.count_outcome(TaskOutcome::SuccessWithWarnings),
        report.count_outcome(TaskOutcome::Failed),
        counts_line(&report.totals()),
        report.status
    );
    out
}

/// Writes `report.txt` (or any path) in the text layout.
#[derive(Debug, Clone)]
pub struct TextReportSink {
    path: PathBuf,
}

impl TextReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for TextReportSink {
    fn emit(&mut self, report: &BatchReport) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("creating {}", parent.display()))?;
        }
        let file = File::create(&self.path)
            .wrap_err_with(|| format!("creating report {}", self.path.display()))?;
        let mut w = BufWriter::new(file);
        w.write_all(render_text(report).as_bytes())?;
        w.flush()?;
        tracing::info!(event = "report_written", path = %self.path.display());
        Ok(())
    }
}

/// Pretty JSON of the whole report, schema version included.
pub struct JsonReportSink<W: Write> {
    out: W,
}

impl<W: Write> JsonReportSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonReportSink<W> {
    fn emit(&mut self, report: &BatchReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, report)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvloc_domain::{Finding, FindingKind, Operation, TaskReport};

    fn sample() -> BatchReport {
        let ok = TaskReport {
            resource: "data/events.xml".into(),
            language: "ko".into(),
            operation: Operation::Sync,
            outcome: TaskOutcome::SuccessWithWarnings,
            counts: KeyCounts {
                added: 2,
                changed: 1,
                removed: 0,
                unchanged: 5,
            },
            findings: vec![Finding::warning(
                FindingKind::MissingEntry,
                Some("EVT_1"),
                "source key has no entry in the locale file",
            )],
            output: Some("locale/data/events.xml/ko.po".into()),
        };
        let bad = TaskReport {
            resource: "data/bad.xml".into(),
            language: "ko".into(),
            operation: Operation::Sync,
            outcome: TaskOutcome::Failed,
            counts: KeyCounts::default(),
            findings: vec![Finding::error(FindingKind::ParseError, None, "ko.po:3: unterminated string")],
            output: None,
        };
        BatchReport::new(vec![ok, bad])
    }

    #[test]
    fn text_has_a_section_per_task_and_a_total() {
        let text = render_text(&sample());
        let first = text.find("[1] sync data/events.xml:ko").unwrap();
        let second = text.find("[2] sync data/bad.xml:ko").unwrap();
        assert!(first < second);
        assert!(text.contains("    warning missing-entry [EVT_1]:"));
        assert!(text.contains("    error parse-error: ko.po:3"));
        let last = text.lines().last().unwrap();
        assert_eq!(
            last,
            "TOTAL: tasks=2 success=0 success-with-warnings=1 failed=1 \
             added=2 changed=1 removed=0 unchanged=5 status=partial-failure"
        );
    }

    #[test]
    fn sinks_write_their_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.txt");
        TextReportSink::new(&path).emit(&sample()).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("TOTAL:"));

        let mut sink = JsonReportSink::new(Vec::new());
        sink.emit(&sample()).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(v["schema_version"], 1);
        assert_eq!(v["tasks"][1]["findings"][0]["kind"], "parse-error");
    }
}
