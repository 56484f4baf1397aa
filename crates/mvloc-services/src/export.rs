use crate::util::{find_source, pending_counts, LocaleTarget};
use mvloc_config::Settings;
use mvloc_core::Result;
use mvloc_domain::{Operation, TaskOutcome, TaskReport};
use mvloc_export::{exportable, write_export};
use mvloc_store::{load_locale, load_snapshot};

/// Write the shippable strings of one locale file. Refuses to write anything
/// when validation finds an error.
pub fn export_target(settings: &Settings, target: &LocaleTarget) -> Result<TaskReport> {
    let source = load_snapshot(&find_source(settings, &target.resource)?)?;
    let file = load_locale(&target.locale_path(settings), &target.language)?;
    let counts = pending_counts(settings, &target.resource, &file, &source)?;
    let findings = mvloc_validate::validate(&file, &source, &settings.validate);
    let outcome = TaskOutcome::from_findings(&findings);

    let output = if outcome.is_failure() {
        tracing::warn!(event = "export_refused", locale = %target, "validation errors, nothing written");
        None
    } else {
        let pairs = exportable(&file, &source, settings.empty_identical);
        let path = target.export_path(settings, settings.export_format);
        write_export(&path, settings.export_format, &target.language, &pairs)?;
        Some(path.display().to_string())
    };

    Ok(TaskReport {
        resource: target.resource.clone(),
        language: target.language.clone(),
        operation: Operation::Export,
        outcome,
        counts,
        findings,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvloc_export::ExportFormat;
    use std::fs;
    use std::path::Path;

    fn setup(root: &Path, locale_text: &str) -> (Settings, LocaleTarget) {
        let s = Settings {
            source_dir: root.join("src"),
            locale_dir: root.join("locale"),
            export_dir: root.join("out"),
            ..Settings::default()
        };
        fs::create_dir_all(&s.source_dir).unwrap();
        fs::write(s.source_dir.join("ui.json"), r#"{"A": "Yes", "B": "No"}"#).unwrap();
        let t = LocaleTarget::new("ui", "fr").unwrap();
        let p = t.locale_path(&s);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, locale_text).unwrap();
        (s, t)
    }

    #[test]
    fn writes_translated_strings() {
        let dir = tempfile::tempdir().unwrap();
        let (mut s, t) = setup(
            dir.path(),
            "msgctxt \"A\"\nmsgid \"Yes\"\nmsgstr \"Oui\"\n\n#, missing\nmsgctxt \"B\"\nmsgid \"No\"\nmsgstr \"\"\n",
        );
        let rep = export_target(&s, &t).unwrap();
        assert_eq!(rep.outcome, TaskOutcome::Success);
        assert_eq!(rep.counts.unchanged, 2);
        let out: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(t.export_path(&s, ExportFormat::Json)).unwrap())
                .unwrap();
        assert_eq!(out, serde_json::json!({"A": "Oui"}));

        s.export_format = ExportFormat::Xml;
        export_target(&s, &t).unwrap();
        assert!(t.export_path(&s, ExportFormat::Xml).is_file());
    }

    #[test]
    fn refuses_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (s, t) = setup(
            dir.path(),
            "msgctxt \"A\"\nmsgid \"Yes\"\nmsgstr \"\"\n\n#, missing\nmsgctxt \"B\"\nmsgid \"No\"\nmsgstr \"\"\n",
        );
        let rep = export_target(&s, &t).unwrap();
        assert_eq!(rep.outcome, TaskOutcome::Failed);
        assert!(rep.output.is_none());
        assert!(!t.export_path(&s, ExportFormat::Json).exists());
    }
}
