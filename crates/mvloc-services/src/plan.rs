use crate::util::find_snapshot;
use crate::{BatchTask, LocaleTarget};
use color_eyre::eyre::{bail, WrapErr};
use mvloc_config::Settings;
use mvloc_core::Result;
use mvloc_domain::Operation;
use mvloc_store::SNAPSHOT_EXTENSIONS;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Resources under `source_dir`, in sorted path order.
fn discover_resources(source_dir: &Path) -> Result<Vec<String>> {
    if !source_dir.is_dir() {
        bail!("source directory {} does not exist", source_dir.display());
    }
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.wrap_err_with(|| format!("walking {}", source_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !SNAPSHOT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            continue;
        }
        let Ok(rel) = path.with_extension("").strip_prefix(source_dir).map(|p| p.to_path_buf())
        else {
            continue;
        };
        let resource = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if seen.insert(resource.clone()) {
            out.push(resource);
        }
    }
    Ok(out)
}

/// Every resource under `source_dir` crossed with `languages`, resource-major.
pub fn plan_tasks(
    settings: &Settings,
    languages: &[String],
    operation: Operation,
) -> Result<Vec<BatchTask>> {
    if languages.is_empty() {
        bail!("no target languages: pass --lang or set `languages` in mvloc.toml");
    }
    let resources = discover_resources(&settings.source_dir)?;
    let mut tasks = Vec::with_capacity(resources.len() * languages.len());
    for resource in &resources {
        for lang in languages {
            tasks.push(BatchTask::new(
                LocaleTarget::new(resource.clone(), lang.clone())?,
                operation,
            ));
        }
    }
    tracing::debug!(
        event = "plan_ready",
        resources = resources.len(),
        languages = languages.len(),
        tasks = tasks.len()
    );
    Ok(tasks)
}

/// Delete `<locale_dir>/<resource>/<lang>.po` files of `languages` whose
/// resource has no source snapshot any more. Returns the deleted paths.
pub fn clean_orphans(settings: &Settings, languages: &[String]) -> Result<Vec<PathBuf>> {
    let locale_dir = &settings.locale_dir;
    if !locale_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut removed = Vec::new();
    for entry in WalkDir::new(locale_dir).sort_by_file_name() {
        let entry = entry.wrap_err_with(|| format!("walking {}", locale_dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("po")
        {
            continue;
        }
        let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !languages.iter().any(|l| l == lang) {
            continue;
        }
        let Some(rel) = path.parent().and_then(|p| p.strip_prefix(locale_dir).ok()) else {
            continue;
        };
        let resource = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if resource.is_empty() || find_snapshot(&settings.source_dir, &resource).is_some() {
            continue;
        }
        std::fs::remove_file(path)
            .wrap_err_with(|| format!("removing orphaned locale {}", path.display()))?;
        tracing::info!(event = "locale_orphan_removed", path = %path.display(), resource = %resource);
        removed.push(path.to_path_buf());
    }
    Ok(removed)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    #[serde(default)]
    task: Vec<PlanEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanEntry {
    resource: String,
    language: String,
    operation: Operation,
}

/// Read an explicit task list:
///
/// ```toml
/// [[task]]
/// resource = "data/events.xml"
/// language = "ko"
/// operation = "sync"
/// ```
pub fn load_plan(path: &Path) -> Result<Vec<BatchTask>> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading plan {}", path.display()))?;
    let plan: PlanFile =
        toml::from_str(&text).wrap_err_with(|| format!("parsing plan {}", path.display()))?;
    plan.task
        .into_iter()
        .map(|t| Ok(BatchTask::new(LocaleTarget::new(t.resource, t.language)?, t.operation)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn plans_sorted_resources_per_language() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src-en");
        fs::create_dir_all(src.join("data")).unwrap();
        fs::write(src.join("data/weapons.xml.po"), "").unwrap();
        fs::write(src.join("data/events.xml.json"), "{}").unwrap();
        fs::write(src.join("misc.json"), "{}").unwrap();
        fs::write(src.join("notes.txt"), "").unwrap();
        let s = Settings {
            source_dir: src,
            ..Settings::default()
        };

        let tasks = plan_tasks(&s, &["ko".into(), "ja".into()], Operation::Sync).unwrap();
        let names: Vec<String> = tasks.iter().map(|t| t.target.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "data/events.xml:ko",
                "data/events.xml:ja",
                "data/weapons.xml:ko",
                "data/weapons.xml:ja",
                "misc:ko",
                "misc:ja",
            ]
        );
        assert!(plan_tasks(&s, &[], Operation::Sync).is_err());
    }

    #[test]
    fn reads_plan_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.toml");
        fs::write(
            &path,
            "[[task]]\nresource = \"ui\"\nlanguage = \"ko\"\noperation = \"sync\"\n\n\
             [[task]]\nresource = \"ui\"\nlanguage = \"ko\"\noperation = \"export\"\n",
        )
        .unwrap();
        let tasks = load_plan(&path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].operation, Operation::Export);

        fs::write(&path, "[[task]]\nresource = \"ui\"\nlanguage = \"ko\"\noperation = \"fly\"\n")
            .unwrap();
        assert!(load_plan(&path).is_err());
    }

    #[test]
    fn cleaning_removes_only_orphaned_locales_of_the_languages() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings {
            source_dir: dir.path().join("src-en"),
            locale_dir: dir.path().join("locale"),
            ..Settings::default()
        };
        fs::create_dir_all(s.source_dir.join("data")).unwrap();
        fs::write(s.source_dir.join("data/events.xml.json"), "{}").unwrap();
        for rel in [
            "data/events.xml/ko.po",
            "data/gone.xml/ko.po",
            "data/gone.xml/ja.po",
        ] {
            let p = s.locale_dir.join(rel);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, "").unwrap();
        }

        let removed = clean_orphans(&s, &["ko".into()]).unwrap();
        assert_eq!(removed, vec![s.locale_dir.join("data/gone.xml/ko.po")]);
        assert!(s.locale_dir.join("data/events.xml/ko.po").is_file());
        assert!(s.locale_dir.join("data/gone.xml/ja.po").is_file());
    }
}
