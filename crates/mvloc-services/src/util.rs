use color_eyre::eyre::bail;
use mvloc_config::Settings;
use mvloc_core::{LocaleFile, MvlocError, Result, SourceSnapshot};
use mvloc_domain::KeyCounts;
use mvloc_export::ExportFormat;
use mvloc_store::SNAPSHOT_EXTENSIONS;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// One locale file: a source resource translated into one language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleTarget {
    /// Source path relative to `source_dir`, `/`-separated, without the snapshot extension.
    pub resource: String,
    pub language: String,
}

impl LocaleTarget {
    pub fn new(resource: impl Into<String>, language: impl Into<String>) -> Result<Self> {
        let target = Self {
            resource: resource.into(),
            language: language.into(),
        };
        target.check()?;
        Ok(target)
    }

    fn check(&self) -> Result<()> {
        if self.language.is_empty() || self.language.contains([':', '/', '\\']) {
            bail!("invalid language code `{}`", self.language);
        }
        let path = Path::new(&self.resource);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if self.resource.is_empty() || escapes {
            bail!(
                "invalid resource `{}`: must be a relative path inside the source directory",
                self.resource
            );
        }
        Ok(())
    }

    /// The source language has no locale files of its own.
    pub fn ensure_translatable(&self, settings: &Settings) -> Result<()> {
        if self.language == settings.source_lang {
            bail!(
                "`{self}`: `{}` is the source language, not a translation target",
                self.language
            );
        }
        Ok(())
    }

    pub fn locale_path(&self, settings: &Settings) -> PathBuf {
        settings
            .locale_dir
            .join(&self.resource)
            .join(format!("{}.po", self.language))
    }

    pub fn export_path(&self, settings: &Settings, format: ExportFormat) -> PathBuf {
        settings
            .export_dir
            .join(&self.language)
            .join(format!("{}.{}", self.resource, format.extension()))
    }
}

impl FromStr for LocaleTarget {
    type Err = color_eyre::eyre::Report;

    /// `resource:language`; the language is whatever follows the last colon.
    fn from_str(s: &str) -> Result<Self> {
        match s.rsplit_once(':') {
            Some((resource, language)) => LocaleTarget::new(resource, language),
            None => bail!("expected `resource:language`, got `{s}`"),
        }
    }
}

impl fmt::Display for LocaleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.language)
    }
}

/// First existing `<dir>/<resource>.<ext>` over the snapshot extensions.
pub fn find_snapshot(dir: &Path, resource: &str) -> Option<PathBuf> {
    SNAPSHOT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{resource}.{ext}")))
        .find(|p| p.is_file())
}

/// Path of the current source snapshot of a resource.
pub fn find_source(settings: &Settings, resource: &str) -> Result<PathBuf> {
    find_snapshot(&settings.source_dir, resource).ok_or_else(|| {
        let path = settings.source_dir.join(format!("{resource}.*"));
        MvlocError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source snapshot not found"),
        )
        .into()
    })
}

/// Previous source revision: the baseline file when one is configured and
/// present, otherwise what the locale file itself was last synced against.
pub(crate) fn old_snapshot(
    settings: &Settings,
    resource: &str,
    synced: impl FnOnce() -> SourceSnapshot,
) -> Result<SourceSnapshot> {
    if let Some(path) = settings
        .baseline_dir
        .as_deref()
        .and_then(|dir| find_snapshot(dir, resource))
    {
        return Ok(mvloc_store::load_snapshot(&path)?);
    }
    Ok(synced())
}

/// Drift a sync of `file` would pick up from `source`.
pub(crate) fn pending_counts(
    settings: &Settings,
    resource: &str,
    file: &LocaleFile,
    source: &SourceSnapshot,
) -> Result<KeyCounts> {
    let old = old_snapshot(settings, resource, || file.synced_snapshot())?;
    Ok(mvloc_sync::diff(&old, source).counts())
}
