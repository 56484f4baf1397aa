use mvloc_export::ExportFormat;
use mvloc_sync::MergeConfig;
use mvloc_validate::{PlaceholderSeverity, ValidateConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "mvloc.toml";

/// Raw `mvloc.toml` contents. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MvlocConfig {
    pub source_lang: Option<String>,
    pub languages: Option<Vec<String>>,
    pub source_dir: Option<String>,
    pub baseline_dir: Option<String>,
    pub locale_dir: Option<String>,
    pub export_dir: Option<String>,
    pub report: Option<String>,
    pub sync: Option<SyncCfg>,
    pub validate: Option<ValidateCfg>,
    pub export: Option<ExportCfg>,
    pub batch: Option<BatchCfg>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncCfg {
    pub archive_removed: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateCfg {
    /// Signed so a negative value can be rejected with a clear message.
    pub stale_threshold: Option<i64>,
    pub placeholder_severity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportCfg {
    pub empty_identical: Option<bool>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchCfg {
    pub parallel: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Read `mvloc.toml` from the working directory and the user config dir.
/// The working directory wins field by field.
pub fn load_config() -> Result<MvlocConfig, ConfigError> {
    let cwd = std::env::current_dir().ok();
    let user = dirs::config_dir().map(|d| d.join("mvloc"));
    load_layers(cwd.as_deref(), user.as_deref())
}

pub fn load_layers(cwd: Option<&Path>, user: Option<&Path>) -> Result<MvlocConfig, ConfigError> {
    let mut merged = MvlocConfig::default();
    for dir in [cwd, user].into_iter().flatten() {
        if let Some(cfg) = read_config_file(&dir.join(CONFIG_FILE))? {
            merged = merged.or(cfg);
        }
    }
    Ok(merged)
}

/// `Ok(None)` when the file does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<MvlocConfig>, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let cfg = toml::from_str::<MvlocConfig>(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;
    tracing::debug!(event = "config_loaded", path = %path.display());
    Ok(Some(cfg))
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (a, b) => a.or(b),
    }
}

impl MvlocConfig {
    /// Fill every unset field of `self` from `lower`.
    pub fn or(self, lower: MvlocConfig) -> MvlocConfig {
        MvlocConfig {
            source_lang: self.source_lang.or(lower.source_lang),
            languages: self.languages.or(lower.languages),
            source_dir: self.source_dir.or(lower.source_dir),
            baseline_dir: self.baseline_dir.or(lower.baseline_dir),
            locale_dir: self.locale_dir.or(lower.locale_dir),
            export_dir: self.export_dir.or(lower.export_dir),
            report: self.report.or(lower.report),
            sync: merge_opt(self.sync, lower.sync, |a, b| SyncCfg {
                archive_removed: a.archive_removed.or(b.archive_removed),
            }),
            validate: merge_opt(self.validate, lower.validate, |a, b| ValidateCfg {
                stale_threshold: a.stale_threshold.or(b.stale_threshold),
                placeholder_severity: a.placeholder_severity.or(b.placeholder_severity),
            }),
            export: merge_opt(self.export, lower.export, |a, b| ExportCfg {
                empty_identical: a.empty_identical.or(b.empty_identical),
                format: a.format.or(b.format),
            }),
            batch: merge_opt(self.batch, lower.batch, |a, b| BatchCfg {
                parallel: a.parallel.or(b.parallel),
            }),
        }
    }
}

/// Validated settings for one run. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub source_lang: String,
    pub languages: Vec<String>,
    pub source_dir: PathBuf,
    pub baseline_dir: Option<PathBuf>,
    pub locale_dir: PathBuf,
    pub export_dir: PathBuf,
    pub report: PathBuf,
    pub merge: MergeConfig,
    pub validate: ValidateConfig,
    pub export_format: ExportFormat,
    pub empty_identical: bool,
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_lang: "en".into(),
            languages: Vec::new(),
            source_dir: default_source_dir("en"),
            baseline_dir: None,
            locale_dir: PathBuf::from("locale"),
            export_dir: PathBuf::from("output"),
            report: PathBuf::from("report.txt"),
            merge: MergeConfig::default(),
            validate: ValidateConfig::default(),
            export_format: ExportFormat::Json,
            empty_identical: false,
            parallel: false,
        }
    }
}

/// `src-<lang>`, the reference snapshot directory of a source language.
pub fn default_source_dir(source_lang: &str) -> PathBuf {
    PathBuf::from(format!("src-{source_lang}"))
}

fn check_language(code: &str) -> Result<(), ConfigError> {
    if code.trim().is_empty() {
        return Err(ConfigError::Invalid("language codes must not be empty".into()));
    }
    if code.contains([':', '/', '\\']) {
        return Err(ConfigError::Invalid(format!(
            "language code `{code}` must not contain `:`, `/` or `\\`"
        )));
    }
    Ok(())
}

impl Settings {
    pub fn resolve(cfg: MvlocConfig) -> Result<Settings, ConfigError> {
        let d = Settings::default();
        let validate_cfg = cfg.validate.unwrap_or_default();
        let export_cfg = cfg.export.unwrap_or_default();

        let stale_threshold = match validate_cfg.stale_threshold {
            None => d.validate.stale_threshold,
            Some(n) if n < 0 => {
                return Err(ConfigError::Invalid(format!(
                    "validate.stale_threshold must not be negative (got {n})"
                )))
            }
            Some(n) => u32::try_from(n).map_err(|_| {
                ConfigError::Invalid(format!("validate.stale_threshold is too large (got {n})"))
            })?,
        };
        let placeholder_severity = match validate_cfg.placeholder_severity {
            None => PlaceholderSeverity::default(),
            Some(s) => s
                .parse()
                .map_err(|e: String| ConfigError::Invalid(format!("validate.placeholder_severity: {e}")))?,
        };
        let export_format = match export_cfg.format {
            None => ExportFormat::default(),
            Some(s) => s
                .parse()
                .map_err(|e: String| ConfigError::Invalid(format!("export.format: {e}")))?,
        };

        let source_lang = cfg.source_lang.unwrap_or(d.source_lang);
        check_language(&source_lang)?;
        let languages = cfg.languages.unwrap_or_default();
        for l in &languages {
            check_language(l)?;
            if *l == source_lang {
                return Err(ConfigError::Invalid(format!(
                    "`{l}` is the source language and cannot be a translation target"
                )));
            }
        }
        let source_dir = cfg
            .source_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| default_source_dir(&source_lang));

        Ok(Settings {
            source_lang,
            languages,
            source_dir,
            baseline_dir: cfg.baseline_dir.map(PathBuf::from),
            locale_dir: cfg.locale_dir.map(PathBuf::from).unwrap_or(d.locale_dir),
            export_dir: cfg.export_dir.map(PathBuf::from).unwrap_or(d.export_dir),
            report: cfg.report.map(PathBuf::from).unwrap_or(d.report),
            merge: MergeConfig {
                archive_removed: cfg
                    .sync
                    .and_then(|s| s.archive_removed)
                    .unwrap_or(d.merge.archive_removed),
            },
            validate: ValidateConfig {
                stale_threshold,
                placeholder_severity,
            },
            export_format,
            empty_identical: export_cfg.empty_identical.unwrap_or(d.empty_identical),
            parallel: cfg.batch.and_then(|b| b.parallel).unwrap_or(d.parallel),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> MvlocConfig {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn resolves_defaults() {
        let s = Settings::resolve(MvlocConfig::default()).unwrap();
        assert_eq!(s, Settings::default());
        assert!(s.merge.archive_removed);
        assert_eq!(s.validate.stale_threshold, 3);
    }

    #[test]
    fn reads_every_section() {
        let s = Settings::resolve(parse(
            r#"
            source_lang = "en"
            languages = ["ko", "ja"]
            source_dir = "src-en"
            baseline_dir = "baseline"
            locale_dir = "locale"
            export_dir = "out"
            report = "logs/report.txt"

            [sync]
            archive_removed = false

            [validate]
            stale_threshold = 5
            placeholder_severity = "error"

            [export]
            empty_identical = true
            format = "xml"

            [batch]
            parallel = true
            "#,
        ))
        .unwrap();
        assert_eq!(s.languages, vec!["ko", "ja"]);
        assert_eq!(s.baseline_dir, Some(PathBuf::from("baseline")));
        assert!(!s.merge.archive_removed);
        assert_eq!(s.validate.stale_threshold, 5);
        assert_eq!(s.validate.placeholder_severity, PlaceholderSeverity::Error);
        assert_eq!(s.export_format, ExportFormat::Xml);
        assert!(s.empty_identical && s.parallel);
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            "[validate]\nstale_threshold = -1\n",
            "[validate]\nplaceholder_severity = \"loud\"\n",
            "[export]\nformat = \"csv\"\n",
            "languages = [\"ko:kr\"]\n",
            "languages = [\"ko\", \"en\"]\n",
            "source_lang = \"ja\"\nlanguages = [\"ja\"]\n",
        ] {
            assert!(
                matches!(Settings::resolve(parse(bad)), Err(ConfigError::Invalid(_))),
                "should reject {bad:?}"
            );
        }
    }

    #[test]
    fn working_directory_wins_per_field() {
        let cwd = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        std::fs::write(
            cwd.path().join(CONFIG_FILE),
            "languages = [\"ko\"]\n[validate]\nstale_threshold = 1\n",
        )
        .unwrap();
        std::fs::write(
            user.path().join(CONFIG_FILE),
            "languages = [\"ja\"]\nlocale_dir = \"tr\"\n[validate]\nstale_threshold = 9\nplaceholder_severity = \"ignore\"\n",
        )
        .unwrap();

        let cfg = load_layers(Some(cwd.path()), Some(user.path())).unwrap();
        let s = Settings::resolve(cfg).unwrap();
        assert_eq!(s.languages, vec!["ko"]);
        assert_eq!(s.locale_dir, PathBuf::from("tr"));
        assert_eq!(s.validate.stale_threshold, 1);
        assert_eq!(s.validate.placeholder_severity, PlaceholderSeverity::Ignore);
    }

    #[test]
    fn malformed_file_is_an_error_and_absent_is_not() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_layers(Some(dir.path()), None).unwrap().languages.is_none());
        std::fs::write(dir.path().join(CONFIG_FILE), "languages = [").unwrap();
        assert!(matches!(
            load_layers(Some(dir.path()), None),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn source_directory_follows_source_language() {
        let s = Settings::resolve(parse("source_lang = \"ko\"\nlanguages = [\"en\"]\n")).unwrap();
        assert_eq!(s.source_dir, PathBuf::from("src-ko"));
        assert_eq!(s.languages, vec!["en"]);

        let s = Settings::resolve(parse("source_lang = \"ko\"\nsource_dir = \"ref\"\n")).unwrap();
        assert_eq!(s.source_dir, PathBuf::from("ref"));
    }
}
