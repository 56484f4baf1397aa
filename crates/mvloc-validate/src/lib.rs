use mvloc_core::{EntryStatus, LocaleFile, SourceSnapshot};
use mvloc_domain::{Finding, FindingKind, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// How placeholder mismatches are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderSeverity {
    Error,
    #[default]
    Warning,
    Ignore,
}

impl PlaceholderSeverity {
    fn severity(self) -> Option<Severity> {
        match self {
            PlaceholderSeverity::Error => Some(Severity::Error),
            PlaceholderSeverity::Warning => Some(Severity::Warning),
            PlaceholderSeverity::Ignore => None,
        }
    }
}

impl FromStr for PlaceholderSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(PlaceholderSeverity::Error),
            "warning" | "warn" => Ok(PlaceholderSeverity::Warning),
            "ignore" | "off" => Ok(PlaceholderSeverity::Ignore),
            other => Err(format!(
                "unknown placeholder severity `{other}` (expected error, warning or ignore)"
            )),
        }
    }
}

impl fmt::Display for PlaceholderSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaceholderSeverity::Error => "error",
            PlaceholderSeverity::Warning => "warning",
            PlaceholderSeverity::Ignore => "ignore",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateConfig {
    /// Stale entries that survived more source revisions than this are reported.
    pub stale_threshold: u32,
    pub placeholder_severity: PlaceholderSeverity,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            stale_threshold: 3,
            placeholder_severity: PlaceholderSeverity::Warning,
        }
    }
}

/// Interpolation markers of a text, with multiplicity.
pub fn extract_placeholders(s: &str) -> BTreeMap<String, usize> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"%(\d+\$)?0?\d*[sdif]|\{[A-Za-z0-9_.:]+\}|\[[A-Za-z_][A-Za-z0-9_]*\]")
            .expect("placeholder pattern compiles")
    });
    let mut found = BTreeMap::new();
    for m in re.find_iter(s) {
        *found.entry(m.as_str().to_string()).or_insert(0) += 1;
    }
    found
}

fn describe(p: &BTreeMap<String, usize>) -> String {
    if p.is_empty() {
        return "none".into();
    }
    p.iter()
        .map(|(k, n)| if *n > 1 { format!("{k} x{n}") } else { k.clone() })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a locale file against the current source. Never mutates either side.
pub fn validate(file: &LocaleFile, source: &SourceSnapshot, cfg: &ValidateConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut live: HashSet<&str> = HashSet::with_capacity(file.entries.len());
    let mut archived: HashSet<&str> = HashSet::new();

    for e in &file.entries {
        if e.status == EntryStatus::Removed {
            archived.insert(e.key.as_str());
            continue;
        }
        live.insert(e.key.as_str());
        let key = Some(e.key.as_str());

        if !e.has_text() && e.status != EntryStatus::Missing {
            findings.push(Finding::error(
                FindingKind::EmptyTranslation,
                key,
                format!("translation is empty but status is {}", e.status),
            ));
        }

        let src = source.get(&e.key);
        if let (Some(src), Some(severity)) = (src, cfg.placeholder_severity.severity()) {
            if e.has_text() {
                let want = extract_placeholders(&src.text);
                let got = extract_placeholders(&e.translated_text);
                if want != got {
                    findings.push(Finding::new(
                        severity,
                        FindingKind::PlaceholderMismatch,
                        key,
                        format!(
                            "placeholders differ: source has {}, translation has {}",
                            describe(&want),
                            describe(&got)
                        ),
                    ));
                }
            }
        }

        if e.status == EntryStatus::Stale && e.stale_syncs > cfg.stale_threshold {
            findings.push(Finding::warning(
                FindingKind::StaleThreshold,
                key,
                format!(
                    "stale through {} source revisions (threshold {})",
                    e.stale_syncs, cfg.stale_threshold
                ),
            ));
        }

        if src.is_none() {
            findings.push(Finding::warning(
                FindingKind::OrphanEntry,
                key,
                "key is not in the source and is not archived",
            ));
        }
    }

    for s in source.iter() {
        let key = s.key.as_str();
        if live.contains(key) {
            continue;
        }
        let message = if archived.contains(key) {
            "source key is archived in the locale file"
        } else {
            "source key has no entry in the locale file"
        };
        findings.push(Finding::warning(
            FindingKind::MissingEntry,
            Some(key),
            message,
        ));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvloc_core::{SourceString, TranslationEntry};

    fn entry(key: &str, src: &str, text: &str, status: EntryStatus) -> TranslationEntry {
        let mut e = TranslationEntry::missing(&SourceString::new(key, src));
        e.translated_text = text.into();
        e.status = status;
        e
    }

    fn kinds(f: &[Finding]) -> Vec<(FindingKind, Option<&str>)> {
        f.iter().map(|f| (f.kind, f.key.as_deref())).collect()
    }

    #[test]
    fn placeholders_are_counted() {
        let p = extract_placeholders("Deal {0} damage to [target], %s and %1$s, {0} again");
        assert_eq!(p.get("{0}"), Some(&2));
        assert!(p.contains_key("[target]"));
        assert!(p.contains_key("%s"));
        assert!(p.contains_key("%1$s"));
        assert!(extract_placeholders("100% sure [ ]").is_empty());
    }

    #[test]
    fn reports_each_problem_in_order() {
        let source: SourceSnapshot = [
            ("A", "Hit {0} times"),
            ("B", "Plain"),
            ("C", "Old text"),
            ("D", "Not yet"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut stale = entry("C", "Old text", "Vieux", EntryStatus::Stale);
        stale.stale_syncs = 4;
        let mut file = LocaleFile::new("fr");
        file.entries = vec![
            entry("A", "Hit {0} times", "Frappe", EntryStatus::UpToDate),
            entry("B", "Plain", "", EntryStatus::UpToDate),
            stale,
            entry("Z", "gone", "parti", EntryStatus::UpToDate),
            entry("Y", "gone", "", EntryStatus::Removed),
        ];

        let f = validate(&file, &source, &ValidateConfig::default());
        assert_eq!(
            kinds(&f),
            vec![
                (FindingKind::PlaceholderMismatch, Some("A")),
                (FindingKind::EmptyTranslation, Some("B")),
                (FindingKind::StaleThreshold, Some("C")),
                (FindingKind::OrphanEntry, Some("Z")),
                (FindingKind::MissingEntry, Some("D")),
            ]
        );
        assert_eq!(f[0].severity, Severity::Warning);
        assert_eq!(f[1].severity, Severity::Error);
    }

    #[test]
    fn placeholder_severity_is_configurable() {
        let source: SourceSnapshot = [("A".to_string(), "%d items".to_string())]
            .into_iter()
            .collect();
        let mut file = LocaleFile::new("de");
        file.entries = vec![entry("A", "%d items", "Gegenstände", EntryStatus::UpToDate)];

        let strict = ValidateConfig {
            placeholder_severity: PlaceholderSeverity::Error,
            ..ValidateConfig::default()
        };
        assert!(validate(&file, &source, &strict)[0].is_error());

        let off = ValidateConfig {
            placeholder_severity: PlaceholderSeverity::Ignore,
            ..ValidateConfig::default()
        };
        assert!(validate(&file, &source, &off).is_empty());
    }

    #[test]
    fn threshold_is_exclusive_and_missing_is_fine() {
        let source: SourceSnapshot = [
            ("A".to_string(), "x".to_string()),
            ("B".to_string(), "y".to_string()),
        ]
        .into_iter()
        .collect();
        let mut a = entry("A", "x", "t", EntryStatus::Stale);
        a.stale_syncs = 3;
        let mut file = LocaleFile::new("it");
        file.entries = vec![a, entry("B", "y", "", EntryStatus::Missing)];
        assert!(validate(&file, &source, &ValidateConfig::default()).is_empty());
    }

    #[test]
    fn severity_parses_from_config_strings() {
        assert_eq!("Error".parse(), Ok(PlaceholderSeverity::Error));
        assert_eq!("ignore".parse(), Ok(PlaceholderSeverity::Ignore));
        assert!("loud".parse::<PlaceholderSeverity>().is_err());
    }

    #[test]
    fn archived_entry_for_a_live_source_key_is_missing() {
        let source: SourceSnapshot = [("A".to_string(), "a".to_string())]
            .into_iter()
            .collect();
        let mut file = LocaleFile::new("pt");
        file.entries = vec![entry("A", "a", "x", EntryStatus::Removed)];

        let f = validate(&file, &source, &ValidateConfig::default());
        assert_eq!(kinds(&f), vec![(FindingKind::MissingEntry, Some("A"))]);
        assert!(f[0].message.contains("archived"));
    }
}
