//! Source snapshots: the reference-language strings of one resource.
//!
//! Two layouts are read. A flat JSON object of `key -> text`, or a catalog
//! whose `msgstr` values hold the reference text (the reference-language file
//! of a translation project). Keys with empty text carry nothing to translate
//! and are dropped.

use crate::{catalog::parse_catalog, read_utf8, StoreResult};
use mvloc_core::{EntryStatus, MvlocError, SourceSnapshot, SourceString};
use serde::de::{Deserializer, MapAccess, Visitor};
use std::fmt;
use std::path::Path;

/// Extensions recognised as source snapshots, in lookup order.
pub const SNAPSHOT_EXTENSIONS: &[&str] = &["po", "json"];

struct OrderedPairs(Vec<(String, String)>);

impl<'de> serde::Deserialize<'de> for OrderedPairs {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct PairVisitor;

        impl<'de> Visitor<'de> for PairVisitor {
            type Value = OrderedPairs;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping string keys to string texts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, String>()? {
                    out.push((k, v));
                }
                Ok(OrderedPairs(out))
            }
        }

        d.deserialize_map(PairVisitor)
    }
}

/// Line of the `nth` (0-based) occurrence of `"key"` in the raw text.
fn line_of_occurrence(text: &str, key: &str, nth: usize) -> usize {
    let needle = serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""));
    text.match_indices(&needle)
        .nth(nth)
        .map(|(at, _)| text[..at].matches('\n').count() + 1)
        .unwrap_or(0)
}

fn build(
    path: &Path,
    pairs: impl IntoIterator<Item = (String, String, usize)>,
) -> StoreResult<SourceSnapshot> {
    let mut snap = SourceSnapshot::new();
    for (key, text, line) in pairs {
        if snap.contains_key(&key) {
            return Err(MvlocError::Parse {
                path: path.to_path_buf(),
                line,
                key: Some(key),
                message: "duplicate key in source snapshot".into(),
            });
        }
        if text.is_empty() {
            continue;
        }
        snap.insert(SourceString::new(key, text));
    }
    Ok(snap)
}

/// Parse a flat JSON object of `key -> text`, keeping document order.
pub fn parse_json_snapshot(text: &str, path: &Path) -> StoreResult<SourceSnapshot> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let OrderedPairs(pairs) = serde_json::from_str(text).map_err(|e| MvlocError::Parse {
        path: path.to_path_buf(),
        line: e.line(),
        key: None,
        message: e.to_string(),
    })?;

    let mut seen = std::collections::HashMap::<&str, usize>::new();
    let mut located = Vec::with_capacity(pairs.len());
    for (k, v) in &pairs {
        let n = seen.entry(k.as_str()).or_insert(0);
        let line = if *n > 0 {
            line_of_occurrence(text, k, *n)
        } else {
            0
        };
        *n += 1;
        located.push((k.clone(), v.clone(), line));
    }
    build(path, located)
}

/// Load a source snapshot from `.json` or `.po`.
pub fn load_snapshot(path: &Path) -> StoreResult<SourceSnapshot> {
    let text = read_utf8(path)?;
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let snap = if ext == "json" {
        parse_json_snapshot(&text, path)?
    } else {
        let catalog = parse_catalog(&text, path, "")?;
        build(
            path,
            catalog
                .entries
                .into_iter()
                .filter(|e| e.status != EntryStatus::Removed)
                .map(|e| (e.key, e.translated_text, 0)),
        )?
    };
    tracing::debug!(
        event = "snapshot_loaded",
        path = %path.display(),
        strings = snap.len()
    );
    Ok(snap)
}
