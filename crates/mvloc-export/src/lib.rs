use color_eyre::eyre::{Result, WrapErr};
use mvloc_core::{EntryStatus, LocaleFile, SourceSnapshot};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Xml,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            other => Err(format!("unknown export format `{other}` (expected json or xml)")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Translated strings worth shipping: live, non-empty, in file order.
/// With `empty_identical`, a translation equal to its source text counts as untranslated.
pub fn exportable(
    file: &LocaleFile,
    source: &SourceSnapshot,
    empty_identical: bool,
) -> Vec<(String, String)> {
    file.entries
        .iter()
        .filter(|e| matches!(e.status, EntryStatus::UpToDate | EntryStatus::Stale))
        .filter(|e| e.has_text())
        .filter(|e| {
            !(empty_identical
                && source
                    .get(&e.key)
                    .is_some_and(|s| s.text == e.translated_text))
        })
        .map(|e| (e.key.clone(), e.translated_text.clone()))
        .collect()
}

pub fn render_json(pairs: &[(String, String)]) -> Result<Vec<u8>> {
    let map: serde_json::Map<String, serde_json::Value> = pairs
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();
    let mut out = serde_json::to_vec_pretty(&map)?;
    out.push(b'\n');
    Ok(out)
}

/// `<strings lang="..."><string key="...">text</string>...</strings>`
pub fn render_xml(language: &str, pairs: &[(String, String)]) -> Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("strings");
    root.push_attribute(("lang", language));
    w.write_event(Event::Start(root))?;
    for (key, value) in pairs {
        let mut tag = BytesStart::new("string");
        tag.push_attribute(("key", key.as_str()));
        w.write_event(Event::Start(tag))?;
        w.write_event(Event::Text(BytesText::new(value)))?;
        w.write_event(Event::End(BytesEnd::new("string")))?;
    }
    w.write_event(Event::End(BytesEnd::new("strings")))?;
    let mut out = w.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Render and atomically write an export file. Returns the number of strings written.
pub fn write_export(
    path: &Path,
    format: ExportFormat,
    language: &str,
    pairs: &[(String, String)],
) -> Result<usize> {
    let bytes = match format {
        ExportFormat::Json => render_json(pairs)?,
        ExportFormat::Xml => render_xml(language, pairs)?,
    };
    mvloc_store::write_atomic(path, &bytes)
        .wrap_err_with(|| format!("writing export {}", path.display()))?;
    tracing::debug!(
        event = "export_written",
        path = %path.display(),
        format = %format,
        strings = pairs.len()
    );
    Ok(pairs.len())
}
