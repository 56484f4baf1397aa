use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Number of hex digits kept from the BLAKE3 digest.
const HASH_HEX_LEN: usize = 16;

/// Change-detection hash of a source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(text: &str) -> Self {
        let digest = blake3::hash(text.as_bytes());
        Self(digest.to_hex()[..HASH_HEX_LEN].to_string())
    }

    /// Accepts a previously serialized hash; rejects anything that is not
    /// exactly 16 lowercase hex digits.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        let ok = s.len() == HASH_HEX_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        ok.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One reference-language string of a source snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceString {
    pub key: String,
    pub text: String,
    pub hash: ContentHash,
}

impl SourceString {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = ContentHash::of(&text);
        Self {
            key: key.into(),
            text,
            hash,
        }
    }
}

/// Reference corpus at one point in time. Keys are unique; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSnapshot {
    strings: Vec<SourceString>,
    index: HashMap<String, usize>,
}

impl SourceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a string. Returns `false` (and keeps the first one) when the key already exists.
    pub fn insert(&mut self, s: SourceString) -> bool {
        if self.index.contains_key(&s.key) {
            return false;
        }
        self.index.insert(s.key.clone(), self.strings.len());
        self.strings.push(s);
        true
    }

    pub fn get(&self, key: &str) -> Option<&SourceString> {
        self.index.get(key).map(|&i| &self.strings[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceString> {
        self.strings.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|s| s.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl FromIterator<(String, String)> for SourceSnapshot {
    /// Later duplicates are ignored.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut snap = SourceSnapshot::new();
        for (k, v) in iter {
            snap.insert(SourceString::new(k, v));
        }
        snap
    }
}

/// Lifecycle state of a translation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    Missing,
    UpToDate,
    Stale,
    Removed,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryStatus::Missing => "missing",
            EntryStatus::UpToDate => "up-to-date",
            EntryStatus::Stale => "stale",
            EntryStatus::Removed => "removed",
        })
    }
}

/// Pass-through text the record store keeps for faithful re-serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMeta {
    /// Raw comment-only lines that preceded the record (newlines included).
    pub leading: String,
    /// Comment lines of the record the store does not interpret, without newlines.
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    pub key: String,
    pub translated_text: String,
    pub status: EntryStatus,
    /// Hash of the source text this translation was last reconciled against.
    pub synced_hash: ContentHash,
    /// Source text recorded at the last sync that touched this entry.
    pub source_text: String,
    /// Source revisions this entry has stayed stale through.
    pub stale_syncs: u32,
    pub meta: EntryMeta,
}

impl TranslationEntry {
    /// Fresh untranslated entry for a source string.
    pub fn missing(source: &SourceString) -> Self {
        Self {
            key: source.key.clone(),
            translated_text: String::new(),
            status: EntryStatus::Missing,
            synced_hash: source.hash.clone(),
            source_text: source.text.clone(),
            stale_syncs: 0,
            meta: EntryMeta::default(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.translated_text.is_empty()
    }
}

/// Raw bytes of a record as it was loaded, together with the value parsed from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub parsed: TranslationEntry,
    pub raw: String,
}

/// Format memo carried alongside the entries so unedited input can be written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Raw header block; `None` until the file has been loaded or saved once.
    pub header: Option<String>,
    pub trailer: String,
    pub newline: &'static str,
    pub pristine: HashMap<String, RawRecord>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            header: None,
            trailer: String::new(),
            newline: "\n",
            pristine: HashMap::new(),
        }
    }
}

/// Translations of one resource into one language, unique by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleFile {
    pub language: String,
    pub entries: Vec<TranslationEntry>,
    pub layout: Layout,
}

impl LocaleFile {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&TranslationEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry unless its key is already present.
    pub fn push(&mut self, entry: TranslationEntry) -> bool {
        if self.contains_key(&entry.key) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// The source revision this file was last synced against: every live
    /// entry contributes its recorded source text.
    pub fn synced_snapshot(&self) -> SourceSnapshot {
        self.entries
            .iter()
            .filter(|e| e.status != EntryStatus::Removed)
            .map(|e| (e.key.clone(), e.source_text.clone()))
            .collect()
    }
}

/// Typed failures of one locale file. They fail the task that hit them and
/// nothing else.
#[derive(Debug, Error)]
pub enum MvlocError {
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        key: Option<String>,
        message: String,
    },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MvlocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MvlocError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            MvlocError::Parse { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}
