//! PO-style catalog codec.
//!
//! A record is a block of non-blank lines plus the blank lines after it.
//! `msgctxt` holds the key, `msgid` the source text the entry was synced
//! with and `msgstr` the translation. Status lives in flags (`#, fuzzy`,
//! `#, missing`) and in the `#~` obsolete prefix; sync bookkeeping lives in
//! `#. hash:` and `#. stale-syncs:` comments. Everything else is passed
//! through untouched.

use mvloc_core::{
    ContentHash, EntryMeta, EntryStatus, Layout, LocaleFile, MvlocError, RawRecord,
    TranslationEntry,
};
use std::collections::HashMap;
use std::path::Path;

const BOM: char = '\u{feff}';
const HASH_TAG: &str = "hash:";
const STALE_TAG: &str = "stale-syncs:";

pub(crate) fn escape_po(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Parse one `"..."` literal; the closing quote must be the last character.
pub(crate) fn parse_po_string(s: &str) -> Result<String, String> {
    let s = s.trim();
    let inner = s
        .strip_prefix('"')
        .ok_or_else(|| format!("expected a quoted string, found `{s}`"))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => return Err(format!("unknown escape `\\{other}`")),
                None => return Err("unterminated string".into()),
            },
            '"' => {
                let rest = chars.as_str();
                if !rest.trim().is_empty() {
                    return Err(format!("unexpected text after string: `{rest}`"));
                }
                return Ok(out);
            }
            _ => out.push(c),
        }
    }
    Err("unterminated string".into())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Ctxt,
    Id,
    Str,
}

#[derive(Default)]
struct Draft {
    ctxt: Option<String>,
    id: Option<String>,
    str_: Option<String>,
    open: Option<Field>,
    obsolete: bool,
    fuzzy: bool,
    missing: bool,
    hash: Option<ContentHash>,
    stale_syncs: u32,
    comments: Vec<String>,
}

impl Draft {
    fn field_mut(&mut self, f: Field) -> &mut Option<String> {
        match f {
            Field::Ctxt => &mut self.ctxt,
            Field::Id => &mut self.id,
            Field::Str => &mut self.str_,
        }
    }

    fn has_keywords(&self) -> bool {
        self.ctxt.is_some() || self.id.is_some() || self.str_.is_some()
    }
}

enum Block {
    Trivia,
    Header,
    Record(TranslationEntry),
}

struct Parser<'a> {
    path: &'a Path,
}

impl Parser<'_> {
    fn err(&self, line: usize, key: Option<&str>, message: impl Into<String>) -> MvlocError {
        MvlocError::Parse {
            path: self.path.to_path_buf(),
            line,
            key: key.map(str::to_string),
            message: message.into(),
        }
    }

    fn keyword_line(&self, d: &mut Draft, t: &str, lineno: usize) -> Result<(), MvlocError> {
        let key = d.ctxt.clone();
        let bad = |m: String| self.err(lineno, key.as_deref(), m);
        if t.starts_with('"') {
            let field = d
                .open
                .ok_or_else(|| bad("continuation line without an open field".into()))?;
            let chunk = parse_po_string(t).map_err(bad)?;
            if let Some(s) = d.field_mut(field) {
                s.push_str(&chunk);
            }
            return Ok(());
        }
        let (word, rest) = t.split_once(char::is_whitespace).unwrap_or((t, ""));
        let field = match word {
            "msgctxt" => Field::Ctxt,
            "msgid" => Field::Id,
            "msgstr" => Field::Str,
            other => return Err(bad(format!("unknown keyword `{other}`"))),
        };
        if d.field_mut(field).is_some() {
            return Err(bad(format!("`{word}` given twice in one record")));
        }
        let value = parse_po_string(rest).map_err(bad)?;
        *d.field_mut(field) = Some(value);
        d.open = Some(field);
        Ok(())
    }

    fn comment_line(&self, d: &mut Draft, t: &str, lineno: usize) -> Result<(), MvlocError> {
        if let Some(flags) = t.strip_prefix("#,") {
            let mut other = Vec::new();
            for flag in flags.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                match flag {
                    "fuzzy" => d.fuzzy = true,
                    "missing" => d.missing = true,
                    _ => other.push(flag),
                }
            }
            if !other.is_empty() {
                d.comments.push(format!("#, {}", other.join(", ")));
            }
            return Ok(());
        }
        if let Some(rest) = t.strip_prefix("#.") {
            let rest = rest.trim();
            if let Some(h) = rest.strip_prefix(HASH_TAG) {
                let hash = ContentHash::from_hex(h).ok_or_else(|| {
                    self.err(lineno, d.ctxt.as_deref(), format!("malformed hash `{}`", h.trim()))
                })?;
                d.hash = Some(hash);
                return Ok(());
            }
            if let Some(n) = rest.strip_prefix(STALE_TAG) {
                d.stale_syncs = n.trim().parse().map_err(|_| {
                    self.err(
                        lineno,
                        d.ctxt.as_deref(),
                        format!("malformed stale-syncs `{}`", n.trim()),
                    )
                })?;
                return Ok(());
            }
        }
        d.comments.push(t.to_string());
        Ok(())
    }

    fn block(&self, lines: &[(usize, &str)], first_block: bool) -> Result<Block, MvlocError> {
        let mut d = Draft::default();
        for &(lineno, raw) in lines {
            let t = raw.trim_end_matches(['\n', '\r']).trim();
            if let Some(rest) = t.strip_prefix("#~") {
                d.obsolete = true;
                self.keyword_line(&mut d, rest.trim(), lineno)?;
            } else if t.starts_with('#') {
                d.open = None;
                self.comment_line(&mut d, t, lineno)?;
            } else {
                self.keyword_line(&mut d, t, lineno)?;
            }
        }

        let start = lines.first().map(|l| l.0).unwrap_or(1);
        if !d.has_keywords() {
            return Ok(Block::Trivia);
        }
        let Some(key) = d.ctxt.take() else {
            if first_block && d.id.as_deref() == Some("") && !d.obsolete {
                return Ok(Block::Header);
            }
            return Err(self.err(start, None, "record without msgctxt"));
        };
        if key.is_empty() {
            return Err(self.err(start, None, "empty msgctxt"));
        }
        let Some(translated_text) = d.str_.take() else {
            return Err(self.err(start, Some(&key), "record without msgstr"));
        };
        let source_text = d.id.take().unwrap_or_default();
        let status = if d.obsolete {
            EntryStatus::Removed
        } else if d.fuzzy {
            EntryStatus::Stale
        } else if d.missing {
            EntryStatus::Missing
        } else {
            EntryStatus::UpToDate
        };
        Ok(Block::Record(TranslationEntry {
            synced_hash: d.hash.unwrap_or_else(|| ContentHash::of(&source_text)),
            key,
            translated_text,
            status,
            source_text,
            stale_syncs: d.stale_syncs,
            meta: EntryMeta {
                leading: String::new(),
                comments: d.comments,
            },
        }))
    }
}

fn header_language(header: &str) -> Option<String> {
    header
        .split("\\n")
        .filter_map(|part| part.split_once("Language:"))
        .map(|(_, v)| v.trim().trim_end_matches('"').trim().to_string())
        .find(|v| !v.is_empty())
}

/// Parse catalog text. `fallback_language` is used when the header has no `Language:`.
pub fn parse_catalog(
    text: &str,
    path: &Path,
    fallback_language: &str,
) -> Result<LocaleFile, MvlocError> {
    let parser = Parser { path };
    let newline = if text.split('\n').next().is_some_and(|l| l.ends_with('\r')) {
        "\r\n"
    } else {
        "\n"
    };

    // Comment-only blocks (and a BOM) wait here until the next record claims them.
    let mut pending = String::new();
    let mut body = text;
    if let Some(rest) = text.strip_prefix(BOM) {
        pending.push(BOM);
        body = rest;
    }

    // (content lines, raw text including trailing blank lines)
    let mut blocks: Vec<(Vec<(usize, &str)>, String)> = Vec::new();
    let mut cur: Vec<(usize, &str)> = Vec::new();
    let mut cur_raw = String::new();
    let mut trailing_blank = false;
    for (i, line) in body.split_inclusive('\n').enumerate() {
        let blank = line.trim().is_empty();
        if blank {
            if cur.is_empty() {
                pending.push_str(line);
            } else {
                cur_raw.push_str(line);
                trailing_blank = true;
            }
            continue;
        }
        if trailing_blank {
            blocks.push((std::mem::take(&mut cur), std::mem::take(&mut cur_raw)));
            trailing_blank = false;
        }
        cur.push((i + 1, line));
        cur_raw.push_str(line);
    }
    if !cur.is_empty() {
        blocks.push((cur, cur_raw));
    }

    let mut file = LocaleFile::new(fallback_language);
    let mut header: Option<String> = None;
    let mut pristine: HashMap<String, RawRecord> = HashMap::new();
    let mut seen_record = false;
    for (lines, raw) in blocks {
        let first_block = !seen_record && header.is_none();
        match parser.block(&lines, first_block)? {
            Block::Trivia => pending.push_str(&raw),
            Block::Header => {
                let raw = std::mem::take(&mut pending) + &raw;
                if let Some(lang) = header_language(&raw) {
                    file.language = lang;
                }
                header = Some(raw);
            }
            Block::Record(mut entry) => {
                seen_record = true;
                if pristine.contains_key(&entry.key) {
                    let line = lines.first().map(|l| l.0).unwrap_or(0);
                    return Err(parser.err(line, Some(&entry.key), "duplicate key"));
                }
                entry.meta.leading = std::mem::take(&mut pending);
                let raw = entry.meta.leading.clone() + &raw;
                pristine.insert(
                    entry.key.clone(),
                    RawRecord {
                        parsed: entry.clone(),
                        raw,
                    },
                );
                file.entries.push(entry);
            }
        }
    }

    file.layout = Layout {
        header: Some(header.unwrap_or_default()),
        trailer: pending,
        newline,
        pristine,
    };
    Ok(file)
}

fn ends_with_blank_line(s: &str) -> bool {
    let Some(rest) = s.strip_suffix('\n') else {
        return false;
    };
    let rest = rest.strip_suffix('\r').unwrap_or(rest);
    rest.is_empty() || rest.ends_with('\n')
}

/// Make sure the next block starts after a blank line.
fn separate(out: &mut String, nl: &str) {
    if out.is_empty() || out == "\u{feff}" {
        return;
    }
    if !out.ends_with('\n') {
        out.push_str(nl);
    }
    if !ends_with_blank_line(out) {
        out.push_str(nl);
    }
}

fn render_header(language: &str, nl: &str) -> String {
    let mut h = String::new();
    h.push_str(&format!("msgid \"\"{nl}msgstr \"\"{nl}"));
    h.push_str(&format!("\"Language: {}\\n\"{nl}", escape_po(language)));
    h.push_str(&format!("\"MIME-Version: 1.0\\n\"{nl}"));
    h.push_str(&format!("\"Content-Type: text/plain; charset=UTF-8\\n\"{nl}"));
    h.push_str(&format!("\"Content-Transfer-Encoding: 8bit\\n\"{nl}"));
    h
}

fn render_entry(e: &TranslationEntry, nl: &str) -> String {
    let mut out = String::new();
    for c in &e.meta.comments {
        out.push_str(c);
        out.push_str(nl);
    }
    out.push_str(&format!("#. {HASH_TAG} {}{nl}", e.synced_hash));
    if e.stale_syncs > 0 {
        out.push_str(&format!("#. {STALE_TAG} {}{nl}", e.stale_syncs));
    }
    match e.status {
        EntryStatus::Stale => out.push_str(&format!("#, fuzzy{nl}")),
        EntryStatus::Missing => out.push_str(&format!("#, missing{nl}")),
        EntryStatus::UpToDate | EntryStatus::Removed => {}
    }
    let prefix = if e.status == EntryStatus::Removed {
        "#~ "
    } else {
        ""
    };
    out.push_str(&format!("{prefix}msgctxt \"{}\"{nl}", escape_po(&e.key)));
    out.push_str(&format!("{prefix}msgid \"{}\"{nl}", escape_po(&e.source_text)));
    out.push_str(&format!(
        "{prefix}msgstr \"{}\"{nl}",
        escape_po(&e.translated_text)
    ));
    out
}

/// Serialize a locale file. Entries equal to what was loaded are written back
/// byte-for-byte; edited and new ones are rendered.
pub fn serialize_catalog(file: &LocaleFile) -> String {
    let layout = &file.layout;
    let nl = layout.newline;
    let mut out = match &layout.header {
        Some(h) => h.clone(),
        None => render_header(&file.language, nl),
    };
    for e in &file.entries {
        match layout.pristine.get(&e.key) {
            Some(raw) if raw.parsed == *e => {
                separate(&mut out, nl);
                out.push_str(&raw.raw);
            }
            _ => {
                separate(&mut out, nl);
                out.push_str(&e.meta.leading);
                out.push_str(&render_entry(e, nl));
            }
        }
    }
    if !layout.trailer.is_empty() {
        separate(&mut out, nl);
        out.push_str(&layout.trailer);
    }
    out
}
