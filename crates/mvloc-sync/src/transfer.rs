use mvloc_core::{EntryMeta, EntryStatus, LocaleFile, TranslationEntry};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Copy every non-empty live translation over live entries, with its fuzzy flag.
pub const DEFAULT_CRITERIA: &str = "!o!e:!o:vf";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("invalid criteria `{criteria}`: {reason}")]
    Criteria { criteria: String, reason: String },
    #[error("catalogs belong to different sources (`{from}` vs `{into}`); relocate keys to merge them")]
    LocationMismatch { from: String, into: String },
    #[error("catalogs hold different languages (`{from}` vs `{into}`)")]
    LanguageMismatch { from: String, into: String },
}

/// Entry property tested by a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `o`: archived (Removed).
    Obsolete,
    /// `f`: flagged for review (Stale).
    Fuzzy,
    /// `e`: no translated text.
    Empty,
    /// `n`: key exists only in the donor catalog.
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    pub condition: Condition,
    pub negated: bool,
}

/// Attribute copied from the donor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `v`: translated text.
    Value,
    /// `l`: recorded source text, hash and stale count.
    SourceRef,
    /// `o`: archived flag.
    Obsolete,
    /// `f`: review flag.
    Fuzzy,
}

/// `X:Y:Z` selection for [`transfer`]. `X` filters donor entries, `Y` filters
/// the entries they would overwrite and `Z` lists the copied attributes.
/// Conditions are `o`, `f`, `e` and `n` (donor side only), each optionally
/// prefixed with `!`. Attributes are `v`, `l`, `o` and `f`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCriteria {
    pub from: Vec<Criterion>,
    pub into: Vec<Criterion>,
    pub fields: Vec<Field>,
}

impl Default for CopyCriteria {
    fn default() -> Self {
        Self {
            from: vec![
                Criterion {
                    condition: Condition::Obsolete,
                    negated: true,
                },
                Criterion {
                    condition: Condition::Empty,
                    negated: true,
                },
            ],
            into: vec![Criterion {
                condition: Condition::Obsolete,
                negated: true,
            }],
            fields: vec![Field::Value, Field::Fuzzy],
        }
    }
}

fn parse_conditions(part: &str, allow_new: bool) -> Result<Vec<Criterion>, String> {
    let mut out = Vec::new();
    let mut chars = part.chars();
    while let Some(c) = chars.next() {
        let (negated, c) = if c == '!' {
            match chars.next() {
                Some(c) => (true, c),
                None => return Err("`!` must be followed by a condition".into()),
            }
        } else {
            (false, c)
        };
        let condition = match c {
            'o' => Condition::Obsolete,
            'f' => Condition::Fuzzy,
            'e' => Condition::Empty,
            'n' if allow_new => Condition::New,
            'n' => return Err("`n` only applies to the donor side".into()),
            other => return Err(format!("unknown condition `{other}`")),
        };
        out.push(Criterion { condition, negated });
    }
    Ok(out)
}

impl FromStr for CopyCriteria {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| TransferError::Criteria {
            criteria: s.to_string(),
            reason,
        };
        let parts: Vec<&str> = s.split(':').collect();
        let [from, into, fields] = parts.as_slice() else {
            return Err(invalid("expected three `:`-separated parts".into()));
        };
        let fields = fields
            .chars()
            .map(|c| match c {
                'v' => Ok(Field::Value),
                'l' => Ok(Field::SourceRef),
                'o' => Ok(Field::Obsolete),
                'f' => Ok(Field::Fuzzy),
                other => Err(format!("unknown field `{other}`")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;
        Ok(Self {
            from: parse_conditions(from, true).map_err(invalid)?,
            into: parse_conditions(into, false).map_err(invalid)?,
            fields,
        })
    }
}

/// What a transfer did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub skipped: usize,
    pub created: usize,
    pub overwritten: usize,
}

fn holds(c: Condition, entry: &TranslationEntry, is_new: bool) -> bool {
    match c {
        Condition::Obsolete => entry.status == EntryStatus::Removed,
        Condition::Fuzzy => entry.status == EntryStatus::Stale,
        Condition::Empty => !entry.has_text(),
        Condition::New => is_new,
    }
}

fn selects(criteria: &[Criterion], entry: &TranslationEntry, is_new: bool) -> bool {
    criteria
        .iter()
        .all(|c| holds(c.condition, entry, is_new) != c.negated)
}

fn copy_fields(donor: &TranslationEntry, target: &mut TranslationEntry, fields: &[Field]) {
    if fields.is_empty() {
        return;
    }
    let mut obsolete = target.status == EntryStatus::Removed;
    let mut fuzzy = target.status == EntryStatus::Stale;
    for field in fields {
        match field {
            Field::Value => target.translated_text = donor.translated_text.clone(),
            Field::SourceRef => {
                target.synced_hash = donor.synced_hash.clone();
                target.source_text = donor.source_text.clone();
                target.stale_syncs = donor.stale_syncs;
            }
            Field::Obsolete => obsolete = donor.status == EntryStatus::Removed,
            Field::Fuzzy => fuzzy = donor.status == EntryStatus::Stale,
        }
    }
    target.status = if obsolete {
        EntryStatus::Removed
    } else if !target.has_text() {
        EntryStatus::Missing
    } else if fuzzy {
        EntryStatus::Stale
    } else {
        EntryStatus::UpToDate
    };
}

/// Resource prefix of keys shaped `location$path`, taken from the first entry.
pub fn source_location(file: &LocaleFile) -> Option<&str> {
    file.entries
        .first()
        .and_then(|e| e.key.split_once('$'))
        .map(|(loc, _)| loc)
}

/// Copy translations from `from` into `into`, both catalogs of one language.
/// Entries of `into` keep their position; entries created from `from` are
/// appended in donor order. With `relocate`, donor keys are moved onto the
/// source location of `into` first.
pub fn transfer(
    from: &LocaleFile,
    into: &LocaleFile,
    criteria: &CopyCriteria,
    relocate: bool,
) -> Result<(LocaleFile, TransferStats), TransferError> {
    if from.language != into.language {
        return Err(TransferError::LanguageMismatch {
            from: from.language.clone(),
            into: into.language.clone(),
        });
    }
    let rename = match (source_location(from), source_location(into)) {
        (Some(a), Some(b)) if a != b => {
            if !relocate {
                return Err(TransferError::LocationMismatch {
                    from: a.to_string(),
                    into: b.to_string(),
                });
            }
            Some((format!("{a}$"), format!("{b}$")))
        }
        _ => None,
    };

    let mut out = into.clone();
    let index: HashMap<String, usize> = out
        .entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.key.clone(), i))
        .collect();
    let mut stats = TransferStats::default();

    for donor in &from.entries {
        let key = match &rename {
            Some((old, new)) => match donor.key.strip_prefix(old.as_str()) {
                Some(rest) => format!("{new}{rest}"),
                None => donor.key.clone(),
            },
            None => donor.key.clone(),
        };
        let slot = index.get(&key).copied();
        if !selects(&criteria.from, donor, slot.is_none()) {
            stats.skipped += 1;
            continue;
        }
        match slot {
            Some(i) => {
                let target = &mut out.entries[i];
                if !selects(&criteria.into, target, false) {
                    stats.skipped += 1;
                    continue;
                }
                copy_fields(donor, target, &criteria.fields);
                stats.overwritten += 1;
            }
            None => {
                // created entries always carry the donor's source reference and archived flag
                let mut entry = TranslationEntry {
                    key,
                    translated_text: String::new(),
                    status: if donor.status == EntryStatus::Removed {
                        EntryStatus::Removed
                    } else {
                        EntryStatus::Missing
                    },
                    synced_hash: donor.synced_hash.clone(),
                    source_text: donor.source_text.clone(),
                    stale_syncs: 0,
                    meta: EntryMeta::default(),
                };
                copy_fields(donor, &mut entry, &criteria.fields);
                out.entries.push(entry);
                stats.created += 1;
            }
        }
    }

    tracing::debug!(
        event = "transfer_done",
        language = %out.language,
        skipped = stats.skipped,
        created = stats.created,
        overwritten = stats.overwritten
    );
    Ok((out, stats))
}
