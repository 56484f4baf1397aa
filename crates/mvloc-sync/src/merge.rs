use crate::diff::{Classification, DiffResult};
use mvloc_core::{ContentHash, EntryStatus, LocaleFile, SourceString, TranslationEntry};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Keep removed keys as tombstones instead of dropping them.
    pub archive_removed: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            archive_removed: true,
        }
    }
}

/// What a merge did, for logs and summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub created: usize,
    pub staled: usize,
    pub archived: usize,
    pub pruned: usize,
    pub revived: usize,
}

fn revive(entry: &mut TranslationEntry, new: &SourceString) {
    entry.status = if !entry.has_text() {
        entry.synced_hash = new.hash.clone();
        EntryStatus::Missing
    } else if entry.synced_hash == new.hash {
        EntryStatus::UpToDate
    } else {
        EntryStatus::Stale
    };
    entry.source_text = new.text.clone();
    entry.stale_syncs = 0;
}

/// A live entry that is not flagged stale counts as approved against the
/// source text it records. Bookkeeping left over from an earlier review is reset.
fn settle_approved(entry: &mut TranslationEntry) {
    if matches!(entry.status, EntryStatus::Stale | EntryStatus::Removed) {
        return;
    }
    entry.synced_hash = ContentHash::of(&entry.source_text);
    entry.stale_syncs = 0;
}

fn apply_change(entry: &mut TranslationEntry, new: &SourceString, stats: &mut MergeStats) {
    if entry.synced_hash == new.hash {
        // source is back on the revision the translation was written for
        entry.status = if entry.has_text() {
            EntryStatus::UpToDate
        } else {
            EntryStatus::Missing
        };
        entry.source_text = new.text.clone();
        entry.stale_syncs = 0;
        return;
    }
    if !entry.has_text() {
        entry.status = EntryStatus::Missing;
        entry.synced_hash = new.hash.clone();
        entry.source_text = new.text.clone();
        return;
    }
    if entry.status != EntryStatus::Stale {
        entry.status = EntryStatus::Stale;
        entry.stale_syncs = 0;
        stats.staled += 1;
    }
    // synced_hash stays on the revision the translation was written for
    if entry.source_text != new.text {
        entry.source_text = new.text.clone();
        entry.stale_syncs += 1;
    }
}

/// Apply `diff` to `existing`. Translated text is never changed; only status
/// and sync bookkeeping move. Applying the same diff twice is a no-op.
pub fn merge(
    existing: &LocaleFile,
    diff: &DiffResult,
    config: &MergeConfig,
) -> (LocaleFile, MergeStats) {
    let mut stats = MergeStats::default();
    let mut entries = Vec::with_capacity(existing.entries.len());
    let mut present: HashSet<&str> = HashSet::with_capacity(existing.entries.len());

    for old in &existing.entries {
        present.insert(old.key.as_str());
        let mut entry = old.clone();
        settle_approved(&mut entry);
        match diff.get(&old.key) {
            None => {}
            // live entries are left alone; a tombstone under a live source key is not
            Some(Classification::Unchanged { current: new })
            | Some(Classification::Added { new }) => {
                if entry.status == EntryStatus::Removed {
                    revive(&mut entry, new);
                    stats.revived += 1;
                }
            }
            Some(Classification::Changed { new, .. }) => {
                if entry.status == EntryStatus::Removed {
                    revive(&mut entry, new);
                    stats.revived += 1;
                } else {
                    apply_change(&mut entry, new, &mut stats);
                }
            }
            Some(Classification::Removed { .. }) => {
                if !config.archive_removed {
                    stats.pruned += 1;
                    continue;
                }
                if entry.status != EntryStatus::Removed {
                    entry.status = EntryStatus::Removed;
                    stats.archived += 1;
                }
            }
        }
        entries.push(entry);
    }

    for (key, class) in diff.iter() {
        if present.contains(key) {
            continue;
        }
        let source = match class {
            Classification::Added { new } | Classification::Changed { new, .. } => new,
            Classification::Unchanged { current } => current,
            Classification::Removed { .. } => continue,
        };
        entries.push(TranslationEntry::missing(source));
        stats.created += 1;
    }

    tracing::debug!(
        event = "merge_done",
        language = %existing.language,
        created = stats.created,
        staled = stats.staled,
        archived = stats.archived,
        pruned = stats.pruned,
        revived = stats.revived
    );

    let merged = LocaleFile {
        language: existing.language.clone(),
        entries,
        layout: existing.layout.clone(),
    };
    (merged, stats)
}
