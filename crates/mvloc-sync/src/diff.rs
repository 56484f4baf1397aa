use mvloc_core::{ContentHash, SourceSnapshot, SourceString};
use mvloc_domain::KeyCounts;
use std::collections::BTreeMap;

/// How one key moved between two source revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Added { new: SourceString },
    Changed { old_hash: ContentHash, new: SourceString },
    Removed { old_hash: ContentHash },
    Unchanged { current: SourceString },
}

/// Every key of either revision, classified exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    keys: BTreeMap<String, Classification>,
}

impl DiffResult {
    pub fn get(&self, key: &str) -> Option<&Classification> {
        self.keys.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Classification)> {
        self.keys.iter().map(|(k, c)| (k.as_str(), c))
    }

    fn select(&self, pred: fn(&Classification) -> bool) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|(_, c)| pred(c))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn added(&self) -> Vec<&str> {
        self.select(|c| matches!(c, Classification::Added { .. }))
    }

    pub fn changed(&self) -> Vec<&str> {
        self.select(|c| matches!(c, Classification::Changed { .. }))
    }

    pub fn removed(&self) -> Vec<&str> {
        self.select(|c| matches!(c, Classification::Removed { .. }))
    }

    pub fn unchanged(&self) -> Vec<&str> {
        self.select(|c| matches!(c, Classification::Unchanged { .. }))
    }

    pub fn counts(&self) -> KeyCounts {
        let mut counts = KeyCounts::default();
        for c in self.keys.values() {
            match c {
                Classification::Added { .. } => counts.added += 1,
                Classification::Changed { .. } => counts.changed += 1,
                Classification::Removed { .. } => counts.removed += 1,
                Classification::Unchanged { .. } => counts.unchanged += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Classify every key of `old` and `new`. Linear in the number of strings;
/// the result does not depend on snapshot ordering.
pub fn diff(old: &SourceSnapshot, new: &SourceSnapshot) -> DiffResult {
    let mut keys = BTreeMap::new();
    for s in new.iter() {
        let class = match old.get(&s.key) {
            None => Classification::Added { new: s.clone() },
            Some(prev) if prev.hash != s.hash => Classification::Changed {
                old_hash: prev.hash.clone(),
                new: s.clone(),
            },
            Some(_) => Classification::Unchanged { current: s.clone() },
        };
        keys.insert(s.key.clone(), class);
    }
    for s in old.iter() {
        if !new.contains_key(&s.key) {
            keys.insert(
                s.key.clone(),
                Classification::Removed {
                    old_hash: s.hash.clone(),
                },
            );
        }
    }
    DiffResult { keys }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn snap(pairs: &[(&str, &str)]) -> SourceSnapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn partitions_the_union_of_keys() {
        let old = snap(&[("A", "1"), ("B", "2"), ("C", "3")]);
        let new = snap(&[("B", "2"), ("C", "three"), ("D", "4")]);
        let d = diff(&old, &new);

        assert_eq!(d.added(), vec!["D"]);
        assert_eq!(d.changed(), vec!["C"]);
        assert_eq!(d.removed(), vec!["A"]);
        assert_eq!(d.unchanged(), vec!["B"]);

        let union: BTreeSet<&str> = old.keys().chain(new.keys()).collect();
        let all: Vec<&str> = [d.added(), d.changed(), d.removed(), d.unchanged()].concat();
        assert_eq!(all.len(), union.len());
        assert_eq!(all.into_iter().collect::<BTreeSet<_>>(), union);
    }

    #[test]
    fn identical_snapshots_are_all_unchanged() {
        let s = snap(&[("A", "Hello"), ("B", "World")]);
        let d = diff(&s, &s);
        assert!(d.added().is_empty() && d.changed().is_empty() && d.removed().is_empty());
        assert_eq!(d.unchanged().len(), 2);
    }

    #[test]
    fn ordering_does_not_matter() {
        let old = snap(&[("A", "1"), ("B", "2")]);
        let new = snap(&[("C", "3"), ("B", "two")]);
        let old_rev = snap(&[("B", "2"), ("A", "1")]);
        let new_rev = snap(&[("B", "two"), ("C", "3")]);
        assert_eq!(diff(&old, &new), diff(&old_rev, &new_rev));
    }

    #[test]
    fn hello_there_is_a_change() {
        let d = diff(
            &snap(&[("A", "Hello"), ("B", "World")]),
            &snap(&[("A", "Hello there"), ("B", "World")]),
        );
        assert_eq!(d.changed(), vec!["A"]);
        assert_eq!(d.unchanged(), vec!["B"]);
        assert_eq!(
            d.counts(),
            KeyCounts {
                added: 0,
                changed: 1,
                removed: 0,
                unchanged: 1
            }
        );
        match d.get("A") {
            Some(Classification::Changed { old_hash, new }) => {
                assert_eq!(*old_hash, ContentHash::of("Hello"));
                assert_eq!(new.text, "Hello there");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
