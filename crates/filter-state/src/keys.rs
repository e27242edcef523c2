//! Merge keys and the pinned/temporary key sets.
//!
//! A merge key identifies one logical filter across views:
//! `sorted(view names).join("//") + "::" + field name`.

use chrono::{DateTime, Duration, Utc};

/// Separator between view names in a merge key.
pub const VIEW_SEPARATOR: &str = "//";

/// Separator between the view list and the field name.
pub const NAME_SEPARATOR: &str = "::";

/// How long a temporary key counts as just added.
pub const JUST_ADDED_MILLIS: i64 = 200;

/// Builds the merge key for `field` over `views`. View order does not
/// matter.
///
/// # Example
///
/// ```
/// use filter_state_rs::merge_key;
///
/// assert_eq!(merge_key(["shipments", "orders"], "region"), "orders//shipments::region");
/// ```
pub fn merge_key<I, S>(views: I, field: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut names: Vec<String> = views.into_iter().map(|v| v.as_ref().to_string()).collect();
    names.sort();
    names.dedup();
    format!("{}{}{}", names.join(VIEW_SEPARATOR), NAME_SEPARATOR, field)
}

/// Returns the field name part of a merge key.
pub fn key_field(key: &str) -> &str {
    key.split_once(NAME_SEPARATOR)
        .map_or(key, |(_, field)| field)
}

/// Returns the view names part of a merge key.
pub fn key_views(key: &str) -> Vec<&str> {
    match key.split_once(NAME_SEPARATOR) {
        Some((views, _)) if !views.is_empty() => views.split(VIEW_SEPARATOR).collect(),
        _ => Vec::new(),
    }
}

/// Keys pinned by the user, in pin order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedKeys {
    keys: Vec<String>,
    version: u64,
}

impl PinnedKeys {
    /// Creates a set from keys, keeping the first occurrence of duplicates.
    pub fn from_keys(keys: impl IntoIterator<Item = String>) -> Self {
        let mut pinned = Self::default();
        for key in keys {
            pinned.insert(key);
        }
        pinned
    }

    /// Pins `key`. Returns false if it was already pinned.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        self.version += 1;
        true
    }

    /// Unpins `key`. Returns false if it was not pinned.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        let removed = self.keys.len() != before;
        if removed {
            self.version += 1;
        }
        removed
    }

    /// Returns true if `key` is pinned.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Pin order of `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Iterates keys in pin order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Change counter, bumped on every insert or removal.
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Keys shown ephemerally, in insertion order, with the time each was
/// (re)added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporaryKeys {
    entries: Vec<(String, DateTime<Utc>)>,
    version: u64,
}

impl TemporaryKeys {
    /// Restores keys from persisted state. Restored keys are never just added.
    pub fn restore(keys: impl IntoIterator<Item = String>) -> Self {
        let mut temporary = Self::default();
        for key in keys {
            temporary.add_settled(key);
        }
        temporary
    }

    /// Adds `key` without the just-added flag.
    pub fn add_settled(&mut self, key: impl Into<String>) {
        self.add(key, DateTime::<Utc>::MIN_UTC);
    }

    /// Adds `key`, or restarts its timer if present. Position is kept.
    pub fn add(&mut self, key: impl Into<String>, now: DateTime<Utc>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, added_at)) => *added_at = now,
            None => self.entries.push((key, now)),
        }
        self.version += 1;
    }

    /// Removes `key`. Returns false if it was not present.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        let removed = self.entries.len() != before;
        if removed {
            self.version += 1;
        }
        removed
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.version += 1;
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insertion order of `key`.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// True while less than [`JUST_ADDED_MILLIS`] have passed since `key`
    /// was last added.
    pub fn just_added(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .is_some_and(|(_, added_at)| {
                let elapsed = now.signed_duration_since(*added_at);
                elapsed >= Duration::zero() && elapsed < Duration::milliseconds(JUST_ADDED_MILLIS)
            })
    }

    /// Iterates keys in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Change counter, bumped on every add or removal.
    pub fn version(&self) -> u64 {
        self.version
    }
}
