//! LV tags (`key=value` strings attached with `lvcreate --addtag`).

use serde::{Deserialize, Serialize};

/// Ordered set of opaque tags.
///
/// The manager never interprets tags beyond exact `key=` prefix lookup. The
/// comma-delimited form only exists at the `lvs` boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `lv_tags` field of an `lvs` report.
    pub fn from_report(tags: &str) -> Self {
        let mut set = Self::new();
        for tag in tags.split(',').filter(|t| !t.is_empty()) {
            set.insert(tag);
        }
        set
    }

    /// Add a raw tag. Duplicates are ignored.
    pub fn insert(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    pub fn insert_pair(&mut self, key: &str, value: &str) {
        self.insert(format!("{}={}", key, value));
    }

    /// Value of the first tag starting with `key=`.
    pub fn find(&self, key: &str) -> Option<&str> {
        let prefix = format!("{}=", key);
        self.0.iter().find_map(|tag| tag.strip_prefix(prefix.as_str()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `--addtag <tag>` pairs for `lvcreate`.
    pub fn to_args(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|tag| ["--addtag".to_string(), tag.clone()])
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}
