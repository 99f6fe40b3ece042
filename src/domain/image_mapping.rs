use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How an image `src` is resolved when several local names are substrings of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// First key in spreadsheet order that occurs in the `src`.
    #[default]
    First,
    /// Longest key that occurs in the `src`; equal lengths fall back to spreadsheet order.
    Longest,
}

/// Local image name -> hosted URL, in the order the names were first seen.
#[derive(Debug, Clone, Default)]
pub struct ImageMapping {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ImageMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-inserting a name overwrites its URL but keeps its original position.
    pub fn insert(&mut self, local_name: impl Into<String>, url: impl Into<String>) {
        let local_name = local_name.into();
        let url = url.into();
        match self.index.get(&local_name) {
            Some(&pos) => self.entries[pos].1 = url,
            None => {
                self.index.insert(local_name.clone(), self.entries.len());
                self.entries.push((local_name, url));
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, local_name: &str) -> Option<&str> {
        self.index
            .get(local_name)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Finds the hosted URL for an image source. Empty names never match.
    pub fn resolve(&self, src: &str, policy: MatchPolicy) -> Option<&str> {
        let mut candidates = self
            .iter()
            .filter(|(name, _)| !name.is_empty() && src.contains(name));

        match policy {
            MatchPolicy::First => candidates.next().map(|(_, url)| url),
            MatchPolicy::Longest => {
                let mut best: Option<(&str, &str)> = None;
                for (name, url) in candidates {
                    if best.map_or(true, |(b, _)| name.len() > b.len()) {
                        best = Some((name, url));
                    }
                }
                best.map(|(_, url)| url)
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ImageMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = ImageMapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}
