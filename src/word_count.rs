//! # Word Counts
//! Token-frequency tables per post, and the cache the similarity detector
//! keeps over its current working set.
//!
//! The cache is owned by one detector and only touched from the dispatcher,
//! so there is no locking here.

use std::collections::{HashMap, HashSet};

use crate::post::{Post, PostKey};
use crate::tokenize::tokenize;

/// Token -> occurrence count, plus the total token count.
/// Invariant: `total == counts.values().sum()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCountEntry {
    counts: HashMap<String, usize>,
    total: usize,
}

impl WordCountEntry {
    pub fn from_text(text: &str) -> Self {
        let mut entry = Self::default();
        for word in tokenize(text) {
            *entry.counts.entry(word).or_insert(0) += 1;
            entry.total += 1;
        }
        entry
    }

    /// Build from explicit counts; total is derived.
    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let counts: HashMap<String, usize> =
            counts.into_iter().map(|(w, c)| (w.into(), c)).collect();
        let total = counts.values().sum();
        Self { counts, total }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn count(&self, word: &str) -> usize {
        self.counts.get(word).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<String, usize> {
        &self.counts
    }

    /// Sum over the union of both vocabularies of `|self[w] - other[w]|`.
    /// A word on only one side contributes its full count. Symmetric.
    pub fn distance(&self, other: &WordCountEntry) -> usize {
        let mut diff = 0usize;
        for (word, &count) in &self.counts {
            diff += count.abs_diff(other.count(word));
        }
        for (word, &count) in &other.counts {
            if !self.counts.contains_key(word) {
                diff += count;
            }
        }
        diff
    }
}

/// Post key -> cached `WordCountEntry`, pruned to the live working set.
#[derive(Debug, Default)]
pub struct WordCountIndex {
    entries: HashMap<PostKey, WordCountEntry>,
}

impl WordCountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for `post`, computing and storing it on first use.
    pub fn get(&mut self, post: &Post) -> &WordCountEntry {
        self.entries
            .entry(post.key())
            .or_insert_with(|| WordCountEntry::from_text(&post.body))
    }

    /// Drop every entry whose key is not in `working_set`.
    pub fn prune(&mut self, working_set: &HashSet<PostKey>) {
        self.entries.retain(|k, _| working_set.contains(k));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, post: &Post) -> bool {
        self.entries.contains_key(&post.key())
    }
}
