//! # Detectors
//! Strategies that pick, from a pool of earlier posts, the ones that look
//! like the same content as an incoming post.
//!
//! - `ExactBody`: byte-for-byte equal bodies.
//! - `FrequencySimilarity`: word-frequency tables within a diff ratio; order
//!   of words does not matter, so rearranged or lightly edited posts match.
//!
//! Output keeps the order of the input pool.

use std::collections::HashSet;

use crate::post::{Post, PostKey};
use crate::word_count::WordCountIndex;

pub const DEFAULT_MAX_DIFF_RATIO: f64 = 0.1;

#[derive(Debug)]
pub enum Detector {
    ExactBody,
    FrequencySimilarity(SimilarityDetector),
}

impl Detector {
    pub fn exact_body() -> Self {
        Detector::ExactBody
    }

    pub fn frequency_similarity(max_diff_ratio: f64) -> Self {
        Detector::FrequencySimilarity(SimilarityDetector::new(max_diff_ratio))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Detector::ExactBody => "exact-body",
            Detector::FrequencySimilarity(_) => "frequency-similarity",
        }
    }

    /// Posts of `pool` judged to be the same content as `post`, in pool order.
    pub fn find_duplicates<'a, I>(&mut self, post: &Post, pool: I) -> Vec<Post>
    where
        I: IntoIterator<Item = &'a Post>,
    {
        match self {
            Detector::ExactBody => find_same_body(post, pool),
            Detector::FrequencySimilarity(d) => d.find_duplicates(post, pool),
        }
    }
}

fn find_same_body<'a, I>(post: &Post, pool: I) -> Vec<Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    pool.into_iter()
        .filter(|old| old.body == post.body)
        .cloned()
        .collect()
}

/// Word-frequency detector with its own word count cache.
#[derive(Debug)]
pub struct SimilarityDetector {
    /// Bound on the symmetric word-count distance, relative to the
    /// candidate's total.
    max_diff_ratio: f64,
    /// Bound on the difference of total token counts. Same as
    /// `max_diff_ratio` unless configured separately.
    max_total_diff_ratio: f64,
    index: WordCountIndex,
}

impl SimilarityDetector {
    pub fn new(max_diff_ratio: f64) -> Self {
        Self::with_ratios(max_diff_ratio, max_diff_ratio)
    }

    pub fn with_ratios(max_diff_ratio: f64, max_total_diff_ratio: f64) -> Self {
        Self {
            max_diff_ratio,
            max_total_diff_ratio,
            index: WordCountIndex::new(),
        }
    }

    pub fn max_diff_ratio(&self) -> f64 {
        self.max_diff_ratio
    }

    pub fn max_total_diff_ratio(&self) -> f64 {
        self.max_total_diff_ratio
    }

    pub fn index(&self) -> &WordCountIndex {
        &self.index
    }

    pub fn find_duplicates<'a, I>(&mut self, post: &Post, pool: I) -> Vec<Post>
    where
        I: IntoIterator<Item = &'a Post>,
    {
        let base = self.index.get(post).clone();
        let word_limit = base.total() as f64 * self.max_diff_ratio;

        let mut working_set: HashSet<PostKey> = HashSet::new();
        working_set.insert(post.key());

        let mut duplicates = Vec::new();
        for old in pool {
            working_set.insert(old.key());
            let other = self.index.get(old);
            if similar_totals(base.total(), other.total(), self.max_total_diff_ratio)
                && (base.distance(other) as f64) < word_limit
            {
                duplicates.push(old.clone());
            }
        }

        self.index.prune(&working_set);
        metrics::gauge!("xpd_word_count_cache_len").set(self.index.len() as f64);
        duplicates
    }
}

/// `|base - other| < ratio * base`.
pub fn similar_totals(base: usize, other: usize, ratio: f64) -> bool {
    (base.abs_diff(other) as f64) < base as f64 * ratio
}
