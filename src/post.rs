//! # Posts & Feeds
//! Plain data produced by the ingestion collaborators. Immutable once built.
//!
//! A `Post` always carries its owning `Feed` (shared via `Arc`), so a post
//! without a feed identifier can never reach classification.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Feed {
    pub id: String,
    pub url: String,
}

impl Feed {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Unique within a feed's lifetime; empty when the source supplies none.
    pub id: String,
    pub url: String,
    pub author: String,
    pub subject: String,
    pub body: String,
    pub published_at: Option<DateTime<Utc>>,
    pub feed: Arc<Feed>,
}

impl Post {
    /// Minimal constructor; remaining fields via the `with_*` builders.
    pub fn new(feed: Arc<Feed>, id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: String::new(),
            author: String::new(),
            subject: String::new(),
            body: body.into(),
            published_at: None,
            feed,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_published_at(mut self, ts: Option<DateTime<Utc>>) -> Self {
        self.published_at = ts;
        self
    }

    pub fn feed_id(&self) -> &str {
        &self.feed.id
    }

    /// Same feed as `other` (duplicate), as opposed to a cross-post.
    pub fn same_feed(&self, other: &Post) -> bool {
        self.feed.id == other.feed.id
    }

    pub fn key(&self) -> PostKey {
        PostKey::of(self)
    }
}

/// Identity used by caches keyed per post.
///
/// Non-empty ids are scoped by feed id. Posts without an id fall back to a
/// SHA-256 digest of the body, so two id-less posts only share a key when
/// their bodies (and therefore their word counts) are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PostKey {
    Id { feed: String, id: String },
    Content(String),
}

impl PostKey {
    pub fn of(post: &Post) -> Self {
        if post.id.is_empty() {
            PostKey::Content(content_digest(&post.body))
        } else {
            PostKey::Id {
                feed: post.feed.id.clone(),
                id: post.id.clone(),
            }
        }
    }
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKey::Id { feed, id } => write!(f, "{feed}/{id}"),
            PostKey::Content(digest) => write!(f, "sha256:{digest}"),
        }
    }
}

/// Hex SHA-256 of `text`.
pub fn content_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
