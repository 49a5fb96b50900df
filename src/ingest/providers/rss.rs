// src/ingest/providers/rss.rs
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

use super::clean_text;
use crate::ingest::types::FeedSource;
use crate::post::{content_digest, Feed, Post};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(default)]
    link: Vec<TextNode>,
    guid: Option<TextNode>,
    author: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Element whose attributes (e.g. `isPermaLink`) we ignore.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn first_link(item: &Item) -> Option<&str> {
    item.link
        .iter()
        .map(|l| l.value.trim())
        .find(|l| !l.is_empty())
}

/// `guid`, else the first link, else empty.
fn extract_post_id(item: &Item) -> String {
    item.guid
        .as_ref()
        .map(|g| g.value.trim())
        .filter(|g| !g.is_empty())
        .or_else(|| first_link(item))
        .unwrap_or_default()
        .to_string()
}

/// Upper bound for one HTTP fetch, connect included.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

enum Mode {
    Fixture(String),
    Http(reqwest::Client),
}

/// RSS 2.0 feed. Each fetch returns only the items that were not present in
/// the previous document, in document order.
pub struct RssFeedSource {
    feed: Arc<Feed>,
    mode: Mode,
    timeout: Duration,
    /// Keys of the items in the last non-empty document.
    seen: HashSet<String>,
}

impl RssFeedSource {
    /// Fetches `feed.url` over HTTP.
    pub fn from_feed(feed: Arc<Feed>) -> Self {
        Self {
            feed,
            mode: Mode::Http(reqwest::Client::new()),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            seen: HashSet::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serves an in-memory document instead of fetching.
    pub fn from_fixture(feed: Arc<Feed>, xml: &str) -> Self {
        Self {
            feed,
            mode: Mode::Fixture(xml.to_string()),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            seen: HashSet::new(),
        }
    }

    /// Swap the in-memory document (no-op for HTTP sources).
    pub fn set_fixture(&mut self, xml: &str) {
        if let Mode::Fixture(s) = &mut self.mode {
            *s = xml.to_string();
        }
    }

    /// Parse a document into posts of this feed, without new-ness filtering.
    pub fn parse_posts(&self, xml: &str) -> Result<Vec<Post>> {
        let rss: Rss = from_str(xml).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let id = extract_post_id(&it);
            let url = first_link(&it)
                .map(str::to_string)
                .unwrap_or_else(|| id.clone());
            let post = Post::new(
                self.feed.clone(),
                id,
                clean_text(it.description.as_deref().unwrap_or_default()),
            )
            .with_url(url)
            .with_author(clean_text(it.author.as_deref().unwrap_or_default()))
            .with_subject(clean_text(it.title.as_deref().unwrap_or_default()))
            .with_published_at(it.pub_date.as_deref().and_then(parse_rfc2822));
            out.push(post);
        }
        Ok(out)
    }

    async fn fetch_document(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http(client) => client
                .get(&self.feed.url)
                .timeout(self.timeout)
                .send()
                .await
                .context("rss http get()")?
                .error_for_status()
                .context("rss http status")?
                .text()
                .await
                .context("rss http .text()"),
        }
    }

    async fn try_fetch(&mut self) -> Result<Vec<Post>> {
        let xml = self.fetch_document().await?;
        let posts = self.parse_posts(&xml)?;
        if posts.is_empty() {
            // a blank but well-formed document must not reset what was seen
            return Ok(Vec::new());
        }

        let mut current = HashSet::with_capacity(posts.len());
        let mut fresh = Vec::new();
        for post in posts {
            let key = item_key(&post);
            if !current.insert(key.clone()) {
                continue;
            }
            if !self.seen.contains(&key) {
                fresh.push(post);
            }
        }
        // Only the current document is remembered; items that scroll off are forgotten.
        self.seen = current;
        Ok(fresh)
    }
}

fn item_key(post: &Post) -> String {
    if post.id.is_empty() {
        format!("sha256:{}", content_digest(&format!("{}\n{}", post.subject, post.body)))
    } else {
        post.id.clone()
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn feed(&self) -> Arc<Feed> {
        self.feed.clone()
    }

    async fn fetch_new_posts(&mut self) -> Vec<Post> {
        match self.try_fetch().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, feed = %self.feed.id, "feed fetch failed");
                counter!("xpd_feed_fetch_errors_total").increment(1);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XML: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
  <item>
    <title>First</title>
    <guid isPermaLink="false">id-1</guid>
    <link>https://example.test/1</link>
    <description>&lt;p&gt;Hello world&lt;/p&gt;</description>
    <pubDate>Tue, 02 Sep 2025 14:30:00 +0000</pubDate>
  </item>
  <item>
    <title>Second</title>
    <link>https://example.test/2</link>
    <description>Another body</description>
  </item>
  <item>
    <title>Third</title>
    <description>No id at all</description>
  </item>
</channel></rss>"#;

    fn source() -> RssFeedSource {
        RssFeedSource::from_fixture(Arc::new(Feed::new("f", "https://example.test/rss")), XML)
    }

    #[test]
    fn post_id_prefers_guid_then_link_then_empty() {
        let posts = source().parse_posts(XML).unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["id-1", "https://example.test/2", ""]);
    }

    #[test]
    fn fields_are_cleaned_and_dated() {
        let posts = source().parse_posts(XML).unwrap();
        assert_eq!(posts[0].body, "Hello world");
        assert_eq!(posts[0].subject, "First");
        assert_eq!(posts[0].url, "https://example.test/1");
        assert!(posts[0].published_at.is_some());
        assert!(posts[1].published_at.is_none());
        assert_eq!(posts[2].url, "");
        assert!(posts.iter().all(|p| p.feed_id() == "f"));
    }

    #[tokio::test]
    async fn only_new_items_are_returned() {
        let mut src = source();
        assert_eq!(src.fetch_new_posts().await.len(), 3);
        assert!(src.fetch_new_posts().await.is_empty());
    }

    #[tokio::test]
    async fn empty_document_keeps_seen_items() {
        let mut src = source();
        assert_eq!(src.fetch_new_posts().await.len(), 3);
        src.set_fixture(r#"<rss version="2.0"><channel><title>t</title></channel></rss>"#);
        assert!(src.fetch_new_posts().await.is_empty());
        src.set_fixture(XML);
        assert!(src.fetch_new_posts().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_document_yields_empty_batch() {
        let mut src = RssFeedSource::from_fixture(Arc::new(Feed::new("f", "u")), "<rss><chan");
        assert!(src.fetch_new_posts().await.is_empty());
    }
}
