// src/ingest/providers/mbox.rs
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::ingest::types::FeedSource;
use crate::post::{Feed, Post};

/// One message of an mbox file: raw headers and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MboxMessage {
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MboxMessage {
    /// First header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Split mbox text into messages. A message starts at a `From ` line that
/// follows a blank line (or the start of the file). Messages without a
/// header/body separator are skipped.
pub fn parse_mbox(text: &str) -> Vec<MboxMessage> {
    let mut raw_messages: Vec<Vec<&str>> = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    let mut last_blank = true;

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if last_blank && line.starts_with("From ") {
            if let Some(done) = current.take() {
                raw_messages.push(done);
            }
            current = Some(Vec::new());
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
        last_blank = line.is_empty();
    }
    if let Some(done) = current {
        raw_messages.push(done);
    }

    raw_messages
        .into_iter()
        .filter_map(|lines| match parse_message(&lines) {
            Some(msg) => Some(msg),
            None => {
                tracing::debug!(target: "ingest", "skipping malformed mbox message");
                None
            }
        })
        .collect()
}

fn parse_message(lines: &[&str]) -> Option<MboxMessage> {
    let split = lines.iter().position(|l| l.is_empty())?;
    let mut headers: Vec<(String, String)> = Vec::new();

    for line in &lines[..split] {
        if line.starts_with([' ', '\t']) {
            // folded continuation of the previous header
            let (_, value) = headers.last_mut()?;
            value.push(' ');
            value.push_str(line.trim());
            continue;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let body = lines[split + 1..]
        .iter()
        .map(|l| unescape_from_line(l))
        .collect::<Vec<_>>()
        .join("\n");

    Some(MboxMessage {
        headers,
        body: body.trim().to_string(),
    })
}

/// mboxrd quoting: `>From ` / `>>From ` lose one `>`.
fn unescape_from_line(line: &str) -> &str {
    let stripped = line.trim_start_matches('>');
    if stripped.len() < line.len() && stripped.starts_with("From ") {
        &line[1..]
    } else {
        line
    }
}

/// Mail archive in mbox format. Each fetch re-reads the file and returns the
/// messages that were not in the previous read.
pub struct MboxFeedSource {
    feed: Arc<Feed>,
    path: PathBuf,
    /// Keys of the messages in the last non-empty read.
    seen: HashSet<String>,
}

impl MboxFeedSource {
    /// Reads the file at `feed.url` (an optional `file://` prefix is dropped).
    pub fn from_feed(feed: Arc<Feed>) -> Self {
        let path = PathBuf::from(feed.url.strip_prefix("file://").unwrap_or(&feed.url));
        Self::from_path(feed, path)
    }

    pub fn from_path(feed: Arc<Feed>, path: impl Into<PathBuf>) -> Self {
        Self {
            feed,
            path: path.into(),
            seen: HashSet::new(),
        }
    }

    fn to_post(&self, msg: &MboxMessage) -> Post {
        let id = msg
            .header("Message-ID")
            .map(|v| v.trim_matches(|c| c == '<' || c == '>').to_string())
            .unwrap_or_default();
        Post::new(self.feed.clone(), id, msg.body.clone())
            .with_author(msg.header("From").unwrap_or_default())
            .with_subject(msg.header("Subject").unwrap_or_default())
            .with_published_at(
                msg.header("Date")
                    .and_then(|d| chrono::DateTime::parse_from_rfc2822(d).ok())
                    .map(|d| d.with_timezone(&chrono::Utc)),
            )
    }

    async fn try_fetch(&mut self) -> Result<Vec<Post>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading mbox {}", self.path.display()))?;

        let messages = parse_mbox(&text);
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let mut current = HashSet::with_capacity(messages.len());
        let mut fresh = Vec::new();
        for msg in &messages {
            let post = self.to_post(msg);
            let key = post.key().to_string();
            if !current.insert(key.clone()) {
                continue;
            }
            if !self.seen.contains(&key) {
                fresh.push(post);
            }
        }
        // messages removed from the archive are forgotten
        self.seen = current;
        Ok(fresh)
    }
}

#[async_trait]
impl FeedSource for MboxFeedSource {
    fn feed(&self) -> Arc<Feed> {
        self.feed.clone()
    }

    async fn fetch_new_posts(&mut self) -> Vec<Post> {
        match self.try_fetch().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, feed = %self.feed.id, "mbox read failed");
                counter!("xpd_feed_fetch_errors_total").increment(1);
                Vec::new()
            }
        }
    }
}
