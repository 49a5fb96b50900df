//! # Notifications
//! Listeners receive the outcome of classification: duplicates (same feed)
//! and cross-posts (other feeds). Delivery may fail; the dispatcher logs the
//! error and moves on.

pub mod console;
pub mod mail;
pub mod webhook;

use std::fmt;
use std::fmt::Write as _;

use anyhow::Result;

use crate::post::Post;

pub use console::ConsoleListener;
pub use mail::{MailListener, MessageSink, MockSink, NullSink, SmtpSink};
pub use webhook::WebhookListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Duplicate,
    CrossPost,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Duplicate => f.write_str("duplicate"),
            MatchKind::CrossPost => f.write_str("cross-post"),
        }
    }
}

#[async_trait::async_trait]
pub trait Listener: Send + Sync {
    fn name(&self) -> &str;

    /// `matches` are earlier posts from the same feed as `post`.
    async fn on_duplicate(&self, post: &Post, matches: &[Post]) -> Result<()>;

    /// `matches` are earlier posts from other feeds than `post`.
    async fn on_cross_post(&self, post: &Post, matches: &[Post]) -> Result<()>;
}

/// Plain-text report shared by the console, mail and webhook listeners.
pub fn render_report(kind: MatchKind, post: &Post, matches: &[Post]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "possible {kind}: {} ({}) in feed {}",
        post.subject,
        display_id(post),
        post.feed_id()
    );
    if !post.url.is_empty() {
        let _ = writeln!(out, "  url: {}", post.url);
    }
    for old in matches {
        let _ = writeln!(
            out,
            "  of: {} ({}) in feed {}",
            old.subject,
            display_id(old),
            old.feed_id()
        );
    }
    out
}

fn display_id(post: &Post) -> &str {
    if post.id.is_empty() {
        "no id"
    } else {
        &post.id
    }
}
