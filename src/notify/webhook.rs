use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use super::{render_report, Listener, MatchKind};
use crate::post::Post;

/// Posts reports as Slack-compatible `{"text": ...}` JSON to a webhook URL.
pub struct WebhookListener {
    url: String,
    client: Client,
    timeout: Duration,
}

impl WebhookListener {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn post_report(&self, kind: MatchKind, post: &Post, matches: &[Post]) -> Result<()> {
        let body = serde_json::json!({ "text": render_report(kind, post, matches) });

        self.client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("webhook post")?
            .error_for_status()
            .context("webhook non-2xx")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Listener for WebhookListener {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn on_duplicate(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.post_report(MatchKind::Duplicate, post, matches).await
    }

    async fn on_cross_post(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.post_report(MatchKind::CrossPost, post, matches).await
    }
}
