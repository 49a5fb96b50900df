use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{render_report, Listener, MatchKind};
use crate::post::Post;

/// Outbound message transport used by `MailListener`.
#[async_trait::async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Formats each notification as a plain-text message and hands it to a sink.
pub struct MailListener {
    sink: Box<dyn MessageSink>,
}

impl MailListener {
    pub fn new<S: MessageSink + 'static>(sink: S) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    async fn deliver(&self, kind: MatchKind, post: &Post, matches: &[Post]) -> Result<()> {
        let message = render_report(kind, post, matches);
        self.sink
            .send(&message)
            .await
            .with_context(|| format!("mail {kind} notification for post {}", post.key()))
    }
}

#[async_trait::async_trait]
impl Listener for MailListener {
    fn name(&self) -> &str {
        "mail"
    }

    async fn on_duplicate(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.deliver(MatchKind::Duplicate, post, matches).await
    }

    async fn on_cross_post(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.deliver(MatchKind::CrossPost, post, matches).await
    }
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
    pub subject: String,
}

pub struct SmtpSink {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    subject: String,
}

impl SmtpSink {
    /// Builds the transport; no connection is made until the first send.
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let creds = Credentials::new(settings.username.clone(), settings.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .with_context(|| format!("invalid SMTP host {}", settings.host))?
            .credentials(creds)
            .build();

        let from = settings
            .from
            .parse()
            .with_context(|| format!("invalid sender address {}", settings.from))?;
        let to = settings
            .to
            .parse()
            .with_context(|| format!("invalid recipient address {}", settings.to))?;

        Ok(Self {
            mailer,
            from,
            to,
            subject: settings.subject.clone(),
        })
    }
}

#[async_trait::async_trait]
impl MessageSink for SmtpSink {
    async fn send(&self, message: &str) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .header(header::ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }
}

/// Records every message instead of sending it. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages().last().cloned()
    }
}

#[async_trait::async_trait]
impl MessageSink for MockSink {
    async fn send(&self, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
        Ok(())
    }
}

/// Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait::async_trait]
impl MessageSink for NullSink {
    async fn send(&self, _message: &str) -> Result<()> {
        Err(anyhow!("cannot send message"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::Feed;

    fn post(feed: &str, id: &str) -> Post {
        Post::new(Arc::new(Feed::new(feed, "u")), id, "body").with_subject(format!("s-{id}"))
    }

    #[tokio::test]
    async fn mock_sink_records_message() {
        let sink = MockSink::new();
        sink.send("hello world").await.unwrap();
        assert_eq!(sink.last().as_deref(), Some("hello world"));
    }

    #[tokio::test]
    async fn mail_listener_renders_report_into_sink() {
        let sink = MockSink::new();
        let listener = MailListener::new(sink.clone());

        listener
            .on_cross_post(&post("a", "2"), &[post("b", "1")])
            .await
            .unwrap();

        let msg = sink.last().unwrap();
        assert!(msg.starts_with("possible cross-post: s-2 (2) in feed a"));
        assert!(msg.contains("of: s-1 (1) in feed b"));
    }

    #[tokio::test]
    async fn null_sink_failure_surfaces_from_listener() {
        let listener = MailListener::new(NullSink);
        let err = listener
            .on_duplicate(&post("a", "2"), &[post("a", "1")])
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("cannot send message"));
    }

    #[test]
    fn smtp_sink_rejects_bad_address() {
        let settings = SmtpSettings {
            host: "smtp.example.test".into(),
            username: "u".into(),
            password: "p".into(),
            from: "not an address".into(),
            to: "ops@example.test".into(),
            subject: "xpd".into(),
        };
        assert!(SmtpSink::new(&settings).is_err());
    }
}
