// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use crosspost_detector::{Feed, FeedSource, Listener, MatchKind, Post};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn feed(id: &str) -> Arc<Feed> {
    Arc::new(Feed::new(id, format!("https://{id}.example.test/rss")))
}

pub fn post(feed: &Arc<Feed>, id: &str, body: &str) -> Post {
    Post::new(feed.clone(), id, body).with_subject(format!("subject {id}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: MatchKind,
    pub post: String,
    pub matches: Vec<String>,
}

/// Records every notification it receives.
#[derive(Default)]
pub struct RecordingListener {
    calls: Mutex<Vec<Call>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, kind: MatchKind) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    fn record(&self, kind: MatchKind, post: &Post, matches: &[Post]) {
        self.calls.lock().push(Call {
            kind,
            post: post.id.clone(),
            matches: matches.iter().map(|p| p.id.clone()).collect(),
        });
    }
}

#[async_trait]
impl Listener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    async fn on_duplicate(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.record(MatchKind::Duplicate, post, matches);
        Ok(())
    }

    async fn on_cross_post(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.record(MatchKind::CrossPost, post, matches);
        Ok(())
    }
}

/// Fails every delivery.
pub struct FailingListener;

#[async_trait]
impl Listener for FailingListener {
    fn name(&self) -> &str {
        "failing"
    }

    async fn on_duplicate(&self, _post: &Post, _matches: &[Post]) -> Result<()> {
        Err(anyhow!("delivery failed"))
    }

    async fn on_cross_post(&self, _post: &Post, _matches: &[Post]) -> Result<()> {
        Err(anyhow!("delivery failed"))
    }
}

/// Hands out pre-scripted batches, then empty ones.
pub struct ScriptedSource {
    feed: Arc<Feed>,
    batches: VecDeque<Vec<Post>>,
}

impl ScriptedSource {
    pub fn new(feed: Arc<Feed>, batches: Vec<Vec<Post>>) -> Box<Self> {
        Box::new(Self {
            feed,
            batches: batches.into(),
        })
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    fn feed(&self) -> Arc<Feed> {
        self.feed.clone()
    }

    async fn fetch_new_posts(&mut self) -> Vec<Post> {
        self.batches.pop_front().unwrap_or_default()
    }
}

/// Produces a fresh post with the same body on every fetch.
pub struct EndlessSource {
    feed: Arc<Feed>,
    next: usize,
}

impl EndlessSource {
    pub fn new(feed: Arc<Feed>) -> Box<Self> {
        Box::new(Self { feed, next: 0 })
    }
}

#[async_trait]
impl FeedSource for EndlessSource {
    fn feed(&self) -> Arc<Feed> {
        self.feed.clone()
    }

    async fn fetch_new_posts(&mut self) -> Vec<Post> {
        self.next += 1;
        vec![post(&self.feed, &self.next.to_string(), "same old body")]
    }
}

/// Local HTTP/1.1 endpoint that answers every request with one canned
/// response, or never answers at all.
pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn respond(status: u16, body: &str) -> Self {
        let reason = if status < 400 { "OK" } else { "Error" };
        let reply = format!(
            "HTTP/1.1 {status} {reason}\r\ncontent-type: text/plain; charset=utf-8\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        Self::start(Some(reply)).await
    }

    /// Accepts connections and holds them open without replying.
    pub async fn silent() -> Self {
        Self::start(None).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    async fn start(reply: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut sock, _)) = listener.accept().await {
                let Some(reply) = reply.clone() else {
                    held.push(sock);
                    continue;
                };
                let log = log.clone();
                tokio::spawn(async move {
                    if let Some(req) = read_request(&mut sock).await {
                        log.lock().push(req);
                    }
                    let _ = sock.write_all(reply.as_bytes()).await;
                    let _ = sock.shutdown().await;
                });
            }
        });

        Self { addr, requests }
    }
}

async fn read_request(sock: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = sock.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let body_len = text[..end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    Some(String::from_utf8_lossy(&buf).into_owned())
}
