// src/ingest/mod.rs
//! Fan-in of every feed into one ordered stream for the dispatcher.
//!
//! One poller task per feed fetches new posts, pushes them one at a time into
//! a bounded queue and sleeps for the polling interval. A full queue makes
//! the poller wait (no drops). Posts of one feed keep their fetch order;
//! posts of different feeds interleave in arrival order.

pub mod providers;
pub mod types;

use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{DispatchReport, Dispatcher};
use crate::post::Post;
use crate::ingest::types::FeedSource;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Bounded FIFO shared by all pollers (many senders, one receiver).
/// A capacity of 0 is treated as 1.
pub fn post_queue(capacity: usize) -> (mpsc::Sender<Post>, mpsc::Receiver<Post>) {
    mpsc::channel(capacity.max(1))
}

#[derive(Clone, Copy, Debug)]
pub struct PollerCfg {
    pub interval: Duration,
    /// Stop after this many fetch rounds; `None` polls until cancelled.
    pub max_rounds: Option<usize>,
}

impl Default for PollerCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_rounds: None,
        }
    }
}

/// Poll one source until cancelled, out of rounds, or the queue is closed.
/// Returns the number of posts pushed.
pub async fn poll_feed(
    mut source: Box<dyn FeedSource>,
    tx: mpsc::Sender<Post>,
    cfg: PollerCfg,
    shutdown: CancellationToken,
) -> usize {
    let feed = source.feed();
    tracing::info!(target: "ingest", feed = %feed.id, url = %feed.url, "listening on feed");

    let mut pushed = 0usize;
    let mut rounds = 0usize;
    'poll: loop {
        let posts = tokio::select! {
            _ = shutdown.cancelled() => break 'poll,
            posts = source.fetch_new_posts() => posts,
        };
        if !posts.is_empty() {
            tracing::debug!(target: "ingest", feed = %feed.id, count = posts.len(), "new posts");
            counter!("xpd_feed_posts_total").increment(posts.len() as u64);
        }

        for post in posts {
            tokio::select! {
                _ = shutdown.cancelled() => break 'poll,
                sent = tx.send(post) => {
                    if sent.is_err() {
                        tracing::debug!(target: "ingest", feed = %feed.id, "queue closed");
                        break 'poll;
                    }
                    pushed += 1;
                }
            }
        }

        rounds += 1;
        if cfg.max_rounds.is_some_and(|max| rounds >= max) {
            break;
        }
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(cfg.interval) => {}
        }
    }

    tracing::info!(target: "ingest", feed = %feed.id, pushed, rounds, "poller stopped");
    pushed
}

pub fn spawn_poller(
    source: Box<dyn FeedSource>,
    tx: mpsc::Sender<Post>,
    cfg: PollerCfg,
    shutdown: CancellationToken,
) -> JoinHandle<usize> {
    tokio::spawn(poll_feed(source, tx, cfg, shutdown))
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many posts; `None` runs until cancelled.
    pub max_posts: Option<usize>,
    /// Stop each poller after this many rounds; `None` polls forever.
    pub max_rounds: Option<usize>,
    pub shutdown: CancellationToken,
}

/// Feeds, dispatcher and queue settings, ready to run.
pub struct Pipeline {
    pub sources: Vec<Box<dyn FeedSource>>,
    pub dispatcher: Dispatcher,
    pub poll_interval: Duration,
    pub queue_capacity: usize,
}

impl Pipeline {
    pub fn new(sources: Vec<Box<dyn FeedSource>>, dispatcher: Dispatcher) -> Self {
        Self {
            sources,
            dispatcher,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Spawn one poller per source and dispatch until a stop condition
    /// holds. Pollers are cancelled and joined before returning; the
    /// dispatcher (with its history) is handed back for inspection.
    pub async fn run(self, opts: RunOptions) -> (DispatchReport, Dispatcher) {
        let Pipeline {
            sources,
            mut dispatcher,
            poll_interval,
            queue_capacity,
        } = self;

        let (tx, mut rx) = post_queue(queue_capacity);
        let pollers_stop = opts.shutdown.child_token();
        let cfg = PollerCfg {
            interval: poll_interval,
            max_rounds: opts.max_rounds,
        };

        let handles: Vec<_> = sources
            .into_iter()
            .map(|source| spawn_poller(source, tx.clone(), cfg, pollers_stop.clone()))
            .collect();
        drop(tx);

        let report = dispatcher
            .run(&mut rx, opts.max_posts, &opts.shutdown)
            .await;

        pollers_stop.cancel();
        drop(rx);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(target: "ingest", error = ?e, "poller task failed");
            }
        }

        (report, dispatcher)
    }
}
