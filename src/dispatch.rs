//! # Dispatcher
//! Single consumer of the merged post stream.
//!
//! Per post: `Detecting -> (NoMatch | Matched) -> Recorded`.
//! Detectors are tried in order and the first non-empty result wins. Matches
//! are split into same-feed (duplicates) and other-feed (cross-posts), the
//! listeners are told, and the post is appended to history.
//!
//! The dispatcher owns `PostHistory` and every detector (with their word
//! count caches). Nothing else holds them, which is what keeps both free of
//! locks; a parallel dispatcher would need to wrap them in a mutex.

use std::sync::Arc;

use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::detector::Detector;
use crate::history::PostHistory;
use crate::notify::{Listener, MatchKind};
use crate::post::Post;

/// Matches of one detector, split by feed origin relative to the new post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub same_feed: Vec<Post>,
    pub other_feed: Vec<Post>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.same_feed.is_empty() && self.other_feed.is_empty()
    }
}

/// Partition `matches` by feed id equality with `post`, keeping order.
pub fn classify(post: &Post, matches: Vec<Post>) -> Classification {
    let (same_feed, other_feed) = matches.into_iter().partition(|m| m.same_feed(post));
    Classification {
        same_feed,
        other_feed,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoMatch,
    Matched {
        detector: &'static str,
        classification: Classification,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub processed: usize,
    /// Posts that triggered a duplicate notification.
    pub duplicates: usize,
    /// Posts that triggered a cross-post notification.
    pub cross_posts: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        if let Outcome::Matched { classification, .. } = outcome {
            if !classification.same_feed.is_empty() {
                self.duplicates += 1;
            }
            if !classification.other_feed.is_empty() {
                self.cross_posts += 1;
            }
        }
    }
}

pub struct Dispatcher {
    detectors: Vec<Detector>,
    listeners: Vec<Arc<dyn Listener>>,
    history: PostHistory,
}

impl Dispatcher {
    pub fn new(
        detectors: Vec<Detector>,
        listeners: Vec<Arc<dyn Listener>>,
        history: PostHistory,
    ) -> Self {
        Self {
            detectors,
            listeners,
            history,
        }
    }

    pub fn history(&self) -> &PostHistory {
        &self.history
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn listeners(&self) -> &[Arc<dyn Listener>] {
        &self.listeners
    }

    /// Run one post through detection, notification and recording.
    pub async fn process(&mut self, post: Post) -> Outcome {
        tracing::debug!(
            target: "dispatch",
            feed = post.feed_id(),
            post_id = %post.id,
            author = %post.author,
            subject = %post.subject,
            "new post"
        );

        let outcome = self.detect(&post);

        if let Outcome::Matched {
            detector,
            classification,
        } = &outcome
        {
            tracing::info!(
                target: "dispatch",
                detector,
                feed = post.feed_id(),
                post_id = %post.id,
                duplicates = classification.same_feed.len(),
                cross_posts = classification.other_feed.len(),
                "matches found"
            );
            if !classification.same_feed.is_empty() {
                self.notify(MatchKind::Duplicate, &post, &classification.same_feed)
                    .await;
            }
            if !classification.other_feed.is_empty() {
                self.notify(MatchKind::CrossPost, &post, &classification.other_feed)
                    .await;
            }
        }

        self.history.add(post);
        counter!("xpd_posts_processed_total").increment(1);
        gauge!("xpd_history_len").set(self.history.len() as f64);
        outcome
    }

    fn detect(&mut self, post: &Post) -> Outcome {
        for detector in &mut self.detectors {
            let found = detector.find_duplicates(post, self.history.recent());
            if !found.is_empty() {
                return Outcome::Matched {
                    detector: detector.name(),
                    classification: classify(post, found),
                };
            }
        }
        Outcome::NoMatch
    }

    async fn notify(&self, kind: MatchKind, post: &Post, matches: &[Post]) {
        match kind {
            MatchKind::Duplicate => counter!("xpd_duplicate_notifications_total").increment(1),
            MatchKind::CrossPost => counter!("xpd_crosspost_notifications_total").increment(1),
        }
        for listener in &self.listeners {
            let res = match kind {
                MatchKind::Duplicate => listener.on_duplicate(post, matches).await,
                MatchKind::CrossPost => listener.on_cross_post(post, matches).await,
            };
            if let Err(e) = res {
                tracing::warn!(
                    target: "dispatch",
                    error = ?e,
                    listener = listener.name(),
                    kind = %kind,
                    post_id = %post.id,
                    "listener failed"
                );
                counter!("xpd_listener_errors_total").increment(1);
            }
        }
    }

    /// Drain `rx` until `max_posts` were processed, `shutdown` fires, or
    /// every sender is gone.
    pub async fn run(
        &mut self,
        rx: &mut mpsc::Receiver<Post>,
        max_posts: Option<usize>,
        shutdown: &CancellationToken,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        loop {
            if max_posts.is_some_and(|max| report.processed >= max) {
                break;
            }
            let post = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = rx.recv() => match next {
                    Some(post) => post,
                    None => break,
                },
            };
            let outcome = self.process(post).await;
            report.record(&outcome);
        }
        tracing::info!(
            target: "dispatch",
            processed = report.processed,
            duplicates = report.duplicates,
            cross_posts = report.cross_posts,
            "dispatcher stopped"
        );
        report
    }
}
