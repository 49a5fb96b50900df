// tests/pipeline.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{feed, post, EndlessSource, RecordingListener, ScriptedSource};
use crosspost_detector::ingest::{poll_feed, post_queue, PollerCfg};
use crosspost_detector::{
    Detector, Dispatcher, FeedSource, Listener, MatchKind, Pipeline, PostHistory, RunOptions,
};
use tokio_util::sync::CancellationToken;

fn pipeline(sources: Vec<Box<dyn FeedSource>>, listener: Arc<dyn Listener>) -> Pipeline {
    let dispatcher = Dispatcher::new(
        vec![Detector::exact_body(), Detector::frequency_similarity(0.1)],
        vec![listener],
        PostHistory::with_capacity(100),
    );
    Pipeline::new(sources, dispatcher)
        .with_poll_interval(Duration::from_millis(5))
        .with_queue_capacity(4)
}

#[tokio::test]
async fn same_body_twice_in_one_feed_is_one_duplicate() {
    let fa = feed("a");
    let source = ScriptedSource::new(
        fa.clone(),
        vec![vec![post(&fa, "1", "hello again world"), post(&fa, "2", "hello again world")]],
    );
    let rec = RecordingListener::new();

    let opts = RunOptions {
        max_rounds: Some(1),
        ..RunOptions::default()
    };
    let (report, dispatcher) = pipeline(vec![source], rec.clone()).run(opts).await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.cross_posts, 0);

    let dups = rec.calls_of(MatchKind::Duplicate);
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].post, "2");
    assert_eq!(dups[0].matches, vec!["1".to_string()]);
    assert!(rec.calls_of(MatchKind::CrossPost).is_empty());
    assert_eq!(dispatcher.history().len(), 2);
}

#[tokio::test]
async fn same_body_in_two_feeds_is_one_cross_post() {
    let fa = feed("a");
    let fb = feed("b");
    let body = "The quick brown fox jumps over the lazy dog";
    let sources: Vec<Box<dyn FeedSource>> = vec![
        ScriptedSource::new(fa.clone(), vec![vec![post(&fa, "a1", body)]]),
        ScriptedSource::new(fb.clone(), vec![vec![post(&fb, "b1", "the lazy dog The quick brown fox jumps over")]]),
    ];
    let rec = RecordingListener::new();

    let opts = RunOptions {
        max_rounds: Some(1),
        ..RunOptions::default()
    };
    let (report, _) = pipeline(sources, rec.clone()).run(opts).await;

    assert_eq!(report.processed, 2);
    assert_eq!(report.cross_posts, 1);
    assert_eq!(report.duplicates, 0);
    assert_eq!(rec.calls().len(), 1);
}

#[tokio::test]
async fn posts_of_one_feed_keep_fetch_order() {
    let fa = feed("a");
    let batches = vec![
        vec![post(&fa, "1", "one"), post(&fa, "2", "two")],
        vec![post(&fa, "3", "three")],
        vec![post(&fa, "4", "four"), post(&fa, "5", "five")],
    ];
    let rec = RecordingListener::new();
    let opts = RunOptions {
        max_rounds: Some(3),
        ..RunOptions::default()
    };
    let (report, dispatcher) = pipeline(vec![ScriptedSource::new(fa.clone(), batches)], rec)
        .run(opts)
        .await;

    assert_eq!(report.processed, 5);
    let ids: Vec<_> = dispatcher.history().recent().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn max_posts_stops_an_endless_feed() {
    let rec = RecordingListener::new();
    let opts = RunOptions {
        max_posts: Some(5),
        ..RunOptions::default()
    };
    let (report, dispatcher) = pipeline(vec![EndlessSource::new(feed("a"))], rec.clone())
        .run(opts)
        .await;

    assert_eq!(report.processed, 5);
    assert_eq!(dispatcher.history().len(), 5);
    // every post after the first repeats the body
    assert_eq!(report.duplicates, 4);
    assert_eq!(rec.calls_of(MatchKind::Duplicate).len(), 4);
}

#[tokio::test]
async fn cancellation_stops_the_run() {
    let shutdown = CancellationToken::new();
    let opts = RunOptions {
        shutdown: shutdown.clone(),
        ..RunOptions::default()
    };
    let run = tokio::spawn(
        pipeline(vec![EndlessSource::new(feed("a"))], RecordingListener::new()).run(opts),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    shutdown.cancel();

    let (report, _) = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run should stop after cancel")
        .expect("run task");
    assert!(report.processed >= 1);
}

#[tokio::test]
async fn poller_pushes_each_post_once() {
    let fa = feed("a");
    let (tx, mut rx) = post_queue(8);
    let source = ScriptedSource::new(fa.clone(), vec![vec![post(&fa, "1", "x")]]);
    let cfg = PollerCfg {
        interval: Duration::from_millis(1),
        max_rounds: Some(2),
    };

    let pushed = poll_feed(source, tx, cfg, CancellationToken::new()).await;
    assert_eq!(pushed, 1);
    assert_eq!(rx.recv().await.map(|p| p.id), Some("1".to_string()));
    assert!(rx.recv().await.is_none());
}
