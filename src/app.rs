//! # Wiring
//! Turns a validated `Config` into a runnable `Pipeline`.
//!
//! Detector, listener and feed types are resolved through explicit
//! string-keyed factories; an unknown name is a startup error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, FeedConfig, TypeConfig};
use crate::detector::{Detector, SimilarityDetector, DEFAULT_MAX_DIFF_RATIO};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::ConfigError;
use crate::history::PostHistory;
use crate::ingest::providers::{MboxFeedSource, RssFeedSource};
use crate::ingest::types::FeedSource;
use crate::ingest::{Pipeline, RunOptions};
use crate::notify::mail::{MailListener, SmtpSettings, SmtpSink};
use crate::notify::{ConsoleListener, Listener, WebhookListener};
use crate::post::Feed;

pub const ENV_SMTP_PASS: &str = "SMTP_PASS";
const DEFAULT_MAIL_SUBJECT: &str = "Possible duplicate posts";

pub fn build_detector(spec: &TypeConfig) -> Result<Detector, ConfigError> {
    match spec.kind.as_str() {
        "exact-body" | "same-body" | "SameBodyDetector" => Ok(Detector::exact_body()),
        "frequency-similarity" | "similar-word-count" | "SimilarWordCountDetector" => {
            let ratio = spec.ratio_param("maxDiffRatio", DEFAULT_MAX_DIFF_RATIO)?;
            let total_ratio = spec.ratio_param("maxTotalDiffRatio", ratio)?;
            Ok(Detector::FrequencySimilarity(SimilarityDetector::with_ratios(
                ratio,
                total_ratio,
            )))
        }
        other => Err(ConfigError::UnknownDetector(other.to_string())),
    }
}

pub fn build_listener(spec: &TypeConfig) -> Result<Arc<dyn Listener>, ConfigError> {
    match spec.kind.as_str() {
        "console" => Ok(Arc::new(ConsoleListener)),
        "mail" | "smtp" => {
            let settings = smtp_settings(spec)?;
            let sink = SmtpSink::new(&settings).map_err(|e| ConfigError::InvalidListener {
                kind: spec.kind.clone(),
                message: format!("{e:#}"),
            })?;
            Ok(Arc::new(MailListener::new(sink)))
        }
        "webhook" => {
            let url = spec.required_param("url")?;
            let mut listener = WebhookListener::new(url);
            if let Some(raw) = spec.param("timeoutSecs") {
                let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidParam {
                    owner: spec.kind.clone(),
                    key: "timeoutSecs".to_string(),
                    value: raw.to_string(),
                })?;
                listener = listener.with_timeout(secs);
            }
            Ok(Arc::new(listener))
        }
        other => Err(ConfigError::UnknownListener(other.to_string())),
    }
}

fn smtp_settings(spec: &TypeConfig) -> Result<SmtpSettings, ConfigError> {
    // "ENV" (or no value) means: read from SMTP_PASS
    let password = match spec.param("password") {
        Some(p) if !p.trim().eq_ignore_ascii_case("env") => p.to_string(),
        _ => std::env::var(ENV_SMTP_PASS).map_err(|_| ConfigError::MissingParam {
            owner: spec.kind.clone(),
            key: "password".to_string(),
        })?,
    };
    let from = spec.required_param("from")?.to_string();
    Ok(SmtpSettings {
        host: spec.required_param("host")?.to_string(),
        username: spec.param("username").map(str::to_string).unwrap_or_else(|| from.clone()),
        password,
        from,
        to: spec.required_param("to")?.to_string(),
        subject: spec
            .param("subject")
            .unwrap_or(DEFAULT_MAIL_SUBJECT)
            .to_string(),
    })
}

pub fn build_source(spec: &FeedConfig) -> Result<Box<dyn FeedSource>, ConfigError> {
    let feed = Arc::new(Feed::new(spec.id.clone(), spec.url.clone()));
    match spec.kind.as_str() {
        "rss" => {
            let mut source = RssFeedSource::from_feed(feed);
            if let Some(secs) = spec.timeout_secs {
                source = source.with_timeout(Duration::from_secs(secs));
            }
            Ok(Box::new(source))
        }
        "mbox" => Ok(Box::new(MboxFeedSource::from_feed(feed))),
        other => Err(ConfigError::UnknownFeedKind {
            feed: spec.id.clone(),
            kind: other.to_string(),
        }),
    }
}

/// Validate `config` and build every component. Nothing runs yet.
pub fn build_pipeline(config: &Config) -> Result<Pipeline, ConfigError> {
    config.validate()?;

    let sources = config
        .feeds
        .iter()
        .map(build_source)
        .collect::<Result<Vec<_>, _>>()?;
    let detectors = config
        .detectors
        .iter()
        .map(build_detector)
        .collect::<Result<Vec<_>, _>>()?;
    let mut listeners = config
        .listeners
        .iter()
        .map(build_listener)
        .collect::<Result<Vec<_>, _>>()?;
    if listeners.is_empty() {
        listeners.push(Arc::new(ConsoleListener));
    }

    tracing::info!(
        feeds = sources.len(),
        detectors = ?detectors.iter().map(Detector::name).collect::<Vec<_>>(),
        listeners = ?listeners.iter().map(|l| l.name().to_string()).collect::<Vec<_>>(),
        history_capacity = config.history_capacity,
        "pipeline configured"
    );

    let dispatcher = Dispatcher::new(
        detectors,
        listeners,
        PostHistory::with_capacity(config.history_capacity),
    );
    Ok(Pipeline::new(sources, dispatcher)
        .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
        .with_queue_capacity(config.queue_capacity))
}

/// Load, build and run. Configuration errors surface before any polling.
pub async fn run_from_path(path: &Path, opts: RunOptions) -> anyhow::Result<DispatchReport> {
    let config = Config::load_from(path)?;
    let pipeline = build_pipeline(&config)?;
    let (report, _dispatcher) = pipeline.run(opts).await;
    Ok(report)
}
