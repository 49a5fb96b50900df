// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod post;
pub mod tokenize;
pub mod word_count;
pub mod detector;
pub mod history;
pub mod dispatch;

// Collaborators: feed transports and notification delivery
pub mod ingest;
pub mod notify;

// Startup: configuration, wiring, metrics
pub mod app;
pub mod config;
pub mod error;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::detector::{Detector, SimilarityDetector};
pub use crate::dispatch::{classify, Classification, DispatchReport, Dispatcher, Outcome};
pub use crate::error::ConfigError;
pub use crate::history::PostHistory;
pub use crate::ingest::types::FeedSource;
pub use crate::ingest::{Pipeline, RunOptions};
pub use crate::notify::{Listener, MatchKind};
pub use crate::post::{Feed, Post, PostKey};
pub use crate::word_count::{WordCountEntry, WordCountIndex};
