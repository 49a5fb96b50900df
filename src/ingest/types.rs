// src/ingest/types.rs
use std::sync::Arc;

use crate::post::{Feed, Post};

/// A feed transport: fetches whatever is new since the previous call.
///
/// Implementations must not block indefinitely. Transient failures are logged
/// by the implementation and surface as an empty batch, never as an error.
#[async_trait::async_trait]
pub trait FeedSource: Send {
    fn feed(&self) -> Arc<Feed>;

    async fn fetch_new_posts(&mut self) -> Vec<Post>;
}
