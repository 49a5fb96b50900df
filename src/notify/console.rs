use anyhow::Result;

use super::{render_report, Listener, MatchKind};
use crate::post::Post;

/// Prints reports to stdout and mirrors a one-line summary into the log.
#[derive(Debug, Default, Clone)]
pub struct ConsoleListener;

impl ConsoleListener {
    fn report(&self, kind: MatchKind, post: &Post, matches: &[Post]) {
        tracing::info!(
            target: "notify",
            kind = %kind,
            feed = post.feed_id(),
            post_id = %post.id,
            matches = matches.len(),
            "match found"
        );
        println!("{}", render_report(kind, post, matches));
    }
}

#[async_trait::async_trait]
impl Listener for ConsoleListener {
    fn name(&self) -> &str {
        "console"
    }

    async fn on_duplicate(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.report(MatchKind::Duplicate, post, matches);
        Ok(())
    }

    async fn on_cross_post(&self, post: &Post, matches: &[Post]) -> Result<()> {
        self.report(MatchKind::CrossPost, post, matches);
        Ok(())
    }
}
