use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "xpd_posts_processed_total",
            "Posts run through detection and recorded in history."
        );
        describe_counter!(
            "xpd_duplicate_notifications_total",
            "Posts with matches from the same feed."
        );
        describe_counter!(
            "xpd_crosspost_notifications_total",
            "Posts with matches from other feeds."
        );
        describe_counter!("xpd_listener_errors_total", "Failed listener deliveries.");
        describe_counter!("xpd_feed_fetch_errors_total", "Feed fetch/parse errors.");
        describe_counter!("xpd_feed_posts_total", "New posts fetched from feeds.");
        describe_gauge!("xpd_history_len", "Posts currently held in history.");
        describe_gauge!(
            "xpd_word_count_cache_len",
            "Word count entries cached by the similarity detector."
        );
    });
}

/// Install the Prometheus recorder with an HTTP scrape endpoint on `addr`.
/// Must be called from within the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
