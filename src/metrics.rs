// src/metrics.rs
//! Counter names used across the pipeline, described once per process.
//! No exporter is installed; a host process can attach any `metrics` recorder.

use metrics::describe_counter;
use once_cell::sync::OnceCell;

pub const FEED_POSTS_TOTAL: &str = "feed_posts_total";
pub const LINKS_SEEN_TOTAL: &str = "links_seen_total";
pub const DOI_RESOLVED_TOTAL: &str = "doi_resolved_total";
pub const DOI_UNRESOLVED_TOTAL: &str = "doi_unresolved_total";
pub const METADATA_FAILURES_TOTAL: &str = "metadata_failures_total";
pub const ROWS_APPENDED_TOTAL: &str = "rows_appended_total";

pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(FEED_POSTS_TOTAL, "Posts returned by the feed source.");
        describe_counter!(
            LINKS_SEEN_TOTAL,
            "Candidate links handed to the resolver (after run dedup)."
        );
        describe_counter!(DOI_RESOLVED_TOTAL, "Links resolved to a DOI, by stage.");
        describe_counter!(DOI_UNRESOLVED_TOTAL, "Links with no DOI at any stage.");
        describe_counter!(
            METADATA_FAILURES_TOTAL,
            "Registry lookups that failed for a resolved DOI."
        );
        describe_counter!(ROWS_APPENDED_TOTAL, "Rows written to the sink.");
    });
}
