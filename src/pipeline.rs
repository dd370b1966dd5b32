// src/pipeline.rs
//! # Pipeline
//! Composes extraction, DOI resolution, enrichment and the sink into the two passes:
//! - historical: links from a text blob, deduplicated per pass;
//! - live: posts newer than the cursor.
//!
//! Every link is isolated: a failure is logged with the link's context and the pass
//! moves on. Passes run strictly sequentially, one network call at a time.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{error, info, warn};

use crate::enrich::{AbstractFetcher, MetadataFetcher};
use crate::ingest::cursor::CursorStore;
use crate::ingest::types::{CandidateLink, FeedSource, PostQuery, Provenance};
use crate::ingest::{links_from_post, links_from_text, RunDeduplicator};
use crate::metrics::{
    ensure_metrics_described, LINKS_SEEN_TOTAL, METADATA_FAILURES_TOTAL, ROWS_APPENDED_TOTAL,
};
use crate::record::OutputRow;
use crate::resolve::IdentifierResolver;
use crate::sink::RowSink;

/// Settings the passes need beyond their collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Account handle, without `@`.
    pub handle: String,
    /// e.g. `https://twitter.com`; permalinks are `{base}/{handle}/status/{id}`.
    pub permalink_base: String,
    /// Column index to re-sort by (descending) after a pass that appended rows.
    pub sort_column: Option<usize>,
    /// Lower bound for the live fetch while no cursor exists.
    pub start_time: DateTime<Utc>,
    pub page_size: u32,
}

/// Result of processing one candidate link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Appended,
    Unresolved,
    Failed,
}

/// Per-pass tallies, logged when the pass ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub posts: usize,
    pub links_seen: usize,
    pub duplicates: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub appended: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: ItemOutcome) {
        self.links_seen += 1;
        match outcome {
            ItemOutcome::Appended => self.appended += 1,
            ItemOutcome::Unresolved => self.unresolved += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct Pipeline {
    resolver: IdentifierResolver,
    metadata: MetadataFetcher,
    abstracts: AbstractFetcher,
    sink: Arc<dyn RowSink>,
    opts: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        resolver: IdentifierResolver,
        metadata: MetadataFetcher,
        abstracts: AbstractFetcher,
        sink: Arc<dyn RowSink>,
        opts: PipelineOptions,
    ) -> Self {
        ensure_metrics_described();
        Self {
            resolver,
            metadata,
            abstracts,
            sink,
            opts,
        }
    }

    /// Backlog import over a text blob. Each distinct URL is processed once.
    pub async fn run_historical(&self, text: &str) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut dedup = RunDeduplicator::new();

        for link in links_from_text(text) {
            if !dedup.first_sighting(&link.url) {
                summary.duplicates += 1;
                continue;
            }
            let outcome = self.process_link(&link).await;
            summary.record(outcome);
        }

        self.finish("historical", &summary).await;
        summary
    }

    /// Incremental pass over posts newer than `cursor`.
    ///
    /// The cursor moves to the newest post id of the fetch *before* any post is
    /// processed, so a post whose processing fails is not refetched next run.
    pub async fn run_live(
        &self,
        feed: &dyn FeedSource,
        cursor: &mut dyn CursorStore,
    ) -> Result<RunSummary> {
        // An unreadable cursor must not fall back to the start time and refetch.
        let since = cursor.read().context("reading live cursor")?;
        let account = feed
            .account_id(&self.opts.handle)
            .await
            .with_context(|| format!("looking up account @{}", self.opts.handle))?;

        let query = PostQuery {
            min_id: since,
            min_timestamp: since.is_none().then_some(self.opts.start_time),
            page_size: self.opts.page_size,
        };
        let posts = feed
            .list_posts_since(&account, &query)
            .await
            .with_context(|| format!("listing posts from {}", feed.name()))?;
        info!(
            count = posts.len(),
            since_id = ?since,
            feed = feed.name(),
            "fetched posts"
        );

        let newest = posts.iter().map(|p| p.id).max();
        if let Err(e) = cursor.advance(newest) {
            error!(error = %format!("{e:#}"), since_id = ?newest, "failed to persist cursor");
        }

        let mut summary = RunSummary {
            posts: posts.len(),
            ..RunSummary::default()
        };
        for post in &posts {
            for link in links_from_post(post) {
                let outcome = self.process_link(&link).await;
                summary.record(outcome);
            }
        }

        self.finish("live", &summary).await;
        Ok(summary)
    }

    /// Resolve → fetch metadata → fetch abstract → append. Never fails the pass.
    pub async fn process_link(&self, link: &CandidateLink) -> ItemOutcome {
        counter!(LINKS_SEEN_TOTAL).increment(1);
        let url = link.url.as_str();

        let Some(resolution) = self.resolver.resolve(url).await else {
            info!(%url, "no DOI found, skipping");
            return ItemOutcome::Unresolved;
        };
        let doi = resolution.doi;

        let metadata = match self.metadata.fetch(&doi).await {
            Ok(m) => m,
            Err(e) => {
                counter!(METADATA_FAILURES_TOTAL).increment(1);
                error!(%url, %doi, error = %e, "metadata lookup failed, skipping item");
                return ItemOutcome::Failed;
            }
        };
        let abstract_text = self.abstracts.fetch(&doi).await;

        let row = self.assemble(link, metadata, abstract_text);
        match self.sink.append_row(&row.cells()).await {
            Ok(()) => {
                counter!(ROWS_APPENDED_TOTAL).increment(1);
                info!(%doi, stage = resolution.stage.as_str(), sink = self.sink.name(), "appended row");
                ItemOutcome::Appended
            }
            Err(e) => {
                error!(%url, %doi, error = %format!("{e:#}"), "sink append failed");
                ItemOutcome::Failed
            }
        }
    }

    fn assemble(
        &self,
        link: &CandidateLink,
        metadata: crate::record::Metadata,
        abstract_text: String,
    ) -> OutputRow {
        let (posted_at, source) = match &link.provenance {
            Provenance::Post { id, created_at } => (*created_at, self.permalink(*id)),
            Provenance::Historical => (None, link.url.clone()),
        };
        OutputRow {
            posted_at,
            metadata,
            abstract_text,
            source,
        }
    }

    pub fn permalink(&self, post_id: u64) -> String {
        format!(
            "{}/{}/status/{}",
            self.opts.permalink_base.trim_end_matches('/'),
            self.opts.handle,
            post_id
        )
    }

    async fn finish(&self, pass: &'static str, summary: &RunSummary) {
        if summary.appended > 0 {
            if let Some(col) = self.opts.sort_column {
                if let Err(e) = self.sink.sort_desc(col).await {
                    warn!(error = %format!("{e:#}"), column = col, "sink re-sort failed");
                }
            }
        }
        info!(
            pass,
            posts = summary.posts,
            links = summary.links_seen,
            duplicates = summary.duplicates,
            unresolved = summary.unresolved,
            failed = summary.failed,
            appended = summary.appended,
            "pass finished"
        );
    }
}
