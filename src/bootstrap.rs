// src/bootstrap.rs
use crate::config::{AppConfig, RunMode, SinkTarget};
use crate::enrich::{AbstractFetcher, MetadataFetcher};
use crate::http::{user_agent, HttpFetch, ReqwestFetcher};
use crate::ingest::cursor::FileCursor;
use crate::ingest::load_historical_text;
use crate::ingest::providers::TwitterFeed;
use crate::pipeline::{Pipeline, PipelineOptions, RunSummary};
use crate::resolve::IdentifierResolver;
use crate::sink::{JsonlSink, RowSink, SheetsSink};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Fully wired collaborators for one invocation.
pub struct Runtime {
    pub cfg: AppConfig,
    pub pipeline: Pipeline,
}

impl Runtime {
    pub fn from_config(cfg: AppConfig) -> Result<Self> {
        cfg.log_summary();

        let ua = user_agent(cfg.registry.mailto.as_deref());
        let http: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new(&ua, cfg.http_timeout)?);

        let resolver = IdentifierResolver::new(http.clone());
        let metadata = MetadataFetcher::new(http.clone(), &cfg.registry.crossref_base);
        let abstracts = AbstractFetcher::new(
            http,
            &cfg.registry.s2_base,
            cfg.registry.s2_api_key.clone(),
            &cfg.registry.crossref_base,
        );
        let sink = build_sink(&cfg)?;

        let opts = PipelineOptions {
            handle: cfg.handle.clone(),
            permalink_base: cfg.permalink_base.clone(),
            sort_column: cfg.sort_column,
            start_time: cfg.feed.start_time,
            page_size: cfg.feed.page_size,
        };
        let pipeline = Pipeline::new(resolver, metadata, abstracts, sink, opts);
        Ok(Self { cfg, pipeline })
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunSummary> {
        match mode {
            RunMode::Historical => {
                let path = &self.cfg.historical_file;
                info!(path = %path.display(), "starting historical import");
                let text = load_historical_text(path);
                Ok(self.pipeline.run_historical(&text).await)
            }
            RunMode::Live => {
                let token = self
                    .cfg
                    .feed
                    .bearer_token
                    .clone()
                    .context("live mode needs a feed bearer token")?;
                let feed = TwitterFeed::new(&self.cfg.feed.api_base, token, self.cfg.http_timeout)?
                    .with_max_pages(self.cfg.feed.max_pages);
                let mut cursor = FileCursor::new(&self.cfg.cursor_path);
                info!(cursor = %cursor.path().display(), "starting live pass");
                self.pipeline.run_live(&feed, &mut cursor).await
            }
        }
    }
}

fn build_sink(cfg: &AppConfig) -> Result<Arc<dyn RowSink>> {
    let sink: Arc<dyn RowSink> = match &cfg.sink {
        SinkTarget::Sheets {
            spreadsheet_id,
            access_token,
            range,
            sheet_gid,
        } => Arc::new(SheetsSink::new(
            spreadsheet_id.clone(),
            access_token.clone(),
            range.clone(),
            *sheet_gid,
            cfg.http_timeout,
        )?),
        SinkTarget::Jsonl { path } => Arc::new(JsonlSink::new(path.clone())),
    };
    Ok(sink)
}
