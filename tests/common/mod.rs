// tests/common/mod.rs
// Scripted fakes shared by the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;

use paper_feed::enrich::{AbstractFetcher, MetadataFetcher};
use paper_feed::http::{FetchFailure, HttpFetch, Page};
use paper_feed::ingest::types::{FeedSource, Post, PostQuery};
use paper_feed::resolve::IdentifierResolver;
use paper_feed::sink::{MemorySink, RowSink};
use paper_feed::{Pipeline, PipelineOptions};

pub const CROSSREF: &str = "http://crossref.test";
pub const S2: &str = "http://s2.test";

/// Unscripted HEADs fail with 404; unscripted GETs return a 404 page.
#[derive(Default)]
pub struct FakeHttp {
    heads: Mutex<HashMap<String, Result<String, FetchFailure>>>,
    gets: Mutex<HashMap<String, Result<Page, FetchFailure>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn head(&self, url: &str, final_url: &str) {
        self.heads
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(final_url.to_string()));
    }

    pub fn get_ok(&self, url: &str, body: &str) {
        self.get_status(url, 200, body);
    }

    pub fn get_status(&self, url: &str, status: u16, body: &str) {
        self.gets.lock().unwrap().insert(
            url.to_string(),
            Ok(Page {
                final_url: url.to_string(),
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn get_fail(&self, url: &str, failure: FetchFailure) {
        self.gets.lock().unwrap().insert(url.to_string(), Err(failure));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split_once(' ').map(|(_, u)| u.starts_with(prefix)).unwrap_or(false))
            .count()
    }

    /// Crossref works record for `doi` with a title.
    pub fn crossref_work(&self, doi: &str, title: &str) {
        let body = serde_json::json!({
            "status": "ok",
            "message": {
                "DOI": doi,
                "title": [title],
                "container-title": ["Journal of Tests"],
                "author": [{ "given": "Ada", "family": "Lovelace" }],
                "issued": { "date-parts": [[2024, 3]] },
                "volume": "12",
                "issue": "4",
                "page": "1-9",
                "publisher": "Test Society"
            }
        });
        self.get_ok(&format!("{CROSSREF}/works/{doi}"), &body.to_string());
    }
}

#[async_trait]
impl HttpFetch for FakeHttp {
    async fn head_final_url(&self, url: &str) -> Result<String, FetchFailure> {
        self.calls.lock().unwrap().push(format!("HEAD {url}"));
        self.heads
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchFailure::Status(404)))
    }

    async fn get(&self, url: &str, _headers: &[(&str, &str)]) -> Result<Page, FetchFailure> {
        self.calls.lock().unwrap().push(format!("GET {url}"));
        self.gets.lock().unwrap().get(url).cloned().unwrap_or(Ok(Page {
            final_url: url.to_string(),
            status: 404,
            body: String::new(),
        }))
    }
}

pub struct FakeFeed {
    pub posts: Vec<Post>,
    pub queries: Mutex<Vec<PostQuery>>,
    pub fail_listing: bool,
}

impl FakeFeed {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts,
            queries: Mutex::new(Vec::new()),
            fail_listing: false,
        }
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn account_id(&self, handle: &str) -> Result<String> {
        Ok(format!("id-{handle}"))
    }

    async fn list_posts_since(&self, _account_id: &str, query: &PostQuery) -> Result<Vec<Post>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_listing {
            anyhow::bail!("feed unavailable");
        }
        Ok(self
            .posts
            .iter()
            .filter(|p| query.min_id.map_or(true, |min| p.id > min))
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub fn post(id: u64, urls: &[&str]) -> Post {
    Post {
        id,
        created_at: Some(Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap()),
        urls: urls.iter().map(|u| u.to_string()).collect(),
    }
}

pub fn options() -> PipelineOptions {
    PipelineOptions {
        handle: "lab".to_string(),
        permalink_base: "https://twitter.com".to_string(),
        sort_column: None,
        start_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        page_size: 10,
    }
}

pub fn pipeline_with(http: Arc<FakeHttp>, sink: Arc<MemorySink>, opts: PipelineOptions) -> Pipeline {
    let fetch: Arc<dyn HttpFetch> = http;
    let rows: Arc<dyn RowSink> = sink;
    Pipeline::new(
        IdentifierResolver::new(fetch.clone()),
        MetadataFetcher::new(fetch.clone(), CROSSREF),
        AbstractFetcher::new(fetch, S2, None, CROSSREF),
        rows,
        opts,
    )
}

/// Log lines written while the returned guard is alive on this thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
