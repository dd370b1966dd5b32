// src/http.rs
//! HTTP seam shared by the DOI resolver and the enrichment fetchers.
//!
//! Everything that talks to publishers or registries goes through [`HttpFetch`], so the
//! pipeline can be exercised offline with scripted fakes.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;

/// Transport-level failure of a single request. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
}

/// A fetched document. `final_url` is the URL after redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a 2xx page, or a `Status` failure.
    pub fn into_success_body(self) -> Result<String, FetchFailure> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(FetchFailure::Status(self.status))
        }
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Follow redirects for `url` and report where they ended. The body is never read.
    async fn head_final_url(&self, url: &str) -> Result<String, FetchFailure>;

    /// Full GET with optional extra headers. Non-2xx statuses are returned, not raised.
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Page, FetchFailure>;
}

/// Polite-pool user agent for Crossref (`mailto` is optional).
pub fn user_agent(mailto: Option<&str>) -> String {
    let base = concat!("paper-feed/", env!("CARGO_PKG_VERSION"));
    match mailto.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => format!("{base} (mailto:{m})"),
        None => base.to_string(),
    }
}

/// Production fetcher backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }
}

/// Upper bound on bytes kept from one response body. Registry records are far smaller;
/// landing pages only need their `<head>`.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Append `chunk` up to `limit` total bytes. `false` once the limit is reached.
fn push_capped(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) -> bool {
    let room = limit.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    buf.len() < limit
}

fn classify(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Transport(e.to_string())
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn head_final_url(&self, url: &str) -> Result<String, FetchFailure> {
        let resp = self.client.head(url).send().await.map_err(classify)?;
        Ok(resp.url().to_string())
    }

    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Page, FetchFailure> {
        let mut req = self.client.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let mut resp = req.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();

        let mut buf = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(classify)? {
            if !push_capped(&mut buf, &chunk, MAX_BODY_BYTES) {
                tracing::debug!(%url, limit = MAX_BODY_BYTES, "body truncated");
                break;
            }
        }
        Ok(Page {
            final_url,
            status,
            body: String::from_utf8_lossy(&buf).into_owned(),
        })
    }
}
