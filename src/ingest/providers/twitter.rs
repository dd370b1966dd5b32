// src/ingest/providers/twitter.rs
//! Twitter/X API v2 timeline reader (bearer token only).
//!
//! `GET /2/users/by/username/{handle}` → account id,
//! `GET /2/users/{id}/tweets?tweet.fields=entities,created_at` → posts, newest first.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::types::{FeedSource, Post, PostQuery};
use crate::metrics::FEED_POSTS_TOTAL;

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";

/// The API accepts 5..=100 per page.
const PAGE_MIN: u32 = 5;
const PAGE_MAX: u32 = 100;

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: Option<UserData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TweetsPage {
    #[serde(default)]
    data: Vec<Tweet>,
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    created_at: Option<DateTime<Utc>>,
    entities: Option<Entities>,
}

#[derive(Debug, Deserialize)]
struct Entities {
    #[serde(default)]
    urls: Vec<UrlEntity>,
}

#[derive(Debug, Deserialize)]
struct UrlEntity {
    expanded_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next_token: Option<String>,
}

pub struct TwitterFeed {
    client: reqwest::Client,
    base: String,
    bearer_token: String,
    max_pages: u32,
}

impl TwitterFeed {
    pub fn new(base: &str, bearer_token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::http::user_agent(None))
            .timeout(timeout)
            .build()
            .context("building twitter client")?;
        Ok(Self {
            client,
            base: base.trim().trim_end_matches('/').to_string(),
            bearer_token,
            max_pages: 1,
        })
    }

    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages = pages.max(1);
        self
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("twitter get {url}"))?;
        let status = resp.status();
        let body = resp.text().await.context("twitter body")?;
        if !status.is_success() {
            return Err(anyhow!("twitter returned {status}: {}", truncate(&body, 200)));
        }
        Ok(body)
    }
}

#[async_trait]
impl FeedSource for TwitterFeed {
    async fn account_id(&self, handle: &str) -> Result<String> {
        let handle = handle.trim().trim_start_matches('@');
        let url = format!("{}/2/users/by/username/{}", self.base, handle);
        let body = self.get_json(&url, &[]).await?;
        parse_user_id(&body).with_context(|| format!("resolving account @{handle}"))
    }

    async fn list_posts_since(&self, account_id: &str, query: &PostQuery) -> Result<Vec<Post>> {
        let url = format!("{}/2/users/{}/tweets", self.base, account_id);
        let mut params: Vec<(&str, String)> = vec![
            ("tweet.fields", "entities,created_at".to_string()),
            (
                "max_results",
                query.page_size.clamp(PAGE_MIN, PAGE_MAX).to_string(),
            ),
        ];
        if let Some(id) = query.min_id {
            params.push(("since_id", id.to_string()));
        } else if let Some(ts) = query.min_timestamp {
            params.push(("start_time", ts.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }

        let mut posts = Vec::new();
        let mut token: Option<String> = None;
        for page in 0..self.max_pages {
            let mut page_params = params.clone();
            if let Some(t) = token.take() {
                page_params.push(("pagination_token", t));
            }
            let body = self.get_json(&url, &page_params).await?;
            let (mut batch, next) = parse_tweets_page(&body)?;
            tracing::debug!(page, count = batch.len(), "twitter page");
            posts.append(&mut batch);
            match next {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        counter!(FEED_POSTS_TOTAL).increment(posts.len() as u64);
        Ok(posts)
    }

    fn name(&self) -> &'static str {
        "twitter"
    }
}

fn parse_user_id(body: &str) -> Result<String> {
    let env: UserEnvelope = serde_json::from_str(body).context("parsing user lookup json")?;
    match env.data {
        Some(u) => Ok(u.id),
        None => {
            let why = env
                .errors
                .iter()
                .filter_map(|e| e.detail.as_deref().or(e.title.as_deref()))
                .collect::<Vec<_>>()
                .join("; ");
            Err(anyhow!("user not found: {why}"))
        }
    }
}

/// Posts of one timeline page plus the next pagination token.
fn parse_tweets_page(body: &str) -> Result<(Vec<Post>, Option<String>)> {
    let page: TweetsPage = serde_json::from_str(body).context("parsing timeline json")?;
    let mut out = Vec::with_capacity(page.data.len());
    for t in page.data {
        let Ok(id) = t.id.parse::<u64>() else {
            tracing::warn!(id = %t.id, "skipping tweet with non-numeric id");
            continue;
        };
        let urls = t
            .entities
            .map(|e| {
                e.urls
                    .into_iter()
                    .filter_map(|u| u.expanded_url.or(u.url))
                    .collect()
            })
            .unwrap_or_default();
        out.push(Post {
            id,
            created_at: t.created_at,
            urls,
        });
    }
    Ok((out, page.meta.and_then(|m| m.next_token)))
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
