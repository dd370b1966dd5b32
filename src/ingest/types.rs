// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// A post as reported by the feed source. Read-only to the pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub urls: Vec<String>, // in feed order
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Post {
        id: u64,
        created_at: Option<DateTime<Utc>>,
    },
    Historical,
}

/// A URL waiting to be resolved, plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub url: String,
    pub provenance: Provenance,
}

/// Lower bound for a live fetch: an id floor when a cursor exists, otherwise a start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub min_id: Option<u64>,
    pub min_timestamp: Option<DateTime<Utc>>,
    pub page_size: u32,
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn account_id(&self, handle: &str) -> Result<String>;
    /// Posts strictly newer than the query's lower bound.
    async fn list_posts_since(&self, account_id: &str, query: &PostQuery) -> Result<Vec<Post>>;
    fn name(&self) -> &'static str;
}
