// src/enrich/metadata.rs
//! Crossref works lookup → [`Metadata`].
//!
//! API: `{base}/works/{doi}`, record under `message`.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::doi::Doi;
use crate::http::{FetchFailure, HttpFetch};
use crate::record::Metadata;

/// Registry lookup failure. Aborts the current item only.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("registry unreachable: {0}")]
    Transport(FetchFailure),
    #[error("registry returned status {0}")]
    Status(u16),
    #[error("malformed registry payload: {0}")]
    Malformed(String),
}

impl From<FetchFailure> for MetadataError {
    fn from(e: FetchFailure) -> Self {
        match e {
            FetchFailure::Status(code) => MetadataError::Status(code),
            other => MetadataError::Transport(other),
        }
    }
}

/// Date fields consulted for the year, in preference order.
const YEAR_SOURCES: [&str; 3] = ["published-print", "published-online", "issued"];

pub struct MetadataFetcher {
    http: Arc<dyn HttpFetch>,
    base: String,
}

impl MetadataFetcher {
    pub fn new(http: Arc<dyn HttpFetch>, crossref_base: &str) -> Self {
        Self {
            http,
            base: super::trim_base(crossref_base),
        }
    }

    pub fn works_url(&self, doi: &Doi) -> String {
        format!("{}/works/{}", self.base, doi)
    }

    #[instrument(skip_all, fields(doi = %doi))]
    pub async fn fetch(&self, doi: &Doi) -> Result<Metadata, MetadataError> {
        let url = self.works_url(doi);
        let body = self
            .http
            .get(&url, &[("accept", "application/json")])
            .await?
            .into_success_body()?;
        let meta = parse_works_response(doi, &body)?;
        debug!(title = %meta.title, authors = meta.authors.len(), "crossref record parsed");
        Ok(meta)
    }
}

/// Parse a Crossref `/works/{doi}` response body.
pub fn parse_works_response(doi: &Doi, body: &str) -> Result<Metadata, MetadataError> {
    let v: Value =
        serde_json::from_str(body).map_err(|e| MetadataError::Malformed(e.to_string()))?;
    let work = v
        .get("message")
        .filter(|m| m.is_object())
        .ok_or_else(|| MetadataError::Malformed("missing `message` object".to_string()))?;
    Ok(work_to_metadata(doi.clone(), work))
}

fn work_to_metadata(doi: Doi, work: &Value) -> Metadata {
    let authors = work["author"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|a| {
                    let given = a["given"].as_str().unwrap_or("");
                    let family = a["family"].as_str().unwrap_or("");
                    format!("{given} {family}").trim().to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    Metadata {
        doi,
        title: first_of_list(&work["title"]),
        journal: first_of_list(&work["container-title"]),
        authors,
        year: YEAR_SOURCES
            .iter()
            .map(|key| &work[*key])
            .find(|d| d.is_object())
            .and_then(year_of),
        volume: text_of(&work["volume"]),
        issue: text_of(&work["issue"]),
        pages: text_of(&work["page"]),
        publisher: text_of(&work["publisher"]),
    }
}

fn first_of_list(v: &Value) -> String {
    v.as_array()
        .and_then(|l| l.first())
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

// { "date-parts": [[2024, 6, 1]] }
fn year_of(date: &Value) -> Option<i32> {
    date["date-parts"]
        .as_array()?
        .first()?
        .as_array()?
        .first()?
        .as_i64()
        .and_then(|y| i32::try_from(y).ok())
}
