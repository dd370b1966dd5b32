// src/enrich/abstracts.rs
//! Abstract lookup with a fallback chain:
//! 1. Semantic Scholar Graph API (`abstract` field),
//! 2. Crossref UNIXSD XML export (`<jats:abstract>` text),
//! 3. empty string.
//!
//! The abstract is enrichment, so [`AbstractFetcher::fetch`] never fails.

use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::doi::Doi;
use crate::http::HttpFetch;

const UNIXSD_MIME: &str = "application/vnd.crossref.unixsd+xml";

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

pub struct AbstractFetcher {
    http: Arc<dyn HttpFetch>,
    s2_base: String,
    s2_api_key: Option<String>,
    crossref_base: String,
}

impl AbstractFetcher {
    pub fn new(
        http: Arc<dyn HttpFetch>,
        s2_base: &str,
        s2_api_key: Option<String>,
        crossref_base: &str,
    ) -> Self {
        Self {
            http,
            s2_base: super::trim_base(s2_base),
            s2_api_key: s2_api_key.filter(|k| !k.trim().is_empty()),
            crossref_base: super::trim_base(crossref_base),
        }
    }

    pub fn semantic_scholar_url(&self, doi: &Doi) -> String {
        format!("{}/graph/v1/paper/DOI:{}?fields=abstract", self.s2_base, doi)
    }

    pub fn unixsd_url(&self, doi: &Doi) -> String {
        format!(
            "{}/works/{}/transform/{}",
            self.crossref_base, doi, UNIXSD_MIME
        )
    }

    /// Best abstract available for `doi`, or `""`.
    pub async fn fetch(&self, doi: &Doi) -> String {
        match self.from_semantic_scholar(doi).await {
            Ok(Some(text)) => return text,
            Ok(None) => debug!(%doi, "semantic scholar has no abstract"),
            Err(e) => warn!(%doi, error = %format!("{e:#}"), "semantic scholar lookup failed"),
        }
        match self.from_crossref_xml(doi).await {
            Ok(Some(text)) => return text,
            Ok(None) => debug!(%doi, "crossref record has no abstract"),
            Err(e) => warn!(%doi, error = %format!("{e:#}"), "crossref xml lookup failed"),
        }
        String::new()
    }

    async fn from_semantic_scholar(&self, doi: &Doi) -> Result<Option<String>> {
        let url = self.semantic_scholar_url(doi);
        let mut headers = vec![("accept", "application/json")];
        if let Some(key) = self.s2_api_key.as_deref() {
            headers.push(("x-api-key", key));
        }
        let body = self
            .http
            .get(&url, &headers)
            .await
            .context("semantic scholar get")?
            .into_success_body()
            .context("semantic scholar status")?;
        abstract_from_semantic_scholar(&body)
    }

    async fn from_crossref_xml(&self, doi: &Doi) -> Result<Option<String>> {
        let url = self.unixsd_url(doi);
        let body = self
            .http
            .get(&url, &[("accept", UNIXSD_MIME)])
            .await
            .context("crossref xml get")?
            .into_success_body()
            .context("crossref xml status")?;
        abstract_from_unixsd(&body)
    }
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
}

/// `abstract` field of a Semantic Scholar paper document; `None` when null or blank.
pub fn abstract_from_semantic_scholar(body: &str) -> Result<Option<String>> {
    let paper: S2Paper = serde_json::from_str(body).context("parsing semantic scholar json")?;
    Ok(paper
        .abstract_text
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty()))
}

/// JATS elements that end a run of text. Inline markup (`italic`, `sub`, ...) joins.
const BLOCK_ELEMENTS: &[&[u8]] = &[b"p", b"sec", b"title", b"list", b"list-item", b"disp-quote"];

fn is_block(local: &[u8]) -> bool {
    BLOCK_ELEMENTS.contains(&local)
}

/// Text of the first `abstract` element (any namespace prefix) in a Crossref XML record.
/// Section titles inside the abstract are dropped; other markup is flattened.
pub fn abstract_from_unixsd(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut depth = 0usize;
    let mut title_depth = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event().context("reading crossref xml")? {
            Event::Start(e) => {
                let local = e.local_name();
                if depth == 0 {
                    if local.as_ref() == b"abstract" {
                        depth = 1;
                    }
                    continue;
                }
                depth += 1;
                if title_depth > 0 || local.as_ref() == b"title" {
                    title_depth += 1;
                }
                if is_block(local.as_ref()) {
                    text.push(' ');
                }
            }
            Event::End(e) if depth > 0 => {
                depth -= 1;
                title_depth = title_depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
                if is_block(e.local_name().as_ref()) {
                    text.push(' ');
                }
            }
            Event::Text(t) if depth > 0 && title_depth == 0 => match t.unescape() {
                Ok(s) => text.push_str(&s),
                Err(_) => {
                    let raw = String::from_utf8_lossy(&t);
                    text.push_str(&html_escape::decode_html_entities(&raw));
                }
            },
            Event::CData(c) if depth > 0 && title_depth == 0 => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let collapsed = RE_WS.replace_all(&text, " ").trim().to_string();
    Ok(Some(collapsed).filter(|s| !s.is_empty()))
}
