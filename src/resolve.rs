// src/resolve.rs
//! URL → DOI resolution.
//!
//! Three stages, tried in order until one yields a DOI:
//! 1. pattern match on the URL itself (no network),
//! 2. HEAD with redirects, pattern match on the final URL,
//! 3. GET the landing page and read its `citation_doi`-style `<meta>` tag.
//!
//! Failures never escape: a stage that errors is logged and treated as "no match".

use std::sync::Arc;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::doi::Doi;
use crate::http::{FetchFailure, HttpFetch};
use crate::metrics::{DOI_RESOLVED_TOTAL, DOI_UNRESOLVED_TOTAL};

/// Meta tag names carrying a DOI, in preference order.
const META_NAMES: &[&str] = &["citation_doi", "dc.identifier", "prism.doi"];

static META_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta tag pattern"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([a-z_:.\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attribute pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Direct,
    Redirect,
    MetaTag,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Direct, Stage::Redirect, Stage::MetaTag];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Direct => "direct",
            Stage::Redirect => "redirect",
            Stage::MetaTag => "meta_tag",
        }
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Found(Doi),
    NotFound,
    Failed(FetchFailure),
}

impl From<Option<Doi>> for StageOutcome {
    fn from(v: Option<Doi>) -> Self {
        match v {
            Some(d) => StageOutcome::Found(d),
            None => StageOutcome::NotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub doi: Doi,
    pub stage: Stage,
}

pub struct IdentifierResolver {
    http: Arc<dyn HttpFetch>,
}

impl IdentifierResolver {
    pub fn new(http: Arc<dyn HttpFetch>) -> Self {
        Self { http }
    }

    /// Resolve `url` to a DOI. `None` is the normal "nothing found" result.
    pub async fn resolve(&self, url: &str) -> Option<Resolution> {
        for stage in Stage::ORDER {
            match self.attempt(stage, url).await {
                StageOutcome::Found(doi) => {
                    counter!(DOI_RESOLVED_TOTAL, "stage" => stage.as_str()).increment(1);
                    debug!(%url, %doi, stage = stage.as_str(), "resolved DOI");
                    return Some(Resolution { doi, stage });
                }
                StageOutcome::NotFound => {
                    debug!(%url, stage = stage.as_str(), "no DOI at stage");
                }
                StageOutcome::Failed(e) => {
                    warn!(%url, stage = stage.as_str(), error = %e, "resolution stage failed");
                }
            }
        }
        counter!(DOI_UNRESOLVED_TOTAL).increment(1);
        None
    }

    pub async fn attempt(&self, stage: Stage, url: &str) -> StageOutcome {
        match stage {
            Stage::Direct => Doi::find_in(url).into(),
            Stage::Redirect => match self.http.head_final_url(url).await {
                Ok(final_url) => Doi::find_in(&final_url).into(),
                Err(e) => failed_or_absent(e),
            },
            Stage::MetaTag => match self.http.get(url, &[]).await {
                Ok(page) => match page.into_success_body() {
                    Ok(body) => scrape_meta_doi(&body).into(),
                    Err(e) => failed_or_absent(e),
                },
                Err(e) => failed_or_absent(e),
            },
        }
    }
}

/// An error status means the page has nothing for us; only transport problems are failures.
fn failed_or_absent(e: FetchFailure) -> StageOutcome {
    match e {
        FetchFailure::Status(_) => StageOutcome::NotFound,
        other => StageOutcome::Failed(other),
    }
}

#[derive(Debug)]
struct MetaTag {
    name: String,
    content: String,
}

fn collect_meta(html: &str) -> Vec<MetaTag> {
    META_TAG_RE
        .find_iter(html)
        .filter_map(|m| parse_meta_tag(m.as_str()))
        .collect()
}

fn parse_meta_tag(tag: &str) -> Option<MetaTag> {
    let mut name = None;
    let mut content = None;
    for cap in ATTR_RE.captures_iter(tag) {
        let val = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str());
        match (cap[1].to_ascii_lowercase().as_str(), val) {
            ("name", Some(v)) => name = Some(v.to_string()),
            ("content", Some(v)) => content = Some(v.to_string()),
            _ => {}
        }
    }
    Some(MetaTag {
        name: name?,
        content: content?,
    })
}

/// DOI declared by a landing page's `<meta>` tags, if any.
pub fn scrape_meta_doi(html: &str) -> Option<Doi> {
    let metas = collect_meta(html);
    META_NAMES.iter().find_map(|wanted| {
        metas
            .iter()
            .filter(|m| m.name.eq_ignore_ascii_case(wanted))
            .find_map(|m| Doi::find_in(&html_escape::decode_html_entities(&m.content)))
    })
}
