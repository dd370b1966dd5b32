// src/record.rs
//! Bibliographic record types and the flattened sheet row.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::doi::Doi;

/// Parsed registry record for one DOI. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub doi: Doi,
    pub title: String,
    pub journal: String,
    /// Display names, "given family", in registry order.
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    pub publisher: String,
}

impl Metadata {
    /// Record with every descriptive field empty.
    pub fn bare(doi: Doi) -> Self {
        Self {
            doi,
            title: String::new(),
            journal: String::new(),
            authors: Vec::new(),
            year: None,
            volume: String::new(),
            issue: String::new(),
            pages: String::new(),
            publisher: String::new(),
        }
    }
}

/// One sink row: metadata + abstract + where the link came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRow {
    pub posted_at: Option<DateTime<Utc>>,
    pub metadata: Metadata,
    pub abstract_text: String,
    /// Originating URL (historical import) or post permalink (live).
    pub source: String,
}

impl OutputRow {
    pub const COLUMNS: [&'static str; 12] = [
        "posted_at",
        "title",
        "authors",
        "journal",
        "year",
        "volume",
        "issue",
        "pages",
        "publisher",
        "doi",
        "abstract",
        "source",
    ];

    pub fn column_index(name: &str) -> Option<usize> {
        let wanted = name.trim();
        Self::COLUMNS
            .iter()
            .position(|c| c.eq_ignore_ascii_case(wanted))
    }

    /// Cells in [`OutputRow::COLUMNS`] order.
    pub fn cells(&self) -> Vec<String> {
        let m = &self.metadata;
        vec![
            self.posted_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            m.title.clone(),
            m.authors.join("; "),
            m.journal.clone(),
            m.year.map(|y| y.to_string()).unwrap_or_default(),
            m.volume.clone(),
            m.issue.clone(),
            m.pages.clone(),
            m.publisher.clone(),
            m.doi.to_string(),
            self.abstract_text.clone(),
            self.source.clone(),
        ]
    }
}
