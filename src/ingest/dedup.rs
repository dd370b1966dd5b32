// src/ingest/dedup.rs
//! Per-pass URL dedup for the historical import. Nothing is persisted.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct RunDeduplicator {
    seen: HashSet<String>,
}

impl RunDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn mark(&mut self, url: &str) {
        self.seen.insert(url.to_string());
    }

    /// Check-and-mark: true only the first time `url` is offered.
    pub fn first_sighting(&mut self, url: &str) -> bool {
        self.seen.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
