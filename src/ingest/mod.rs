// src/ingest/mod.rs
pub mod cursor;
pub mod dedup;
pub mod providers;
pub mod types;

use crate::ingest::types::{CandidateLink, Post, Provenance};
use once_cell::sync::OnceCell;
use std::path::Path;

pub use dedup::RunDeduplicator;

fn url_re() -> &'static regex::Regex {
    static RE_URL: OnceCell<regex::Regex> = OnceCell::new();
    RE_URL.get_or_init(|| regex::Regex::new(r"https?://\S+").expect("valid url pattern"))
}

/// Embedded URLs of a post, once each, in feed order.
pub fn links_from_post(post: &Post) -> impl Iterator<Item = CandidateLink> + '_ {
    post.urls.iter().map(move |url| CandidateLink {
        url: url.clone(),
        provenance: Provenance::Post {
            id: post.id,
            created_at: post.created_at,
        },
    })
}

/// Every `http(s)://…` run of non-whitespace in `text`, in order, duplicates included.
pub fn links_from_text(text: &str) -> impl Iterator<Item = CandidateLink> + '_ {
    url_re().find_iter(text).map(|m| CandidateLink {
        url: m.as_str().to_string(),
        provenance: Provenance::Historical,
    })
}

/// Read the historical import blob. A missing or unreadable file is an empty blob.
pub fn load_historical_text(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "historical file unreadable; treating as empty");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_links_keep_order_and_duplicates() {
        let blob = "see https://doi.org/10.1000/a and http://x.test/p?q=1\nagain https://doi.org/10.1000/a";
        let urls: Vec<String> = links_from_text(blob).map(|l| l.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://doi.org/10.1000/a",
                "http://x.test/p?q=1",
                "https://doi.org/10.1000/a",
            ]
        );
    }

    #[test]
    fn text_without_links_yields_nothing() {
        assert_eq!(links_from_text("").count(), 0);
        assert_eq!(links_from_text("ftp://old.test nothing here").count(), 0);
    }

    #[test]
    fn post_links_carry_post_provenance() {
        let post = Post {
            id: 7,
            created_at: None,
            urls: vec!["https://a.test".into(), "https://b.test".into()],
        };
        let links: Vec<CandidateLink> = links_from_post(&post).collect();
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].url, "https://b.test");
        assert_eq!(
            links[0].provenance,
            Provenance::Post {
                id: 7,
                created_at: None
            }
        );
    }

    #[test]
    fn missing_historical_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_historical_text(&dir.path().join("absent.txt")), "");
    }
}
