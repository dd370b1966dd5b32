// src/enrich/mod.rs
//! DOI enrichment: registry metadata (required) and abstracts (best effort).

pub mod abstracts;
pub mod metadata;

pub use abstracts::AbstractFetcher;
pub use metadata::{MetadataError, MetadataFetcher};

pub const DEFAULT_CROSSREF_BASE: &str = "https://api.crossref.org";
pub const DEFAULT_S2_BASE: &str = "https://api.semanticscholar.org";

pub(crate) fn trim_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}
