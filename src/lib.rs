// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod bootstrap;
pub mod config;
pub mod doi;
pub mod enrich;
pub mod http;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod resolve;
pub mod sink;

// ---- Re-exports for stable public API ----
pub use crate::doi::Doi;
pub use crate::pipeline::{Pipeline, PipelineOptions, RunSummary};
pub use crate::record::{Metadata, OutputRow};
