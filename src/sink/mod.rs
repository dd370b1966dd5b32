// src/sink/mod.rs
//! Row sinks: where assembled rows end up.

pub mod jsonl;
pub mod sheets;

use anyhow::Result;
use std::sync::Mutex;

pub use jsonl::JsonlSink;
pub use sheets::SheetsSink;

#[async_trait::async_trait]
pub trait RowSink: Send + Sync {
    /// Append one row of cells, in column order.
    async fn append_row(&self, cells: &[String]) -> Result<()>;
    /// Re-sort persisted rows by `column`, descending.
    async fn sort_desc(&self, column: usize) -> Result<()>;
    fn name(&self) -> &'static str;
}

// --- Test helper ---
#[derive(Default)]
pub struct MemorySink {
    pub rows: Mutex<Vec<Vec<String>>>,
    pub sorts: Mutex<Vec<usize>>,
    /// Appends whose cells contain this text are rejected.
    pub reject_containing: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(needle: &str) -> Self {
        Self {
            reject_containing: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RowSink for MemorySink {
    async fn append_row(&self, cells: &[String]) -> Result<()> {
        if let Some(needle) = &self.reject_containing {
            if cells.iter().any(|c| c.contains(needle.as_str())) {
                anyhow::bail!("memory sink rejected row containing {needle:?}");
            }
        }
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push(cells.to_vec());
        Ok(())
    }

    async fn sort_desc(&self, column: usize) -> Result<()> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?;
        rows.sort_by(|a, b| b.get(column).cmp(&a.get(column)));
        self.sorts
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push(column);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
