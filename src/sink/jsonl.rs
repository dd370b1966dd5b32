// src/sink/jsonl.rs
//! Local file sink: one JSON array of cells per line.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::RowSink;

pub struct JsonlSink {
    path: PathBuf,
    // serializes append vs. rewrite
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating sink dir {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Parse a JSONL sink file. Blank lines are skipped.
pub fn parse_rows(content: &str) -> Result<Vec<Vec<String>>> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str::<Vec<String>>(line)
                .with_context(|| format!("sink line {} is not a row", i + 1))
        })
        .collect()
}

#[async_trait]
impl RowSink for JsonlSink {
    async fn append_row(&self, cells: &[String]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.ensure_parent().await?;
        let mut line = serde_json::to_string(cells).context("encoding row")?;
        line.push('\n');
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening sink {}", self.path.display()))?;
        f.write_all(line.as_bytes())
            .await
            .context("appending row")?;
        f.flush().await.context("flushing sink")?;
        Ok(())
    }

    async fn sort_desc(&self, column: usize) -> Result<()> {
        let _guard = self.lock.lock().await;
        let content = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).context("reading sink for sort"),
        };
        let mut rows = parse_rows(&content)?;
        rows.sort_by(|a, b| b.get(column).cmp(&a.get(column)));

        let mut out = String::with_capacity(content.len());
        for row in &rows {
            out.push_str(&serde_json::to_string(row).context("encoding row")?);
            out.push('\n');
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, out).await.context("writing sorted sink")?;
        fs::rename(&tmp, &self.path)
            .await
            .context("replacing sink with sorted copy")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}
