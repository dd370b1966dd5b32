// src/ingest/cursor.rs
//! Live-feed cursor: id of the newest post observed by the last live pass.
//!
//! Policy is last-write-wins. `advance` stores whatever it is given, even an id
//! smaller than the current one; there is no max-merge.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_CURSOR_PATH: &str = "state/since_id.txt";

pub trait CursorStore: Send {
    /// `Ok(None)` only when no cursor has been stored yet.
    fn read(&self) -> Result<Option<u64>>;
    /// Persist `candidate` if present. `None` leaves the stored value alone.
    fn advance(&mut self, candidate: Option<u64>) -> Result<()>;
}

/// Plain-text file holding one decimal id, replaced atomically via rename.
#[derive(Debug, Clone)]
pub struct FileCursor {
    path: PathBuf,
}

impl FileCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "cursor".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CursorStore for FileCursor {
    fn read(&self) -> Result<Option<u64>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading cursor {}", self.path.display()))
            }
        };
        let id = raw.trim().parse::<u64>().with_context(|| {
            format!(
                "cursor {} holds {:?}, not a post id",
                self.path.display(),
                raw.trim()
            )
        })?;
        Ok(Some(id))
    }

    fn advance(&mut self, candidate: Option<u64>) -> Result<()> {
        let Some(id) = candidate else {
            return Ok(());
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating cursor dir {}", dir.display()))?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, id.to_string())
            .with_context(|| format!("writing cursor temp file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing cursor file {}", self.path.display()))?;
        tracing::debug!(since_id = id, "cursor advanced");
        Ok(())
    }
}

/// In-process cursor, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryCursor {
    pub value: Option<u64>,
    pub writes: usize,
}

impl CursorStore for MemoryCursor {
    fn read(&self) -> Result<Option<u64>> {
        Ok(self.value)
    }

    fn advance(&mut self, candidate: Option<u64>) -> Result<()> {
        if let Some(id) = candidate {
            self.value = Some(id);
            self.writes += 1;
        }
        Ok(())
    }
}
