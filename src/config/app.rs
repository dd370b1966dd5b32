// src/config/app.rs
//! Startup configuration: optional TOML file, overridden by environment variables.
//!
//! Lookup order for the file:
//! 1) explicit path (`--config`)
//! 2) $PAPER_FEED_CONFIG
//! 3) config/paper_feed.toml
//!
//! Missing required values are reported together as [`ConfigError::Missing`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::enrich::{DEFAULT_CROSSREF_BASE, DEFAULT_S2_BASE};
use crate::ingest::cursor::DEFAULT_CURSOR_PATH;
use crate::ingest::providers::twitter::DEFAULT_API_BASE;
use crate::record::OutputRow;

pub const ENV_CONFIG_PATH: &str = "PAPER_FEED_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/paper_feed.toml";

pub const DEFAULT_HISTORICAL_FILE: &str = "history.txt";
pub const DEFAULT_START_TIME: &str = "2025-01-01T00:00:00Z";
pub const DEFAULT_PERMALINK_BASE: &str = "https://twitter.com";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("PAPER_FEED_CONFIG points to non-existent path {}", .0.display())]
    NoSuchFile(PathBuf),
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Live,
    Historical,
}

// --- file layout ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub handle: Option<String>,
    pub permalink_base: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub feed: FeedSection,
    pub registry: RegistrySection,
    pub sink: SinkSection,
    pub paths: PathsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    pub bearer_token: Option<String>,
    pub api_base: Option<String>,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub start_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub crossref_base: Option<String>,
    pub mailto: Option<String>,
    pub s2_base: Option<String>,
    pub s2_api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    pub kind: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub access_token: Option<String>,
    pub range: Option<String>,
    pub sheet_gid: Option<i64>,
    pub path: Option<String>,
    pub sort_column: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub cursor: Option<String>,
    pub historical_file: Option<String>,
}

// --- resolved config ---

#[derive(Clone)]
pub struct FeedConfig {
    pub bearer_token: Option<String>,
    pub api_base: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub start_time: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RegistryConfig {
    pub crossref_base: String,
    pub mailto: Option<String>,
    pub s2_base: String,
    pub s2_api_key: Option<String>,
}

#[derive(Clone)]
pub enum SinkTarget {
    Sheets {
        spreadsheet_id: String,
        access_token: String,
        range: String,
        sheet_gid: i64,
    },
    Jsonl {
        path: PathBuf,
    },
}

#[derive(Clone)]
pub struct AppConfig {
    pub handle: String,
    pub permalink_base: String,
    pub http_timeout: Duration,
    pub feed: FeedConfig,
    pub registry: RegistryConfig,
    pub sink: SinkTarget,
    /// Index into [`OutputRow::COLUMNS`].
    pub sort_column: Option<usize>,
    pub cursor_path: PathBuf,
    pub historical_file: PathBuf,
}

impl AppConfig {
    /// Load from file + process environment.
    pub fn load(explicit: Option<&Path>, mode: RunMode) -> Result<Self, ConfigError> {
        let file = load_file(explicit)?;
        Self::from_sources(file, &|k| std::env::var(k).ok(), mode)
    }

    /// Merge file values with `env` (env wins) and validate for `mode`.
    pub fn from_sources(
        file: FileConfig,
        env: &dyn Fn(&str) -> Option<String>,
        mode: RunMode,
    ) -> Result<Self, ConfigError> {
        let pick = |key: &str, fallback: Option<String>| -> Option<String> {
            env(key)
                .or(fallback)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        // Numeric overrides: blank counts as unset, like `pick`.
        let env_num = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let mut missing: Vec<&'static str> = Vec::new();

        let handle = pick("PAPER_FEED_HANDLE", file.handle)
            .map(|h| h.trim_start_matches('@').to_string());
        if handle.is_none() {
            missing.push("PAPER_FEED_HANDLE");
        }

        let bearer_token = pick("TW_BEARER_TOKEN", file.feed.bearer_token);
        if mode == RunMode::Live && bearer_token.is_none() {
            missing.push("TW_BEARER_TOKEN");
        }

        let kind = pick("SINK_KIND", file.sink.kind).unwrap_or_else(|| "sheets".to_string());
        let sink = match kind.to_ascii_lowercase().as_str() {
            "sheets" => {
                let id = pick("SHEETS_SPREADSHEET_ID", file.sink.spreadsheet_id);
                let token = pick("SHEETS_ACCESS_TOKEN", file.sink.access_token);
                if id.is_none() {
                    missing.push("SHEETS_SPREADSHEET_ID");
                }
                if token.is_none() {
                    missing.push("SHEETS_ACCESS_TOKEN");
                }
                let sheet_gid = match env_num("SHEETS_SHEET_GID") {
                    Some(raw) => parse_num("SHEETS_SHEET_GID", &raw)?,
                    None => file.sink.sheet_gid.unwrap_or(0),
                };
                id.zip(token).map(|(spreadsheet_id, access_token)| SinkTarget::Sheets {
                    spreadsheet_id,
                    access_token,
                    range: pick("SHEETS_RANGE", file.sink.range)
                        .unwrap_or_else(|| "Sheet1".to_string()),
                    sheet_gid,
                })
            }
            "jsonl" => {
                let path = pick("SINK_PATH", file.sink.path);
                if path.is_none() {
                    missing.push("SINK_PATH");
                }
                path.map(|p| SinkTarget::Jsonl { path: p.into() })
            }
            other => {
                return Err(ConfigError::Invalid {
                    key: "SINK_KIND",
                    reason: format!("unknown sink kind {other:?} (expected sheets|jsonl)"),
                })
            }
        };

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }
        let (Some(handle), Some(sink)) = (handle, sink) else {
            return Err(ConfigError::Missing(vec!["PAPER_FEED_HANDLE"]));
        };

        let sort_column = match pick("SORT_COLUMN", file.sink.sort_column) {
            Some(name) => Some(OutputRow::column_index(&name).ok_or_else(|| {
                ConfigError::Invalid {
                    key: "SORT_COLUMN",
                    reason: format!(
                        "{name:?} is not one of {}",
                        OutputRow::COLUMNS.join(", ")
                    ),
                }
            })?),
            None => None,
        };

        let start_raw = pick("LIVE_START_TIME", file.feed.start_time)
            .unwrap_or_else(|| DEFAULT_START_TIME.to_string());
        let start_time = DateTime::parse_from_rfc3339(&start_raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ConfigError::Invalid {
                key: "LIVE_START_TIME",
                reason: e.to_string(),
            })?;

        let page_size = match env_num("PAGE_SIZE") {
            Some(raw) => parse_num("PAGE_SIZE", &raw)?,
            None => file.feed.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
        .clamp(5, 100);
        let max_pages = match env_num("MAX_PAGES") {
            Some(raw) => parse_num("MAX_PAGES", &raw)?,
            None => file.feed.max_pages.unwrap_or(1),
        }
        .max(1);
        let timeout_secs = match env_num("HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_num("HTTP_TIMEOUT_SECS", &raw)?,
            None => file.http_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
        .max(1);

        Ok(AppConfig {
            handle,
            permalink_base: pick("PERMALINK_BASE", file.permalink_base)
                .unwrap_or_else(|| DEFAULT_PERMALINK_BASE.to_string()),
            http_timeout: Duration::from_secs(timeout_secs),
            feed: FeedConfig {
                bearer_token,
                api_base: pick("TW_API_BASE", file.feed.api_base)
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                page_size,
                max_pages,
                start_time,
            },
            registry: RegistryConfig {
                crossref_base: pick("CROSSREF_BASE", file.registry.crossref_base)
                    .unwrap_or_else(|| DEFAULT_CROSSREF_BASE.to_string()),
                mailto: pick("CROSSREF_MAILTO", file.registry.mailto),
                s2_base: pick("S2_BASE", file.registry.s2_base)
                    .unwrap_or_else(|| DEFAULT_S2_BASE.to_string()),
                s2_api_key: pick("S2_API_KEY", file.registry.s2_api_key),
            },
            sink,
            sort_column,
            cursor_path: pick("CURSOR_PATH", file.paths.cursor)
                .unwrap_or_else(|| DEFAULT_CURSOR_PATH.to_string())
                .into(),
            historical_file: pick("HISTORICAL_FILE", file.paths.historical_file)
                .unwrap_or_else(|| DEFAULT_HISTORICAL_FILE.to_string())
                .into(),
        })
    }

    /// One startup line; secrets appear as lengths only.
    pub fn log_summary(&self) {
        let sink = match &self.sink {
            SinkTarget::Sheets {
                spreadsheet_id,
                access_token,
                range,
                ..
            } => format!(
                "sheets id={spreadsheet_id} range={range} token_len={}",
                access_token.len()
            ),
            SinkTarget::Jsonl { path } => format!("jsonl path={}", path.display()),
        };
        tracing::info!(
            handle = %self.handle,
            bearer_len = self.feed.bearer_token.as_deref().map(str::len).unwrap_or(0),
            s2_key = self.registry.s2_api_key.is_some(),
            %sink,
            cursor = %self.cursor_path.display(),
            "config loaded"
        );
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

/// Resolve and parse the optional TOML file. No file at all is an empty config.
pub fn load_file(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    if let Some(p) = explicit {
        return parse_file(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return parse_file(&pb);
        }
        return Err(ConfigError::NoSuchFile(pb));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return parse_file(&default);
    }
    Ok(FileConfig::default())
}

fn parse_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
