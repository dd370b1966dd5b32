// src/sink/sheets.rs
//! Google Sheets v4 sink. Takes a pre-issued OAuth access token; minting one is the
//! operator's job.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::RowSink;

pub const DEFAULT_SHEETS_BASE: &str = "https://sheets.googleapis.com";

#[derive(Clone)]
pub struct SheetsSink {
    client: Client,
    base: String,
    spreadsheet_id: String,
    access_token: String,
    /// A1 range used for appends, e.g. "Sheet1".
    range: String,
    /// Numeric sheet id (gid) used for sorting.
    sheet_gid: i64,
}

impl SheetsSink {
    pub fn new(
        spreadsheet_id: String,
        access_token: String,
        range: String,
        sheet_gid: i64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building sheets client")?;
        Ok(Self {
            client,
            base: DEFAULT_SHEETS_BASE.to_string(),
            spreadsheet_id,
            access_token,
            range,
            sheet_gid,
        })
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.base = base.trim().trim_end_matches('/').to_string();
        self
    }

    fn append_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.base, self.spreadsheet_id, self.range
        )
    }

    fn batch_update_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.base, self.spreadsheet_id
        )
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<()> {
        let rsp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .json(body)
            .send()
            .await
            .context("sheets request")?;
        let status = rsp.status();
        if !status.is_success() {
            let detail = rsp.text().await.unwrap_or_default();
            return Err(anyhow!("sheets HTTP error {status}: {}", detail.trim()));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ValueRange<'a> {
    values: [&'a [String]; 1],
}

#[async_trait]
impl RowSink for SheetsSink {
    async fn append_row(&self, cells: &[String]) -> Result<()> {
        let body = ValueRange { values: [cells] };
        self.post(
            &self.append_url(),
            &[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ],
            &body,
        )
        .await
    }

    async fn sort_desc(&self, column: usize) -> Result<()> {
        let body = sort_request(self.sheet_gid, column);
        self.post(&self.batch_update_url(), &[], &body).await
    }

    fn name(&self) -> &'static str {
        "sheets"
    }
}

/// `batchUpdate` body sorting every row below the header by `column`, descending.
fn sort_request(sheet_gid: i64, column: usize) -> serde_json::Value {
    serde_json::json!({
        "requests": [{
            "sortRange": {
                "range": { "sheetId": sheet_gid, "startRowIndex": 1 },
                "sortSpecs": [{ "dimensionIndex": column, "sortOrder": "DESCENDING" }]
            }
        }]
    })
}
