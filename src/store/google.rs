use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::schema;
use crate::store::traits::SpreadsheetStore;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 REST backend authenticated with a bearer token
pub struct GoogleSheetsStore {
    client: Client,
    base_url: Url,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl GoogleSheetsStore {
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = Url::parse(API_BASE).context("Invalid Sheets API URL")?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Backend(format!("cannot build URL from {}", self.base_url)))?
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response, StoreError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("{}: {}", what, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 400 && body.contains("Unable to parse range") {
            return Err(StoreError::SheetNotFound(what.to_string()));
        }
        Err(StoreError::from_response(status.as_u16(), &body))
    }

    async fn add_sheet(&self, container_id: &str, sheet: &str) -> Result<(), StoreError> {
        let url = self.url(&[format!("{}:batchUpdate", container_id).as_str()])?;
        let body = json!({ "requests": [{ "addSheet": { "properties": { "title": sheet } } }] });
        self.send(self.client.post(url).json(&body), "addSheet").await?;
        info!(sheet, "📄 Created sheet");
        Ok(())
    }
}

#[async_trait]
impl SpreadsheetStore for GoogleSheetsStore {
    async fn append_row(&self, container_id: &str, sheet: &str, row: &[String]) -> Result<(), StoreError> {
        let range = schema::range(sheet, "A1");
        let url = self.url(&[container_id, "values", format!("{}:append", range).as_str()])?;
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }));

        self.send(request, &range).await?;
        debug!(sheet, "Appended row");
        Ok(())
    }

    async fn read_range(&self, container_id: &str, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.url(&[container_id, "values", range])?;
        let response = self.send(self.client.get(url), range).await?;
        let values: ValueRange = response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("invalid values response: {}", e)))?;

        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn list_sheet_names(&self, container_id: &str) -> Result<Vec<String>, StoreError> {
        let url = self.url(&[container_id])?;
        let request = self.client.get(url).query(&[("fields", "sheets.properties.title")]);
        let response = self.send(request, "spreadsheet metadata").await?;
        let meta: SpreadsheetMeta = response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("invalid metadata response: {}", e)))?;

        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn ensure_sheet_exists(&self, container_id: &str, sheet: &str) -> Result<bool, StoreError> {
        let names = self.list_sheet_names(container_id).await?;
        if names.iter().any(|name| name == sheet) {
            return Ok(false);
        }
        self.add_sheet(container_id, sheet).await?;
        Ok(true)
    }

    async fn update_row(
        &self,
        container_id: &str,
        sheet: &str,
        row_number: usize,
        row: &[String],
    ) -> Result<(), StoreError> {
        let range = schema::range(sheet, &format!("A{}", row_number));
        let url = self.url(&[container_id, "values", range.as_str()])?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "range": range, "values": [row] }));

        self.send(request, &range).await?;
        Ok(())
    }
}
