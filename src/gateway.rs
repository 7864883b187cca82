use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error};
use serde::{Deserialize, Serialize, Serializer};

use crate::auth::TokenSource;
use crate::error::{Result, SheetError};
use crate::store::SheetStore;

pub const SHEET_NAME: &str = "Sheet1";
pub const DATA_RANGE: &str = "Sheet1!A:D";
pub const PROBE_RANGE: &str = "Sheet1!A1:A1";
pub const STATUS_COLUMN: &str = "D";

/// Status text written into column D once a row's message counts as sent
pub const SENT_STATUS: &str = "Message sent";

/// One line of the messaging sheet: serial, phone number, message, status
///
/// Serialized as a plain 4-element array, the shape the browser table expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub serial: String,
    pub phone_number: String,
    pub message: String,
    pub status: String,
}

impl Row {
    /// Build a row from raw cells; the API drops trailing empty cells, so pad them back
    pub fn from_cells(cells: Vec<String>) -> Self {
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();
        Row {
            serial: next(),
            phone_number: next(),
            message: next(),
            status: next(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        [
            &self.serial,
            &self.phone_number,
            &self.message,
            &self.status,
        ]
        .serialize(serializer)
    }
}

/// Whether a row still needs its message marked as sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Pending,
    Success,
}

impl RowStatus {
    pub fn of(row: &Row) -> Self {
        if row.status == SENT_STATUS {
            RowStatus::Success
        } else {
            RowStatus::Pending
        }
    }
}

/// Cell-level access to a remote spreadsheet service
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read a range; rows come back in sheet order, possibly ragged
    async fn get_values(&self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Write a single value, interpreted as if a user typed it
    async fn update_value(&self, sheet_id: &str, range: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn extract_api_error(body: &serde_json::Value, status: u16) -> String {
    body["error"]["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// Google Sheets v4 REST client (`spreadsheets.values.get` / `values.update`)
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleSheetsClient {
    pub fn new(http: reqwest::Client, base_url: String, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            base_url,
            tokens,
        }
    }

    fn values_url(&self, sheet_id: &str, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(sheet_id),
            urlencoding::encode(range)
        )
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        Err(SheetError::Upstream(extract_api_error(
            &body,
            status.as_u16(),
        )))
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn get_values(&self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(self.values_url(sheet_id, range))
            .bearer_auth(token)
            .send()
            .await?;

        let body: ValueRange = Self::check(resp).await?.json().await?;
        Ok(body
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn update_value(&self, sheet_id: &str, range: &str, value: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [[value]],
        });

        let resp = self
            .http
            .put(self.values_url(sheet_id, range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        Self::check(resp).await?;
        Ok(())
    }
}

/// The fixed `Sheet1!A:D` view of whichever spreadsheet the store points at
#[derive(Clone)]
pub struct SheetGateway {
    api: Arc<dyn SheetsApi>,
    store: Arc<SheetStore>,
}

impl SheetGateway {
    pub fn new(api: Arc<dyn SheetsApi>, store: Arc<SheetStore>) -> Self {
        Self { api, store }
    }

    /// Status cell for a 0-based row index (the sheet itself counts from 1)
    ///
    /// # Errors
    /// * `SheetError::InvalidInput` if the index has no 1-based row number
    pub fn status_cell(row_index: usize) -> Result<String> {
        let row = row_index.checked_add(1).ok_or_else(|| {
            SheetError::InvalidInput(format!("Row index {} is out of range", row_index))
        })?;
        Ok(format!("{}!{}{}", SHEET_NAME, STATUS_COLUMN, row))
    }

    /// Read every row of the configured sheet
    ///
    /// # Errors
    /// * `SheetError::NotConfigured` if no sheet has been selected
    /// * `SheetError::Upstream` if the read fails
    pub async fn fetch_rows(&self) -> Result<Vec<Row>> {
        let sheet_id = self.store.get()?;
        let values = self
            .api
            .get_values(&sheet_id, DATA_RANGE)
            .await
            .inspect_err(|e| error!("Error fetching Google Sheet data: {}", e))?;
        Ok(values.into_iter().map(Row::from_cells).collect())
    }

    /// Write `status` into column D of the given 0-based row
    pub async fn write_status(&self, row_index: usize, status: &str) -> Result<()> {
        let sheet_id = self.store.get()?;
        let cell = Self::status_cell(row_index)?;
        self.api
            .update_value(&sheet_id, &cell, status)
            .await
            .inspect_err(|e| error!("Error updating Google Sheet status at {}: {}", cell, e))
    }

    /// Try a one-cell read against `sheet_id`; any failure means "not accessible"
    pub async fn probe_access(&self, sheet_id: &str) -> bool {
        match self.api.get_values(sheet_id, PROBE_RANGE).await {
            Ok(_) => true,
            Err(e) => {
                debug!("access probe for {} failed: {}", sheet_id, e);
                false
            }
        }
    }
}
