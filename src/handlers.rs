use std::sync::Arc;

use log::{error, info, warn};

use crate::error::{Result, SheetError};
use crate::gateway::{Row, RowStatus, SENT_STATUS, SheetGateway, SheetsApi};
use crate::store::SheetStore;
use crate::validator::extract_sheet_id;

/// Why a "mark all sent" run stopped, and how far it got
///
/// Rows written before the failure stay written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Row indices whose status was written before the failure, in order
    pub rows_written: Vec<usize>,
    /// The row whose write failed; `None` when the initial fetch failed
    pub failed_row: Option<usize>,
    pub error: SheetError,
}

/// The operations behind the HTTP API
///
/// Every method validates its input, talks to the gateway and returns an explicit
/// `SheetError` instead of panicking, so the caller can branch on the kind.
#[derive(Clone)]
pub struct SheetService {
    store: Arc<SheetStore>,
    gateway: SheetGateway,
}

impl SheetService {
    pub fn new(store: Arc<SheetStore>, api: Arc<dyn SheetsApi>) -> Self {
        let gateway = SheetGateway::new(api, store.clone());
        Self { store, gateway }
    }

    /// Select the spreadsheet named by `sheet_url`
    ///
    /// Checks happen in order: URL present, identifier extractable, sheet readable.
    /// Nothing touches the network until the URL has yielded an identifier.
    ///
    /// # Returns
    /// * `Result<String>` - The stored identifier
    pub async fn set_sheet_id(&self, sheet_url: Option<&str>) -> Result<String> {
        let sheet_url = sheet_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SheetError::InvalidInput("Sheet URL is required".to_string()))?;

        let sheet_id = extract_sheet_id(sheet_url)
            .ok_or_else(|| SheetError::InvalidInput("Invalid Google Sheets URL".to_string()))?;

        if !self.gateway.probe_access(&sheet_id).await {
            warn!("sheet {} is not accessible", sheet_id);
            return Err(SheetError::AccessDenied(
                "Unable to access sheet. Please check permissions.".to_string(),
            ));
        }

        let replacing = self.store.is_configured();
        self.store.set(&sheet_id).map_err(|_| {
            SheetError::InvalidInput("Failed to set sheet ID: Invalid ID provided".to_string())
        })?;

        if replacing {
            info!("sheet ID replaced, now {}", sheet_id);
        } else {
            info!("sheet ID set to {}", sheet_id);
        }
        Ok(sheet_id)
    }

    pub async fn fetch_rows(&self) -> Result<Vec<Row>> {
        let rows = self.gateway.fetch_rows().await?;
        let pending = rows
            .iter()
            .filter(|row| RowStatus::of(row) == RowStatus::Pending)
            .count();
        info!("fetched {} rows ({} pending)", rows.len(), pending);
        Ok(rows)
    }

    /// Mark one row's message as sent
    ///
    /// All three fields are required and the phone number and message must be
    /// non-empty; the gateway is not called otherwise.
    pub async fn mark_row_sent(
        &self,
        phone_number: Option<&str>,
        message: Option<&str>,
        row_index: Option<usize>,
    ) -> Result<usize> {
        let present = |field: Option<&str>| field.is_some_and(|s| !s.is_empty());
        let row_index = match row_index {
            Some(idx) if present(phone_number) && present(message) => idx,
            _ => {
                return Err(SheetError::InvalidInput(
                    "Phone number, message, and rowIndex are required.".to_string(),
                ));
            }
        };

        self.gateway.write_status(row_index, SENT_STATUS).await?;
        info!("row {} marked as sent", row_index);
        Ok(row_index)
    }

    /// Mark every row of the sheet as sent, one write at a time, top to bottom
    ///
    /// Stops at the first failed write. Earlier writes are not rolled back; the
    /// failure lists them so the caller knows exactly what changed.
    ///
    /// # Returns
    /// * `Result<usize, BatchFailure>` - Number of rows written
    pub async fn mark_all_sent(&self) -> std::result::Result<usize, BatchFailure> {
        let rows = self.gateway.fetch_rows().await.map_err(|error| BatchFailure {
            rows_written: Vec::new(),
            failed_row: None,
            error,
        })?;

        let mut rows_written = Vec::with_capacity(rows.len());
        for row_index in 0..rows.len() {
            if let Err(error) = self.gateway.write_status(row_index, SENT_STATUS).await {
                error!(
                    "sending all messages stopped at row {} after {} writes: {}",
                    row_index,
                    rows_written.len(),
                    error
                );
                return Err(BatchFailure {
                    rows_written,
                    failed_row: Some(row_index),
                    error,
                });
            }
            rows_written.push(row_index);
        }

        info!("all {} rows marked as sent", rows_written.len());
        Ok(rows_written.len())
    }
}
