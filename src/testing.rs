//! In-memory `SheetsApi` used by the gateway, handler and router tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SheetError};
use crate::gateway::SheetsApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get {
        sheet_id: String,
        range: String,
    },
    Update {
        sheet_id: String,
        range: String,
        value: String,
    },
}

pub struct FakeSheets {
    rows: Vec<Vec<String>>,
    readable: bool,
    // 0-based position (among update calls) of the write that fails
    fail_update_at: Option<usize>,
    calls: Mutex<Vec<Call>>,
}

impl FakeSheets {
    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            readable: true,
            fail_update_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreadable(mut self) -> Self {
        self.readable = false;
        self
    }

    pub fn failing_update_at(mut self, nth: usize) -> Self {
        self.fail_update_at = Some(nth);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update { range, .. } => Some(range),
                Call::Get { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn get_values(&self, sheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
        self.calls.lock().unwrap().push(Call::Get {
            sheet_id: sheet_id.to_string(),
            range: range.to_string(),
        });
        if !self.readable {
            return Err(SheetError::Upstream(
                "The caller does not have permission".to_string(),
            ));
        }
        Ok(self.rows.clone())
    }

    async fn update_value(&self, sheet_id: &str, range: &str, value: &str) -> Result<()> {
        let mut calls = self.calls.lock().unwrap();
        let nth = calls
            .iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .count();
        calls.push(Call::Update {
            sheet_id: sheet_id.to_string(),
            range: range.to_string(),
            value: value.to_string(),
        });
        if self.fail_update_at == Some(nth) {
            return Err(SheetError::Upstream("Quota exceeded".to_string()));
        }
        Ok(())
    }
}
