use axum::http::StatusCode;
use thiserror::Error;

/// Failure kinds shared by the store, the gateway and the request handlers
///
/// Every handler returns one of these instead of panicking; the HTTP layer turns
/// them into a `{ success: false, ... }` body with the matching status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetError {
    /// Malformed or missing request fields, or a URL with no sheet identifier
    #[error("{0}")]
    InvalidInput(String),

    /// An operation needed a sheet identifier before one was set
    #[error("{0}")]
    NotConfigured(String),

    /// The identifier was parsed but the sheet could not be read
    #[error("{0}")]
    AccessDenied(String),

    /// The Sheets API (or the token endpoint) failed during a read or write
    #[error("{0}")]
    Upstream(String),
}

impl SheetError {
    /// Stable snake-case name, reported to clients alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            SheetError::InvalidInput(_) => "invalid_input",
            SheetError::NotConfigured(_) => "not_configured",
            SheetError::AccessDenied(_) => "access_denied",
            SheetError::Upstream(_) => "upstream_failure",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SheetError::InvalidInput(_) | SheetError::AccessDenied(_) => StatusCode::BAD_REQUEST,
            SheetError::NotConfigured(_) | SheetError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for SheetError {
    fn from(e: reqwest::Error) -> Self {
        SheetError::Upstream(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
