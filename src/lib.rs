/*!
# Sheet Messenger

A small web service for working through a list of messages kept in a Google Sheet.

## Overview

The operator pastes a spreadsheet link into the browser page. The server checks that
it can read the sheet, then shows its rows (serial number, phone number, message,
status) in a table. Pressing "Send Message" on a row, or "Send All", writes the status
text `Message sent` into column D of that row. No message is actually delivered; the
sheet is the record of what has been handled.

## Architecture

### Frontend Layer
- **Technologies**: HTML, vanilla JavaScript (embedded in the binary)
- Renders the rows and keeps a per-row pending/success flag locally

### Backend Layer
- **Technologies**: Rust, axum, reqwest
- **Core Components**:
  - URL Validator - pulls the spreadsheet identifier out of a pasted link
  - Sheet Store - the single currently selected spreadsheet
  - Sheet Gateway - fixed `Sheet1!A:D` reads and single-cell status writes
  - Sheet Service - the four operations behind the HTTP API
  - Service-account auth - JWT bearer flow against Google's token endpoint

## Modules

- **validator**: spreadsheet identifier extraction
- **store**: selected-sheet register
- **gateway**: Sheets API client, rows and the fixed-range gateway
- **auth**: OAuth2 access tokens for a service account
- **handlers**: request-level operations and their validation
- **config**: environment configuration
- **error**: error kinds shared by every layer
- **app**: routing, CORS and request logging

## REST API Endpoints

- `POST /api/set-sheet-id` - select a spreadsheet by URL
- `GET /api/sheet-data` - read all rows of the selected sheet
- `POST /api/send-message` - mark one row as sent
- `POST /api/send-all-messages` - mark every row as sent, top to bottom
*/

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod store;
pub mod validator;

#[cfg(test)]
mod testing;

pub use error::{Result, SheetError};
