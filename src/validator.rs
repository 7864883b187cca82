use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Identifier follows the `/d/` path segment; anything shorter than 25 chars is noise.
    // ASCII word characters only.
    static ref SHEET_ID_REGEX: Regex = Regex::new(r"/d/([-A-Za-z0-9_]{25,})").unwrap();
}

/// Extract the spreadsheet identifier from a Google Sheets URL
///
/// Pure string matching, no network access. The first `/d/<id>` occurrence wins.
///
/// # Arguments
/// * `url` - Any string the operator pasted
///
/// # Returns
/// * `Option<String>` - The identifier, or `None` when the pattern does not match
///
/// # Examples
/// ```
/// use sheet_messenger::validator::extract_sheet_id;
///
/// let url = "https://docs.google.com/spreadsheets/d/1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms/edit";
/// assert_eq!(
///     extract_sheet_id(url).as_deref(),
///     Some("1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms")
/// );
/// assert_eq!(extract_sheet_id("https://example.com/sheet"), None);
/// ```
pub fn extract_sheet_id(url: &str) -> Option<String> {
    SHEET_ID_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
