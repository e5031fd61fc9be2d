//! Client-side checks for GSTR CSV uploads.

use std::path::Path;
use std::time::Duration;

use crate::error::ApiError;

/// Delay before re-fetching after an upload. The backend reconciles in the
/// background and gives no completion signal; this is a fixed timer.
pub const REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Columns the backend rejects an upload without.
pub const REQUIRED_COLUMNS: [&str; 5] = ["supplier_gstin", "buyer_gstin", "inv_no", "amount", "status"];

/// Columns the backend stores when present.
pub const OPTIONAL_COLUMNS: [&str; 4] = ["hsn_code", "tax_rate", "period", "invoice_date"];

/// Reject anything that is not a `.csv` file before touching the network.
pub fn validate_upload(path: &Path) -> Result<(), ApiError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(())
    } else {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Err(ApiError::Validation(format!(
            "Only CSV files are accepted ({name} is not a .csv file)."
        )))
    }
}

/// Required columns absent from a CSV header line.
pub fn missing_columns(header_line: &str) -> Vec<&'static str> {
    let present: Vec<String> = header_line
        .trim_start_matches('\u{feff}')
        .split(',')
        .map(|c| c.trim().trim_matches('"').to_ascii_lowercase())
        .collect();
    REQUIRED_COLUMNS
        .into_iter()
        .filter(|req| !present.iter().any(|p| p == req))
        .collect()
}
