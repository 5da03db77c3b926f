//! JSON output for catalog results.
//!
//! Listings, entry details and statistics serialize as-is. Scan reports are
//! wrapped with the exit code they produced:
//!
//! ```json
//! {
//!   "report": { "root": "Manga", "processed": 42, "failed": 0, ... },
//!   "exitCode": 0,
//!   "exitCodeName": "NC000"
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::error::ExitCode;
use crate::scanner::ScanReport;

/// Scan report plus exit code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonScanOutput<'a> {
    /// The finished scan.
    pub report: &'a ScanReport,
    /// Numeric exit code.
    pub exit_code: i32,
    /// Machine-readable exit code name (e.g. "NC003").
    pub exit_code_name: &'static str,
}

impl<'a> JsonScanOutput<'a> {
    /// Wrap a report.
    #[must_use]
    pub fn new(report: &'a ScanReport, exit_code: ExitCode) -> Self {
        Self {
            report,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON output: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `value` as JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}
