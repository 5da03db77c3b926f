//! Exit codes and structured error output.

use serde::Serialize;

/// Process exit codes.
///
/// - 0: success
/// - 1: general error
/// - 3: partial success (a scan recorded failed or skipped directories)
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Command completed.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// A scan completed but some directories failed.
    PartialSuccess = 3,
    /// Interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "NC000",
            Self::GeneralError => "NC001",
            Self::PartialSuccess => "NC003",
            Self::Interrupted => "NC130",
        }
    }
}

/// Error report printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix, e.g. `NC001`.
    pub code: String,
    /// Numeric exit code.
    pub exit_code: i32,
    /// Message including the error chain.
    pub message: String,
    /// Whether the command was interrupted.
    pub interrupted: bool,
}

impl StructuredError {
    /// Build from an error and the exit code it maps to.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
