//! Exit codes and structured error output.

use serde::Serialize;

use crate::engine::EngineError;

/// Process exit codes.
///
/// - 0: Success
/// - 1: General error
/// - 2: Detection found no duplicates
/// - 3: Partial success (some assets skipped, or a scan was cut short)
/// - 4: Fingerprint index missing, outdated or unreadable
/// - 130: Interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Completed normally.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Detection completed but found no duplicates.
    NoDuplicates = 2,
    /// Completed, but some assets could not be processed.
    PartialSuccess = 3,
    /// The fingerprint index must be rebuilt with a scan.
    StaleIndex = 4,
    /// Interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code used in error output.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "PP000",
            Self::GeneralError => "PP001",
            Self::NoDuplicates => "PP002",
            Self::PartialSuccess => "PP003",
            Self::StaleIndex => "PP004",
            Self::Interrupted => "PP130",
        }
    }
}

/// Error report printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "PP001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Build a report from an error and the exit code it maps to.
    #[must_use]
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: message.into(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

/// Exit code for an error returned by [`run_app`](crate::run_app).
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<EngineError>() {
        Some(e) if e.needs_rescan() => ExitCode::StaleIndex,
        _ => ExitCode::GeneralError,
    }
}

/// Message shown for an error returned by [`run_app`](crate::run_app).
///
/// Engine errors use their short user-facing text; anything else prints
/// its full context chain.
#[must_use]
pub fn error_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<EngineError>() {
        Some(e) => e.user_message(),
        None => format!("{:#}", err),
    }
}
