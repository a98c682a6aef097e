//! Process exit codes
//!
//! Codes are stable so scripts can branch on them.

use stow_core::{BulkReport, BulkStatus, ErrorKind, OperationOutcome};

/// Exit code returned by every command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments, invalid names or configuration
    UsageError = 2,
    /// Network failure, timeout or throttling that outlasted retries
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
    Conflict = 6,
}

impl ExitCode {
    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => Self::Success,
            2 => Self::UsageError,
            3 => Self::NetworkError,
            4 => Self::AuthError,
            5 => Self::NotFound,
            6 => Self::Conflict,
            _ => Self::GeneralError,
        }
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Conflict => Self::Conflict,
            ErrorKind::Unauthorized => Self::AuthError,
            ErrorKind::Throttled | ErrorKind::Transient => Self::NetworkError,
            ErrorKind::Fatal => Self::GeneralError,
        }
    }

    pub fn from_outcome(outcome: &OperationOutcome) -> Self {
        outcome.error().map_or(Self::Success, Self::from_kind)
    }

    /// Exit code for a finished bulk call: success only when it is clean.
    ///
    /// When every failure shares a kind that kind picks the code.
    pub fn from_report(report: &BulkReport) -> Self {
        if report.status == BulkStatus::Aborted {
            return Self::AuthError;
        }
        if report.is_clean() {
            return Self::Success;
        }

        let mut kinds = report.failed.iter().map(|item| item.kind);
        match kinds.next() {
            Some(first) if kinds.all(|k| k == first) => Self::from_kind(first),
            _ => Self::GeneralError,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
