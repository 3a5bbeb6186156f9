// ABOUTME: Unified error type for the gateway with kind-based HTTP status mapping
// ABOUTME: Distinguishes user faults, security-relevant faults, and broker/store failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Vaultgate Project

//! # Error Handling
//!
//! Every fallible operation in the gateway returns an [`ApiError`] carrying
//! one of a closed set of [`ErrorKind`]s. The core (broker, token service,
//! gateway operations) never writes HTTP responses itself; the route layer
//! is solely responsible for mapping kind to status code and message, and
//! internal causes never leak into user-visible messages.

use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Closed set of failure kinds the gateway can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-caused and expected: unknown key, expired token. Not logged.
    UserFault,
    /// Caller-caused but security-relevant: replay, forged signature,
    /// address not on the allow-list. Always logged.
    UserFaultNeedsLog,
    /// Our own failure: signing misconfiguration, malformed internal state.
    ServerFault,
    /// Completion deadline exceeded while waiting on a brokered job.
    TimedOut,
    /// Admission deadline exceeded; the job was never executed.
    NoCapacity,
    /// Internal consistency violation, e.g. a result channel closed without
    /// a value. Signals a broker bug, not caller error.
    UnexpectedValue,
    /// Backing-store query or parse failure.
    DatabaseFailed,
    /// A non-admin attempted a privileged action; their key was revoked.
    PrivilegeViolation,
}

impl ErrorKind {
    /// HTTP status the route layer responds with for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::UserFault | Self::UserFaultNeedsLog => StatusCode::UNAUTHORIZED,
            Self::ServerFault | Self::UnexpectedValue | Self::DatabaseFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::TimedOut => StatusCode::REQUEST_TIMEOUT,
            Self::NoCapacity => StatusCode::SERVICE_UNAVAILABLE,
            Self::PrivilegeViolation => StatusCode::IM_A_TEAPOT,
        }
    }

    /// Whether an error of this kind must be logged. Plain user faults are
    /// expected traffic and stay silent; everything else is worth a line.
    #[must_use]
    pub const fn should_log(self) -> bool {
        !matches!(self, Self::UserFault)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserFault => "user-fault",
            Self::UserFaultNeedsLog => "user-fault-needs-log",
            Self::ServerFault => "server-fault",
            Self::TimedOut => "timed-out",
            Self::NoCapacity => "no-capacity",
            Self::UnexpectedValue => "unexpected-value",
            Self::DatabaseFailed => "database-failed",
            Self::PrivilegeViolation => "privilege-violation",
        };
        f.write_str(name)
    }
}

/// Error returned by gateway operations.
///
/// The message is user-safe and may be echoed back in a response body; the
/// optional source is for diagnostics only and goes to the logs.
#[derive(Debug, Error)]
#[error("{message} ({kind})")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Convenience alias used throughout the crate.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Build an error of an arbitrary kind with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build an error of an arbitrary kind without a cause.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Expected caller error, e.g. an unknown authentication key.
    pub fn user_fault(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UserFault, message)
    }

    /// Security-relevant caller error, e.g. a detected token replay.
    pub fn user_fault_logged(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UserFaultNeedsLog, message)
    }

    /// Our own failure with an underlying cause.
    pub fn server_fault(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::with_source(ErrorKind::ServerFault, message, source)
    }

    /// Completion deadline exceeded.
    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimedOut, message)
    }

    /// Admission deadline exceeded.
    pub fn no_capacity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoCapacity, message)
    }

    /// Internal consistency violation; always alerted on.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedValue, message)
    }

    /// Backing-store failure with the store error attached.
    pub fn database(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::with_source(ErrorKind::DatabaseFailed, message, source)
    }

    /// Privilege violation after the punitive key revocation.
    pub fn privilege_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PrivilegeViolation, message)
    }

    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The user-safe message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Whether this error must be logged.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        self.kind.should_log()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_kind() {
        assert_eq!(
            ApiError::user_fault("bad key").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::user_fault_logged("replay").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::timed_out("slow").status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ApiError::no_capacity("full").status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::unexpected("closed channel").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::privilege_violation("revoked").status_code(),
            StatusCode::IM_A_TEAPOT
        );
    }

    #[test]
    fn only_plain_user_faults_stay_silent() {
        assert!(!ApiError::user_fault("unknown key").should_log());
        assert!(ApiError::user_fault_logged("replay").should_log());
        assert!(ApiError::timed_out("slow").should_log());
        assert!(ApiError::unexpected("bug").should_log());
    }

    #[test]
    fn message_excludes_source() {
        let io = std::io::Error::other("disk exploded");
        let err = ApiError::server_fault("cannot sign token", io);
        assert_eq!(err.message(), "cannot sign token");
        assert!(!err.message().contains("disk"));
    }
}
