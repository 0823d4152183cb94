// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error taxonomy for the server plugin.
//!
//! Every operation on the item catalog, the event space and the browse
//! navigator returns an [`OpcResult`]. The error variants map one-to-one onto
//! the status taxonomy exchanged with the host ([`Status`]), so a failure can
//! be reported back through the gateway without losing its class.
//!
//! # Examples
//!
//! ```
//! use opcsim_core::error::{OpcError, Status};
//!
//! let error = OpcError::conflict("item", "CTT.SimpleTypes.In.Boolean");
//! assert_eq!(error.status(), Status::Conflict);
//! assert!(!error.is_fatal());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Status
// =============================================================================

/// Result status reported to the host for every gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The operation completed.
    Success,
    /// The feature is disabled or not implemented.
    NotSupported,
    /// Malformed name, out-of-range id or reserved id reuse.
    InvalidArgument,
    /// Duplicate id or name.
    Conflict,
    /// Unknown handle or id.
    NotFound,
    /// Allocation failure.
    ResourceExhausted,
    /// A required precondition does not hold.
    PreconditionFailed,
    /// The request is well formed but cannot be performed.
    Fail,
    /// The requested datum does not apply to the target.
    NotApplicable,
    /// Unrecoverable internal error.
    Fatal,
}

impl Status {
    /// Returns `true` for [`Status::Success`].
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns the status as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::NotSupported => "not_supported",
            Status::InvalidArgument => "invalid_argument",
            Status::Conflict => "conflict",
            Status::NotFound => "not_found",
            Status::ResourceExhausted => "resource_exhausted",
            Status::PreconditionFailed => "precondition_failed",
            Status::Fail => "fail",
            Status::NotApplicable => "not_applicable",
            Status::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<T> From<&OpcResult<T>> for Status {
    fn from(result: &OpcResult<T>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }
}

// =============================================================================
// OpcError
// =============================================================================

/// Errors raised by plugin operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpcError {
    /// The requested feature is disabled or not implemented.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// The operation that was requested.
        operation: String,
    },

    /// An argument was malformed or out of range.
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument {
        /// The offending argument.
        argument: String,
        /// Error message.
        message: String,
    },

    /// An id or name is already registered in its namespace.
    #[error("Duplicate {kind}: {id}")]
    Conflict {
        /// Namespace of the duplicate (item, category, area, ...).
        kind: &'static str,
        /// The duplicated id or name.
        id: String,
    },

    /// A handle or id does not exist.
    #[error("Unknown {kind}: {id}")]
    NotFound {
        /// Namespace that was searched.
        kind: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// A resource limit was hit.
    #[error("Resource exhausted: {message}")]
    ResourceExhausted {
        /// Error message.
        message: String,
    },

    /// A precondition for the operation does not hold.
    #[error("Precondition failed: {message}")]
    PreconditionFailed {
        /// Error message.
        message: String,
    },

    /// The operation cannot be performed in the current state.
    #[error("Operation failed: {message}")]
    Fail {
        /// Error message.
        message: String,
    },

    /// The requested datum does not apply to the target.
    #[error("Not applicable: {message}")]
    NotApplicable {
        /// Error message.
        message: String,
    },

    /// An unrecoverable internal error.
    #[error("Fatal error: {message}")]
    Fatal {
        /// Error message.
        message: String,
    },
}

impl OpcError {
    /// Creates a not-supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Creates an invalid-argument error.
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::Conflict {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Creates a resource-exhausted error.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
        }
    }

    /// Creates a precondition-failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            message: message.into(),
        }
    }

    /// Creates a generic failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail {
            message: message.into(),
        }
    }

    /// Creates a not-applicable error.
    pub fn not_applicable(message: impl Into<String>) -> Self {
        Self::NotApplicable {
            message: message.into(),
        }
    }

    /// Creates a fatal error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Returns the status reported to the host for this error.
    pub fn status(&self) -> Status {
        match self {
            OpcError::NotSupported { .. } => Status::NotSupported,
            OpcError::InvalidArgument { .. } => Status::InvalidArgument,
            OpcError::Conflict { .. } => Status::Conflict,
            OpcError::NotFound { .. } => Status::NotFound,
            OpcError::ResourceExhausted { .. } => Status::ResourceExhausted,
            OpcError::PreconditionFailed { .. } => Status::PreconditionFailed,
            OpcError::Fail { .. } => Status::Fail,
            OpcError::NotApplicable { .. } => Status::NotApplicable,
            OpcError::Fatal { .. } => Status::Fatal,
        }
    }

    /// Returns `true` if the error must stop the server.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, OpcError::Fatal { .. })
    }

    /// Returns `false`; retry policy belongs to the host.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        self.status().as_str()
    }
}

/// Result type alias for plugin operations.
pub type OpcResult<T> = Result<T, OpcError>;

// =============================================================================
// Tests
// =============================================================================
