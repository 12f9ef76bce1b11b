//! Error types for snapshot loading and access resolution.
//!
//! Load-time errors abort the in-progress load and leave any previously
//! published policy state untouched. Resolution-time errors are local to the
//! single check that raised them.

use std::fmt;

/// Errors that can occur while loading a policy snapshot or resolving access.
///
/// The type is `Clone` so that the outcome of one shared in-flight load can be
/// handed to every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RbacError {
    /// The remote source reports that no policy document has been published.
    ///
    /// The loader maps this to an empty policy; it only reaches callers of
    /// [`SnapshotSource::fetch`](crate::source::SnapshotSource::fetch).
    #[error("Policy snapshot not found")]
    SnapshotNotFound,

    /// A transport-level failure while fetching the snapshot.
    #[error("Snapshot fetch failed: {message}")]
    Fetch {
        /// Description of the transport failure.
        message: String,
    },

    /// The snapshot endpoint answered with a non-success status.
    #[error("Snapshot fetch failed: HTTP status {status}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
    },

    /// The snapshot document could not be decoded or is structurally invalid.
    #[error("Invalid snapshot: {message}")]
    InvalidSnapshot {
        /// Description of what is wrong with the document.
        message: String,
    },

    /// A rule's embedded configuration could not be parsed.
    #[error("Malformed configuration for rule '{rule}': {message}")]
    MalformedRule {
        /// The rule name.
        rule: String,
        /// Parser message.
        message: String,
    },

    /// An item references a rule that is absent from the loaded snapshot.
    #[error("Item '{item}' references unknown rule '{rule}'")]
    MissingRule {
        /// The item that carries the dangling reference.
        item: String,
        /// The referenced rule name.
        rule: String,
    },

    /// The engine or source is misconfigured.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl RbacError {
    /// Creates a new `Fetch` error.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidSnapshot` error.
    #[must_use]
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedRule` error.
    #[must_use]
    pub fn malformed_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Creates a new `MissingRule` error.
    #[must_use]
    pub fn missing_rule(item: impl Into<String>, rule: impl Into<String>) -> Self {
        Self::MissingRule {
            item: item.into(),
            rule: rule.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the remote source reported "not found".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SnapshotNotFound)
    }

    /// Returns `true` if this error aborts a snapshot load.
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::SnapshotNotFound
                | Self::Fetch { .. }
                | Self::HttpStatus { .. }
                | Self::InvalidSnapshot { .. }
                | Self::MalformedRule { .. }
        )
    }

    /// Returns `true` if this error was raised while resolving a single check.
    #[must_use]
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::MissingRule { .. })
    }

    /// Returns the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingRule { .. } => ErrorCategory::Resolution,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            _ => ErrorCategory::Load,
        }
    }
}

/// Coarse classification of [`RbacError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Fetching or materializing a snapshot failed.
    Load,
    /// A single access check could not be resolved.
    Resolution,
    /// Misconfiguration.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Resolution => write!(f, "resolution"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
