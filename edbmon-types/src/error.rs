use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the edbmon workspace.
///
/// Variants map onto how the orchestrator reacts: retrieval and timeout
/// failures skip a single window, configuration and not-found failures abort the
/// whole mnemonic, and insufficient-data conditions are informational skips.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MonitorError {
    /// The telemetry service failed to return data for a mnemonic.
    #[error("retrieval of {mnemonic} failed: {msg}")]
    Retrieval {
        /// Mnemonic being fetched.
        mnemonic: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A mnemonic or other resource is unknown to the source.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource, e.g. "mnemonic SE_ZIMIRICEA".
        what: String,
    },

    /// Invalid mnemonic configuration (relation, dependency count, plot directive, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Filtering left nothing to aggregate.
    #[error("insufficient data for {mnemonic}: {reason}")]
    InsufficientData {
        /// Mnemonic being processed.
        mnemonic: String,
        /// Why no data remained.
        reason: String,
    },

    /// Two series share no time range and cannot be combined.
    #[error("no overlapping time range between {left} and {right}")]
    InsufficientOverlap {
        /// Name of the left-hand series.
        left: String,
        /// Name of the right-hand series.
        right: String,
    },

    /// A single fetch exceeded the configured timeout.
    #[error("fetch of {mnemonic} timed out after {timeout_ms} ms")]
    Timeout {
        /// Mnemonic being fetched.
        mnemonic: String,
        /// Configured per-attempt timeout.
        timeout_ms: u64,
    },

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A persistence, query-time or rendering collaborator failed.
    #[error("{sink} failed: {msg}")]
    Sink {
        /// Collaborator label (e.g. "persistence", "renderer").
        sink: String,
        /// Human-readable error message.
        msg: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl MonitorError {
    /// Helper: build a `Retrieval` error for a mnemonic.
    pub fn retrieval(mnemonic: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Retrieval {
            mnemonic: mnemonic.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build a `Configuration` error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Helper: build an `InsufficientData` error.
    pub fn insufficient_data(mnemonic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            mnemonic: mnemonic.into(),
            reason: reason.into(),
        }
    }

    /// Helper: build an `InsufficientOverlap` error.
    pub fn insufficient_overlap(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::InsufficientOverlap {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Helper: build a `Timeout` error.
    pub fn timeout(mnemonic: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            mnemonic: mnemonic.into(),
            timeout_ms,
        }
    }

    /// Helper: build a `Sink` error for a failing collaborator.
    pub fn sink(sink: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Sink {
            sink: sink.into(),
            msg: msg.into(),
        }
    }

    /// Returns true for transient fetch failures worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Retrieval { .. } | Self::Timeout { .. })
    }

    /// Returns true if this error stops processing of the whole mnemonic
    /// rather than a single window.
    #[must_use]
    pub const fn aborts_mnemonic(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::NotFound { .. })
    }

    /// Returns true if this error only signals an empty result.
    #[must_use]
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
