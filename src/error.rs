//! Error types for the NFC scan-bridge client.
//!
//! This module defines two error families:
//!
//! - [`enum@Error`]: failures of internal fallible operations (configuration,
//!   transport, protocol). These never escape [`ScanBridge::scan_card`].
//! - [`ScanError`]: the closed set of reasons a scan can fail. It is carried
//!   inside [`ScanOutcome::Failure`] and is what callers see.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`] |
//! | Protocol | [`Error::Protocol`] |
//! | Execution | [`Error::Timeout`], [`Error::NativeSession`] |
//! | External | [`Error::Http`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |
//!
//! [`ScanBridge::scan_card`]: crate::ScanBridge::scan_card
//! [`ScanOutcome::Failure`]: crate::ScanOutcome::Failure

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a bridge URL or timeout setting is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Bridge connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out opening the persistent channel.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Unexpected payload from the bridge.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Native reader session could not be started.
    #[error("Native NFC session failed: {message}")]
    NativeSession {
        /// Reason reported by the host.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// HTTP error talking to the bridge.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a native session error.
    #[inline]
    pub fn native_session(message: impl Into<String>) -> Self {
        Self::NativeSession {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection { .. }
            | Self::ConnectionTimeout { .. }
            | Self::WebSocket(_) => true,
            Self::Http(e) => e.is_connect(),
            _ => false,
        }
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_timeout() || self.is_connection_error()
    }
}

// ============================================================================
// ScanError
// ============================================================================

/// Reason a scan produced no serial number.
///
/// Every failed [`ScanOutcome`](crate::ScanOutcome) carries one of these.
/// None of them is fatal: callers should offer a retry or another method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Neither the bridge nor a native reader is usable.
    #[error("NFC is not available: no bridge server reachable and native NFC is not supported")]
    Unavailable,

    /// No card was presented before the deadline.
    #[error("Scan timeout after {timeout_ms}ms")]
    Timeout {
        /// Milliseconds waited.
        timeout_ms: u64,
    },

    /// Fault reported by the reader hardware or driver.
    #[error("{message}")]
    Reader {
        /// Message as reported by the bridge or the native reader.
        message: String,
    },

    /// A card was read but no serial number could be extracted.
    #[error("Could not read card serial number")]
    Parse,

    /// Replaced by a newer scan request before completing.
    #[error("Scan superseded by a newer request")]
    Superseded,

    /// The client was shut down while the scan was waiting.
    #[error("Scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Creates a reader error.
    #[inline]
    pub fn reader(message: impl Into<String>) -> Self {
        Self::Reader {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Returns `true` if the scan timed out.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if no scanning method was usable.
    #[inline]
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Returns `true` if asking the user to scan again is sensible.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Reader { .. } | Self::Parse
        )
    }

    /// Returns `true` if this failure belongs in the `error` status field.
    ///
    /// Unavailability is reported through capability flags instead, and a
    /// superseded or cancelled request is not a failure the user caused.
    #[inline]
    #[must_use]
    pub(crate) fn is_user_visible(&self) -> bool {
        self.is_retryable()
    }
}

// ============================================================================
// Tests
// ============================================================================
