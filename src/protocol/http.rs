//! HTTP endpoint payloads.
//!
//! | Endpoint | Response |
//! |----------|----------|
//! | `GET /status` | [`StatusResponse`] |
//! | `GET /scan` | [`ScanResponse`] |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::scan::ScanOutcome;

// ============================================================================
// BridgeCapability
// ============================================================================

/// What the bridge reports it can do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCapability {
    /// The bridge has NFC support compiled in.
    #[serde(default)]
    pub nfc_available: bool,

    /// A physical reader is attached.
    #[serde(default)]
    pub reader_connected: bool,
}

impl BridgeCapability {
    /// Capability of a bridge that cannot be reached.
    #[inline]
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            nfc_available: false,
            reader_connected: false,
        }
    }

    /// Returns `true` if the bridge can be used for scanning.
    #[inline]
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        self.nfc_available || self.reader_connected
    }
}

/// `GET /status` response body.
pub type StatusResponse = BridgeCapability;

// ============================================================================
// ScanResponse
// ============================================================================

/// `GET /scan` response body.
///
/// # Format
///
/// ```json
/// { "success": true, "serialNumber": "04AABBCC" }
/// { "success": false, "error": "No card detected" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    /// Whether a card was read.
    #[serde(default)]
    pub success: bool,

    /// Card serial number.
    #[serde(default)]
    pub serial_number: Option<String>,

    /// Failure reason.
    #[serde(default)]
    pub error: Option<String>,
}

impl ScanResponse {
    /// Translates the response into a scan outcome.
    #[must_use]
    pub fn into_outcome(self) -> ScanOutcome {
        match (self.success, self.serial_number) {
            (true, Some(serial)) if !serial.trim().is_empty() => {
                ScanOutcome::success(serial.trim())
            }
            (true, _) => ScanOutcome::failure(ScanError::Parse),
            (false, _) => ScanOutcome::failure(ScanError::reader(
                self.error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "Scan failed".to_string()),
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
