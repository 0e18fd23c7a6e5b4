//! Observable status fields.
//!
//! [`StatusBoard`] is the single writer of the flags UI code reads through
//! [`ScanBridge`](crate::ScanBridge). Connection state is not stored here;
//! it is read from the connection manager when a snapshot is taken.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::protocol::BridgeCapability;
use crate::scan::ScanOutcome;

// ============================================================================
// BridgeStatus
// ============================================================================

/// Snapshot of the client status.
///
/// # Format
///
/// ```json
/// {
///   "isScanning": false,
///   "isSupported": true,
///   "isConnected": true,
///   "bridgeAvailable": true,
///   "error": null
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatus {
    /// A scan is in progress.
    pub is_scanning: bool,
    /// Some scanning method is usable.
    pub is_supported: bool,
    /// The persistent channel is open.
    pub is_connected: bool,
    /// The bridge answered its last health check with a usable reader.
    pub bridge_available: bool,
    /// Message of the last failed scan.
    pub error: Option<String>,
}

// ============================================================================
// StatusBoard
// ============================================================================

#[derive(Debug, Default)]
struct Fields {
    /// Scans currently running.
    active_scans: usize,
    is_scanning: bool,
    native_supported: bool,
    bridge_available: bool,
    error: Option<String>,
}

/// Writer side of [`BridgeStatus`].
#[derive(Debug, Default)]
pub(crate) struct StatusBoard {
    fields: Mutex<Fields>,
}

impl StatusBoard {
    pub(crate) fn new(native_supported: bool) -> Self {
        Self {
            fields: Mutex::new(Fields {
                native_supported,
                ..Fields::default()
            }),
        }
    }

    /// Marks a scan as started until the guard drops.
    pub(crate) fn begin_scan(&self) -> ScanningGuard<'_> {
        let mut fields = self.fields.lock();
        fields.active_scans += 1;
        fields.is_scanning = true;
        ScanningGuard { board: self }
    }

    fn end_scan(&self) {
        let mut fields = self.fields.lock();
        fields.active_scans = fields.active_scans.saturating_sub(1);
        if fields.active_scans == 0 {
            fields.is_scanning = false;
        }
    }

    /// Clears the scanning flag and error without touching running scans.
    pub(crate) fn stop_scanning(&self) {
        let mut fields = self.fields.lock();
        fields.is_scanning = false;
        fields.error = None;
    }

    /// Records the result of a finished scan.
    pub(crate) fn record_outcome(&self, outcome: &ScanOutcome) {
        let mut fields = self.fields.lock();
        match outcome {
            ScanOutcome::Success { .. } => fields.error = None,
            ScanOutcome::Failure { error } if error.is_user_visible() => {
                fields.error = Some(error.to_string());
            }
            ScanOutcome::Failure { .. } => {}
        }
    }

    pub(crate) fn set_bridge_available(&self, available: bool) {
        let mut fields = self.fields.lock();
        if fields.bridge_available != available {
            debug!(available, "Bridge availability changed");
        }
        fields.bridge_available = available;
    }

    pub(crate) fn set_capability(&self, capability: BridgeCapability) {
        self.set_bridge_available(capability.is_usable());
    }

    pub(crate) fn set_native_supported(&self, supported: bool) {
        self.fields.lock().native_supported = supported;
    }

    pub(crate) fn is_scanning(&self) -> bool {
        self.fields.lock().is_scanning
    }

    pub(crate) fn is_supported(&self) -> bool {
        let fields = self.fields.lock();
        fields.native_supported || fields.bridge_available
    }

    pub(crate) fn bridge_available(&self) -> bool {
        self.fields.lock().bridge_available
    }

    pub(crate) fn error(&self) -> Option<String> {
        self.fields.lock().error.clone()
    }

    pub(crate) fn snapshot(&self, is_connected: bool) -> BridgeStatus {
        let fields = self.fields.lock();
        BridgeStatus {
            is_scanning: fields.is_scanning,
            is_supported: fields.native_supported || fields.bridge_available,
            is_connected,
            bridge_available: fields.bridge_available,
            error: fields.error.clone(),
        }
    }
}

/// Keeps `is_scanning` set while alive.
#[must_use = "scanning ends when the guard is dropped"]
pub(crate) struct ScanningGuard<'a> {
    board: &'a StatusBoard,
}

impl Drop for ScanningGuard<'_> {
    fn drop(&mut self) {
        self.board.end_scan();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::ScanError;

    #[test]
    fn test_scanning_guard() {
        let board = StatusBoard::new(false);
        let first = board.begin_scan();
        let second = board.begin_scan();
        assert!(board.is_scanning());

        drop(first);
        assert!(board.is_scanning());
        drop(second);
        assert!(!board.is_scanning());
    }

    #[test]
    fn test_stop_scanning_keeps_guard_balanced() {
        let board = StatusBoard::new(false);
        let guard = board.begin_scan();
        board.record_outcome(&ScanOutcome::failure(ScanError::Parse));

        board.stop_scanning();
        assert!(!board.is_scanning());
        assert_eq!(board.error(), None);

        drop(guard);
        assert!(!board.is_scanning());
    }

    #[test]
    fn test_error_field() {
        let board = StatusBoard::new(false);

        board.record_outcome(&ScanOutcome::failure(ScanError::timeout(35_000)));
        assert_eq!(board.error().as_deref(), Some("Scan timeout after 35000ms"));

        board.record_outcome(&ScanOutcome::failure(ScanError::Unavailable));
        assert_eq!(board.error().as_deref(), Some("Scan timeout after 35000ms"));

        board.record_outcome(&ScanOutcome::success("04AABBCC"));
        assert_eq!(board.error(), None);

        board.record_outcome(&ScanOutcome::failure(ScanError::Superseded));
        assert_eq!(board.error(), None);
    }

    #[test]
    fn test_supported_from_either_source() {
        let board = StatusBoard::new(false);
        assert!(!board.is_supported());

        board.set_capability(BridgeCapability {
            nfc_available: false,
            reader_connected: true,
        });
        assert!(board.is_supported());
        assert!(board.bridge_available());

        board.set_capability(BridgeCapability::unavailable());
        assert!(!board.is_supported());

        board.set_native_supported(true);
        assert!(board.is_supported());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let board = StatusBoard::new(true);
        let json = serde_json::to_value(board.snapshot(false)).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "isScanning": false,
                "isSupported": true,
                "isConnected": false,
                "bridgeAvailable": false,
                "error": null
            })
        );
    }
}
