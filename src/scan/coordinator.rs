//! "Wait for the next scan".
//!
//! [`ScanCoordinator::scan_card`] tries each way of reading a card in a
//! fixed order and stops at the first one that applies:
//!
//! | Step | Applies when | Deadline |
//! |------|--------------|----------|
//! | Persistent channel | channel is connected | `scan_timeout` |
//! | One-shot HTTP scan | bridge answers the probe | `scan_timeout` |
//! | Native reader | host supports it | `native_timeout` |
//!
//! Transport failures of the HTTP step fall through to the native reader.
//! Every path ends in a [`ScanOutcome`]; nothing here returns an error.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;

use crate::bridge::status::StatusBoard;
use crate::config::BridgeConfig;
use crate::error::ScanError;
use crate::identifiers::ScanRequestId;
use crate::timer::deadline;
use crate::transport::{AvailabilityProbe, BridgeApi, ConnectionState};

use super::native::{NativeEvent, NativeReader, extract_serial};
use super::outcome::ScanOutcome;
use super::pending::PendingScan;

// ============================================================================
// ScanCoordinator
// ============================================================================

/// Runs scans across the available paths.
pub struct ScanCoordinator {
    pending: Arc<PendingScan>,
    probe: AvailabilityProbe,
    api: Arc<dyn BridgeApi>,
    native: Arc<dyn NativeReader>,
    status: Arc<StatusBoard>,
    connection: watch::Receiver<ConnectionState>,
    scan_timeout: Duration,
    native_timeout: Duration,
}

impl ScanCoordinator {
    pub(crate) fn new(
        config: &BridgeConfig,
        pending: Arc<PendingScan>,
        api: Arc<dyn BridgeApi>,
        native: Arc<dyn NativeReader>,
        status: Arc<StatusBoard>,
        connection: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self {
            pending,
            probe: AvailabilityProbe::new(Arc::clone(&api), config.probe_timeout),
            api,
            native,
            status,
            connection,
            scan_timeout: config.scan_timeout,
            native_timeout: config.native_timeout,
        }
    }

    /// Waits for the next card and returns its serial number.
    ///
    /// `is_scanning` stays set until this returns or the future is dropped.
    pub async fn scan_card(&self) -> ScanOutcome {
        let _scanning = self.status.begin_scan();

        let outcome = self.run().await;
        self.status.record_outcome(&outcome);

        match &outcome {
            ScanOutcome::Success { serial_number } => {
                debug!(serial_number = %serial_number, "Scan completed");
            }
            ScanOutcome::Failure { error } => debug!(error = %error, "Scan failed"),
        }
        outcome
    }

    async fn run(&self) -> ScanOutcome {
        let connected = self.connection.borrow().is_connected();
        if connected {
            return self.scan_channel().await;
        }

        debug!("Channel not connected, probing bridge");
        let available = self.probe.check().await;
        self.status.set_bridge_available(available);

        if available && let Some(outcome) = self.scan_http().await {
            return outcome;
        }

        if self.native.is_supported() {
            return self.scan_native().await;
        }

        debug!("No scanning method available");
        ScanOutcome::failure(ScanError::Unavailable)
    }

    // ========================================================================
    // Paths
    // ========================================================================

    async fn scan_channel(&self) -> ScanOutcome {
        let (id, reply) = self.pending.register();
        let _discard = DiscardOnDrop {
            pending: &self.pending,
            id,
        };
        debug!(%id, "Waiting for scan on bridge channel");

        match timeout(self.scan_timeout, reply).await {
            Ok(Ok(reply)) => reply.into(),
            // Sender dropped without a reply: the slot was torn down.
            Ok(Err(_)) => ScanOutcome::failure(ScanError::Cancelled),
            Err(_) => ScanOutcome::failure(ScanError::timeout(millis(self.scan_timeout))),
        }
    }

    /// Returns `None` when the request itself failed and the next path
    /// should be tried.
    async fn scan_http(&self) -> Option<ScanOutcome> {
        debug!("Requesting one-shot scan from bridge");

        match deadline("one-shot scan", self.scan_timeout, self.api.scan()).await {
            Ok(response) => Some(response.into_outcome()),
            Err(e) => {
                debug!(
                    error = %e,
                    recoverable = e.is_recoverable(),
                    "One-shot scan request failed, falling through"
                );
                None
            }
        }
    }

    async fn scan_native(&self) -> ScanOutcome {
        debug!("Starting native reader session");

        let read = async {
            let mut session = match self.native.start_session().await {
                Ok(session) => session,
                Err(e) => return ScanOutcome::failure(ScanError::reader(e.to_string())),
            };

            match session.next_event().await {
                Some(NativeEvent::Reading(reading)) => match extract_serial(&reading) {
                    Some(serial_number) => ScanOutcome::success(serial_number),
                    None => ScanOutcome::failure(ScanError::Parse),
                },
                Some(NativeEvent::ReadingError(message)) => {
                    ScanOutcome::failure(ScanError::reader(message))
                }
                None => ScanOutcome::failure(ScanError::reader("Native reader session ended")),
            }
        };

        match timeout(self.native_timeout, read).await {
            Ok(outcome) => outcome,
            Err(_) => ScanOutcome::failure(ScanError::timeout(millis(self.native_timeout))),
        }
    }
}

impl std::fmt::Debug for ScanCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCoordinator")
            .field("pending", &self.pending.is_pending())
            .field("scan_timeout", &self.scan_timeout)
            .field("native_timeout", &self.native_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Removes the channel request if the scan ends without it completing.
struct DiscardOnDrop<'a> {
    pending: &'a PendingScan,
    id: ScanRequestId,
}

impl Drop for DiscardOnDrop<'_> {
    fn drop(&mut self) {
        self.pending.discard(self.id);
    }
}

#[inline]
fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

// ============================================================================
// Tests
// ============================================================================
