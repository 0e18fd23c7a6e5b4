//! Routing of channel events.
//!
//! Every [`BridgeEvent`] from the persistent channel passes through
//! [`EventBus::publish`], which runs synchronously on the channel's read
//! loop. For a scan the pending request is resolved before any listener
//! runs, and both complete before the next frame is read.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::error::ScanError;
use crate::protocol::BridgeEvent;
use crate::scan::{PendingScan, SubscriptionRegistry};
use crate::transport::EventSink;

use super::status::StatusBoard;

// ============================================================================
// EventBus
// ============================================================================

/// Fans channel events out to the pending slot, listeners and status.
pub(crate) struct EventBus {
    pending: Arc<PendingScan>,
    registry: Arc<SubscriptionRegistry>,
    status: Arc<StatusBoard>,
}

impl EventBus {
    pub(crate) fn new(
        pending: Arc<PendingScan>,
        registry: Arc<SubscriptionRegistry>,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            pending,
            registry,
            status,
        }
    }

    pub(crate) fn publish(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::Scan { uid } => {
                let resolved = self.pending.resolve(&uid);
                let delivered = self.registry.notify(&uid);
                debug!(uid = %uid, resolved, delivered, "Scan event dispatched");
            }

            BridgeEvent::Capability(capability) => {
                debug!(
                    nfc_available = capability.nfc_available,
                    reader_connected = capability.reader_connected,
                    "Bridge capability updated"
                );
                self.status.set_capability(capability);
            }

            // Listeners only hear about successful scans.
            BridgeEvent::Error { message } => {
                let failed = self.pending.fail(ScanError::reader(message.as_str()));
                debug!(error = %message, failed, "Bridge reported reader error");
            }
        }
    }

    /// Wraps the bus as a connection manager sink.
    pub(crate) fn into_sink(self: Arc<Self>) -> EventSink {
        Arc::new(move |event| self.publish(event))
    }
}

// ============================================================================
// Tests
// ============================================================================
