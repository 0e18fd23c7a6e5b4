//! The single pending "next scan" request.
//!
//! At most one request waits on the persistent channel at a time. When a
//! new request is registered while another is waiting, the newer one wins:
//! the older caller is resolved at once with [`ScanError::Superseded`], so
//! nobody is left waiting on a request that can no longer complete.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::ScanError;
use crate::identifiers::ScanRequestId;

// ============================================================================
// Types
// ============================================================================

/// Value delivered to a waiting request.
pub type ScanReply = Result<String, ScanError>;

/// A registered request.
struct PendingScanRequest {
    /// Identity used to discard on deadline.
    id: ScanRequestId,
    /// Channel back to the waiting caller.
    responder: oneshot::Sender<ScanReply>,
}

// ============================================================================
// PendingScan
// ============================================================================

/// Slot holding the one pending request.
#[derive(Default)]
pub struct PendingScan {
    slot: Mutex<Option<PendingScanRequest>>,
}

impl PendingScan {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new request, superseding any existing one.
    pub fn register(&self) -> (ScanRequestId, oneshot::Receiver<ScanReply>) {
        let id = ScanRequestId::generate();
        let (responder, receiver) = oneshot::channel();

        let previous = self
            .slot
            .lock()
            .replace(PendingScanRequest { id, responder });

        if let Some(previous) = previous {
            debug!(previous = %previous.id, current = %id, "Pending scan superseded");
            let _ = previous.responder.send(Err(ScanError::Superseded));
        }

        trace!(%id, "Pending scan registered");
        (id, receiver)
    }

    /// Resolves the pending request with a serial number.
    ///
    /// Returns `true` if a request was waiting.
    pub fn resolve(&self, serial_number: &str) -> bool {
        self.complete(Ok(serial_number.to_string()))
    }

    /// Fails the pending request.
    ///
    /// Returns `true` if a request was waiting.
    pub fn fail(&self, error: ScanError) -> bool {
        self.complete(Err(error))
    }

    /// Removes the request with `id` if it is still the pending one.
    pub fn discard(&self, id: ScanRequestId) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|pending| pending.id == id) {
            *slot = None;
            trace!(%id, "Pending scan discarded");
            return true;
        }
        false
    }

    /// Returns `true` if a request is waiting.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Takes the pending request and sends `reply` to it.
    fn complete(&self, reply: ScanReply) -> bool {
        let Some(pending) = self.slot.lock().take() else {
            return false;
        };

        trace!(id = %pending.id, ok = reply.is_ok(), "Pending scan completed");
        // The caller may have timed out between take and send.
        let _ = pending.responder.send(reply);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
