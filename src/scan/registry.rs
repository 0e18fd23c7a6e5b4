//! Long-lived "notify me of every scan" listeners.
//!
//! Delivery works on a snapshot taken under the lock and calls listeners
//! outside it, so a listener may unsubscribe itself or register another
//! one. A panicking listener is contained and logged; the remaining
//! listeners still receive the event.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::identifiers::SubscriptionId;

// ============================================================================
// Types
// ============================================================================

/// Listener invoked with each scanned serial number.
pub type ScanCallback = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// SubscriptionRegistry
// ============================================================================

/// Fan-out list of scan listeners.
#[derive(Default)]
pub struct SubscriptionRegistry {
    listeners: Mutex<FxHashMap<SubscriptionId, ScanCallback>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        self.listeners.lock().insert(id, Arc::new(callback));
        debug!(subscription_id = %id, "Scan listener registered");
        id
    }

    /// Removes a listener.
    ///
    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let removed = self.listeners.lock().remove(id).is_some();
        if removed {
            debug!(subscription_id = %id, "Scan listener removed");
        }
        removed
    }

    /// Removes every listener.
    pub fn clear(&self) {
        let count = {
            let mut listeners = self.listeners.lock();
            let count = listeners.len();
            listeners.clear();
            count
        };

        if count > 0 {
            debug!(count, "Scan listeners cleared");
        }
    }

    /// Returns the number of listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Returns `true` if nobody is listening.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Delivers a serial number to every listener.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn notify(&self, serial_number: &str) -> usize {
        let snapshot: Vec<(SubscriptionId, ScanCallback)> = self
            .listeners
            .lock()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut delivered = 0;
        for (id, callback) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(serial_number))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    warn!(
                        subscription_id = %id,
                        panic = panic_message(panic.as_ref()),
                        "Scan listener panicked"
                    );
                }
            }
        }

        delivered
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Tests
// ============================================================================
