//! Type-safe identifiers.
//!
//! | Type | Source | Used for |
//! |------|--------|----------|
//! | [`SubscriptionId`] | process-wide counter | `on_card_scanned` listeners |
//! | [`ScanRequestId`] | UUID v4 | pending scan correlation |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

// ============================================================================
// SubscriptionId
// ============================================================================

/// Counter backing [`SubscriptionId::next`].
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one `on_card_scanned` listener.
///
/// Returned on registration and passed back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates a fresh, never reused identifier.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// ScanRequestId
// ============================================================================

/// Identity of one `scan_card` call while it waits on the channel.
///
/// Lets a deadline expiry discard its own request without touching a
/// newer one that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanRequestId(Uuid);

impl ScanRequestId {
    /// Generates a random identifier.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ScanRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
