//! Scanning.
//!
//! One physical scan can be observed two ways: by the single caller waiting
//! in `scan_card()` and by any number of long-lived listeners. The two never
//! interfere; a scan arriving on the persistent channel reaches both.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `coordinator` | Tries channel, one-shot HTTP and native reading in order |
//! | `native` | Host NFC reader trait and serial number extraction |
//! | `outcome` | Result of a scan |
//! | `pending` | The single pending "next scan" request |
//! | `registry` | Long-lived scan listeners |

// ============================================================================
// Submodules
// ============================================================================

/// Scan path selection.
pub mod coordinator;

/// Host NFC reader.
pub mod native;

/// Scan results.
pub mod outcome;

/// Pending request slot.
pub mod pending;

/// Scan listeners.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use coordinator::ScanCoordinator;
pub use native::{
    NativeEvent, NativeReader, NativeReading, NativeSession, NdefRecord, RecordType,
    UnsupportedReader, extract_serial, hex_upper,
};
pub use outcome::ScanOutcome;
pub use pending::{PendingScan, ScanReply};
pub use registry::{ScanCallback, SubscriptionRegistry};
