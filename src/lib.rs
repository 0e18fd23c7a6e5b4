//! NFC scan-bridge client.
//!
//! This library obtains a physical card's serial number by talking to a
//! locally running hardware bridge and, failing that, to a host-native
//! contactless reader.
//!
//! # Architecture
//!
//! The client follows a client-server model:
//!
//! - **Client (Rust)**: probes the bridge, holds a persistent channel open,
//!   and waits for scans
//! - **Bridge (local process)**: owns the USB reader, answers HTTP requests
//!   and pushes scan events over WebSocket
//!
//! Key design principles:
//!
//! - One [`ScanBridge`] handle owns all client state (no globals)
//! - One scan is seen by the waiting caller and every listener
//! - A dropped channel reconnects with capped exponential backoff
//! - `scan_card()` always settles to a [`ScanOutcome`]
//!
//! # Quick Start
//!
//! ```no_run
//! use nfc_scan_bridge::{Result, ScanBridge};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Reads NFC_BRIDGE_URL / NFC_BRIDGE_WS_URL, defaulting to localhost:3001
//!     let bridge = ScanBridge::builder().build()?;
//!
//!     // Probe the bridge and open the persistent channel
//!     bridge.activate().await;
//!
//!     // Every scan, for as long as the subscription lives
//!     let id = bridge.on_card_scanned(|serial| println!("seen {serial}"));
//!
//!     // Just the next scan
//!     match bridge.scan_card().await.into_result() {
//!         Ok(serial) => println!("Card: {serial}"),
//!         Err(e) => println!("No card: {e}"),
//!     }
//!
//!     bridge.unsubscribe(&id);
//!     bridge.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Client facade: [`ScanBridge`], [`BridgeStatus`] |
//! | [`config`] | Bridge URLs and deadlines |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Bridge wire messages |
//! | [`scan`] | Scan paths, listeners and native reading |
//! | [`timer`] | Cancellable timers |
//! | [`transport`] | HTTP probe and persistent channel |

// ============================================================================
// Modules
// ============================================================================

/// Client facade.
///
/// Use [`ScanBridge::builder()`] to create a configured client.
pub mod bridge;

/// Bridge URLs, deadlines and reconnect backoff.
pub mod config;

/// Error types and result aliases.
///
/// Internal fallible operations return [`Result<T>`] which uses [`Error`].
/// Scan failures are reported as [`ScanError`] inside [`ScanOutcome`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Bridge wire protocol.
///
/// HTTP payloads and persistent channel messages.
pub mod protocol;

/// Scanning: path selection, pending request, listeners, native reader.
pub mod scan;

/// Cancellable one-shot timers.
pub mod timer;

/// Bridge transport layer.
///
/// Availability probe, persistent channel and reconnect state machine.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use bridge::{BridgeStatus, ScanBridge, ScanBridgeBuilder};

// Configuration
pub use config::BridgeConfig;

// Error types
pub use error::{Error, Result, ScanError};

// Identifier types
pub use identifiers::{ScanRequestId, SubscriptionId};

// Protocol types
pub use protocol::{BridgeCapability, BridgeEvent};

// Scan types
pub use scan::{
    NativeEvent, NativeReader, NativeReading, NativeSession, NdefRecord, RecordType,
    ScanOutcome, UnsupportedReader,
};

// Transport types
pub use transport::{ConnectionState, ReconnectPolicy};
