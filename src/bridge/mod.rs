//! Client facade.
//!
//! This module provides the main entry point for card scanning.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ScanBridge`] | Cloneable client handle |
//! | [`ScanBridgeBuilder`] | Fluent configuration builder |
//! | [`BridgeStatus`] | Snapshot of the status fields |
//!
//! # Example
//!
//! ```no_run
//! use nfc_scan_bridge::{Result, ScanBridge};
//!
//! # async fn example() -> Result<()> {
//! let bridge = ScanBridge::builder()
//!     .http_url("http://localhost:3001")
//!     .ws_url("ws://localhost:3001")
//!     .build()?;
//!
//! if bridge.activate().await {
//!     let outcome = bridge.scan_card().await;
//!     println!("{}", serde_json::to_string(&outcome).unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Channel event routing.
pub(crate) mod bus;

/// Core client implementation.
pub mod core;

/// Observable status fields.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ScanBridgeBuilder;
pub use core::ScanBridge;
pub use status::BridgeStatus;
