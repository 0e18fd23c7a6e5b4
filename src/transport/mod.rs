//! Bridge transport layer.
//!
//! The bridge is reached two ways: short HTTP requests for health checks
//! and one-shot scans, and a persistent WebSocket for pushed scan events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                          ┌─────────────────┐
//! │  ScanBridge (Rust)   │        HTTP              │  Bridge server  │
//! │                      │  GET /status, GET /scan  │                 │
//! │  AvailabilityProbe   │─────────────────────────►│                 │
//! │                      │        WebSocket         │  NFC reader     │
//! │  ConnectionManager   │◄─────────────────────────│  (USB)          │
//! │  → Channel           │     localhost:3001       │                 │
//! └──────────────────────┘                          └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Reconnect delay schedule |
//! | `channel` | Persistent channel abstraction and WebSocket implementation |
//! | `manager` | Channel lifecycle and reconnect state machine |
//! | `probe` | HTTP endpoints and availability probe |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect delay schedule.
pub mod backoff;

/// Persistent channel abstraction.
pub mod channel;

/// Channel lifecycle and reconnects.
pub mod manager;

/// HTTP endpoints and availability probe.
pub mod probe;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::ReconnectPolicy;
pub use channel::{CLOSE_NORMAL, Channel, Connector, Frame, WsChannel, WsConnector};
pub use manager::{ConnectionManager, ConnectionState, EventSink};
pub use probe::{AvailabilityProbe, BridgeApi, HttpBridgeApi};
