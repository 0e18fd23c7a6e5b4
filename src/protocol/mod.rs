//! Bridge wire protocol.
//!
//! The bridge exposes two surfaces:
//!
//! | Surface | Direction | Messages |
//! |---------|-----------|----------|
//! | HTTP | request/response | `GET /status`, `GET /scan` |
//! | WebSocket | bridge → client | `SCAN`, `CONNECTED`, `ERROR`, `READER_ERROR` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | Status and one-shot scan payloads |
//! | `message` | Persistent channel frames and typed events |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP endpoint payloads.
pub mod http;

/// Persistent channel frames.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::{BridgeCapability, ScanResponse, StatusResponse};
pub use message::{BridgeEvent, BridgeMessage};
