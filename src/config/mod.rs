//! Client configuration.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BridgeConfig`] | Bridge URLs, deadlines and reconnect backoff |
//!
//! Both bridge URLs can be supplied through the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `NFC_BRIDGE_URL` | `http://localhost:3001` |
//! | `NFC_BRIDGE_WS_URL` | `ws://localhost:3001` |

// ============================================================================
// Submodules
// ============================================================================

/// Bridge endpoints and timing.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use options::{
    BridgeConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_HTTP_URL, DEFAULT_NATIVE_TIMEOUT,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_SCAN_TIMEOUT, DEFAULT_WS_URL, HTTP_URL_ENV, WS_URL_ENV,
};
