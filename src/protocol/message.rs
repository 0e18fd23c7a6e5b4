//! Persistent channel messages.
//!
//! The bridge pushes JSON text frames. Only three kinds matter:
//!
//! | `type` | Payload | Parsed as |
//! |--------|---------|-----------|
//! | `SCAN` | `uid` | [`BridgeEvent::Scan`] |
//! | `CONNECTED` | `nfc_available`, `reader_connected` | [`BridgeEvent::Capability`] |
//! | `ERROR`, `READER_ERROR` | `error` | [`BridgeEvent::Error`] |
//!
//! Any other frame carrying a non-empty `uid` is a scan, whatever its
//! `type`. Frames that are not JSON objects are rejected.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Value, from_str, from_value};

use crate::error::{Error, Result};

use super::http::BridgeCapability;

// ============================================================================
// Constants
// ============================================================================

/// Message used when the bridge reports an error without text.
const DEFAULT_READER_ERROR: &str = "NFC reader error";

// ============================================================================
// BridgeMessage
// ============================================================================

/// A raw inbound frame from the bridge.
///
/// # Format
///
/// ```json
/// { "type": "SCAN", "uid": "04AABBCC", "timestamp": 1718000000000 }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeMessage {
    /// Message kind.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Card serial number (scan events).
    #[serde(default)]
    pub uid: Option<String>,

    /// Whether the bridge has NFC support (handshake).
    #[serde(default)]
    pub nfc_available: Option<bool>,

    /// Whether a reader is attached (handshake).
    #[serde(default)]
    pub reader_connected: Option<bool>,

    /// Error text (error events).
    #[serde(default)]
    pub error: Option<String>,
}

impl BridgeMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the frame is not JSON
    /// or a field has the wrong type, and [`Error::Protocol`] if it is JSON
    /// but not an object.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = from_str(text)?;
        if !value.is_object() {
            return Err(Error::protocol("bridge message is not a JSON object"));
        }
        Ok(from_value(value)?)
    }

    /// Converts the message into a typed event.
    ///
    /// Returns `None` for messages this client does not act on.
    #[must_use]
    pub fn into_event(self) -> Option<BridgeEvent> {
        match self.kind.as_deref() {
            Some("ERROR" | "READER_ERROR") => Some(BridgeEvent::Error {
                message: self
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| DEFAULT_READER_ERROR.to_string()),
            }),

            Some("CONNECTED") => Some(BridgeEvent::Capability(BridgeCapability {
                nfc_available: self.nfc_available.unwrap_or(false),
                reader_connected: self.reader_connected.unwrap_or(false),
            })),

            _ => {
                let uid = self.uid.map(|u| u.trim().to_string())?;
                (!uid.is_empty()).then_some(BridgeEvent::Scan { uid })
            }
        }
    }
}

// ============================================================================
// BridgeEvent
// ============================================================================

/// Typed event delivered on the internal event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A card was read.
    Scan {
        /// Card serial number as reported by the bridge.
        uid: String,
    },

    /// Bridge capabilities changed.
    Capability(BridgeCapability),

    /// Reader fault.
    Error {
        /// Message reported by the bridge.
        message: String,
    },
}

impl BridgeEvent {
    /// Returns the event kind for logging.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scan { .. } => "scan",
            Self::Capability(_) => "capability",
            Self::Error { .. } => "error",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
