//! Host-native contactless reading.
//!
//! Some hosts can read cards without the bridge. They plug in through the
//! [`NativeReader`] trait: a reader reports whether it is supported and
//! starts a [`NativeSession`] that yields [`NativeEvent`]s.
//!
//! # Serial Number Extraction
//!
//! A reading may carry several kinds of data. [`extract_serial`] picks the
//! first that applies:
//!
//! 1. the serial number reported directly by the tag
//! 2. `NFC`/`CARD`/`ID` followed by an identifier in a text or URL record
//!    (for example `CARD-12345` yields `12345`)
//! 3. a text record made only of ASCII letters, digits and hyphens
//! 4. the raw tag identifier, hex encoded in upper case

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Identifier embedded in NDEF text, e.g. `NFC: 04AABB` or `ID-7781`.
static EMBEDDED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(NFC|CARD|ID)[-:]?\s*([A-Z0-9-]+)")
        .unwrap_or_else(|e| unreachable!("embedded id pattern is invalid: {e}"))
});

/// Whole-record identifier.
static PLAIN_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9-]+$")
        .unwrap_or_else(|e| unreachable!("plain id pattern is invalid: {e}"))
});

// ============================================================================
// NDEF Types
// ============================================================================

/// NDEF record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    /// Well-known text record.
    Text,
    /// Well-known URI record.
    Url,
    /// MIME media record.
    Mime(String),
    /// Anything else, by its type name.
    Other(String),
}

/// One NDEF record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    /// Record type.
    pub record_type: RecordType,
    /// Decoded payload bytes.
    pub data: Vec<u8>,
}

impl NdefRecord {
    /// Creates a text record.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            record_type: RecordType::Text,
            data: content.into().into_bytes(),
        }
    }

    /// Creates a URL record.
    #[must_use]
    pub fn url(content: impl Into<String>) -> Self {
        Self {
            record_type: RecordType::Url,
            data: content.into().into_bytes(),
        }
    }

    /// Returns the payload as text for text and URL records.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self.record_type {
            RecordType::Text | RecordType::Url => Some(String::from_utf8_lossy(&self.data)),
            RecordType::Mime(_) | RecordType::Other(_) => None,
        }
    }
}

/// One reading reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeReading {
    /// Serial number as reported by the tag.
    pub serial_number: Option<String>,
    /// NDEF records stored on the tag.
    pub records: Vec<NdefRecord>,
    /// Raw tag identifier.
    pub tag_id: Option<Vec<u8>>,
}

impl NativeReading {
    /// Extracts the serial number. See [`extract_serial`].
    #[inline]
    #[must_use]
    pub fn serial_number(&self) -> Option<String> {
        extract_serial(self)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Event produced by a native reader session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    /// A tag was read.
    Reading(NativeReading),
    /// The reader reported a failure.
    ReadingError(String),
}

/// An active native reader session.
///
/// Dropping the session tells the reader to stop.
#[derive(Debug)]
pub struct NativeSession {
    events: mpsc::Receiver<NativeEvent>,
}

impl NativeSession {
    /// Wraps the receiving half of a reader's event channel.
    #[must_use]
    pub fn new(events: mpsc::Receiver<NativeEvent>) -> Self {
        Self { events }
    }

    /// Creates a session and the sender a reader pushes events into.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<NativeEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the reader has stopped.
    pub async fn next_event(&mut self) -> Option<NativeEvent> {
        self.events.recv().await
    }
}

// ============================================================================
// NativeReader
// ============================================================================

/// Host-provided contactless reader.
#[async_trait]
pub trait NativeReader: Send + Sync + 'static {
    /// Returns `true` if the host exposes a usable reader.
    ///
    /// Must be cheap and free of side effects.
    fn is_supported(&self) -> bool;

    /// Starts listening for tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeSession`] if the host refuses to start.
    async fn start_session(&self) -> Result<NativeSession>;
}

/// Reader for hosts without native NFC.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedReader;

#[async_trait]
impl NativeReader for UnsupportedReader {
    fn is_supported(&self) -> bool {
        false
    }

    async fn start_session(&self) -> Result<NativeSession> {
        Err(Error::native_session("native NFC is not supported on this host"))
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extracts a card serial number from a reading.
///
/// Returns `None` if the reading carries nothing usable.
#[must_use]
pub fn extract_serial(reading: &NativeReading) -> Option<String> {
    if let Some(serial) = reading
        .serial_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some(serial.to_string());
    }

    let texts: Vec<Cow<'_, str>> = reading.records.iter().filter_map(NdefRecord::as_text).collect();

    if let Some(id) = texts
        .iter()
        .find_map(|text| EMBEDDED_ID.captures(text).map(|c| c[2].to_string()))
    {
        return Some(id);
    }

    if let Some(id) = reading
        .records
        .iter()
        .filter(|record| record.record_type == RecordType::Text)
        .filter_map(NdefRecord::as_text)
        .map(|text| text.trim().to_string())
        .find(|text| PLAIN_ID.is_match(text))
    {
        return Some(id);
    }

    reading
        .tag_id
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .map(hex_upper)
}

/// Hex-encodes bytes in upper case without separators.
#[must_use]
pub fn hex_upper(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02X}");
            out
        })
}

// ============================================================================
// Tests
// ============================================================================
