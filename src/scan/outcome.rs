//! Scan results.

// ============================================================================
// Imports
// ============================================================================

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::ScanError;

// ============================================================================
// ScanOutcome
// ============================================================================

/// Result of one `scan_card` call.
///
/// Serializes to the shape UI code expects:
///
/// ```json
/// { "success": true, "serialNumber": "04AABBCC" }
/// { "success": false, "error": "Scan timeout after 35000ms" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A card was read.
    Success {
        /// Card serial number.
        serial_number: String,
    },

    /// No serial number was obtained.
    Failure {
        /// Why the scan failed.
        error: ScanError,
    },
}

impl ScanOutcome {
    /// Creates a successful outcome.
    #[inline]
    pub fn success(serial_number: impl Into<String>) -> Self {
        Self::Success {
            serial_number: serial_number.into(),
        }
    }

    /// Creates a failed outcome.
    #[inline]
    pub fn failure(error: ScanError) -> Self {
        Self::Failure { error }
    }

    /// Returns `true` if a card was read.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the serial number, if any.
    #[inline]
    #[must_use]
    pub fn serial_number(&self) -> Option<&str> {
        match self {
            Self::Success { serial_number } => Some(serial_number),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the failure reason, if any.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&ScanError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    /// Converts into a standard `Result`.
    #[inline]
    pub fn into_result(self) -> Result<String, ScanError> {
        match self {
            Self::Success { serial_number } => Ok(serial_number),
            Self::Failure { error } => Err(error),
        }
    }
}

impl From<Result<String, ScanError>> for ScanOutcome {
    fn from(result: Result<String, ScanError>) -> Self {
        match result {
            Ok(serial_number) => Self::Success { serial_number },
            Err(error) => Self::Failure { error },
        }
    }
}

impl Serialize for ScanOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ScanOutcome", 2)?;
        match self {
            Self::Success { serial_number } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("serialNumber", serial_number)?;
            }
            Self::Failure { error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &error.to_string())?;
            }
        }
        state.end()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_accessors() {
        let ok = ScanOutcome::success("04AABBCC");
        assert!(ok.is_success());
        assert_eq!(ok.serial_number(), Some("04AABBCC"));
        assert!(ok.error().is_none());

        let failed = ScanOutcome::failure(ScanError::Parse);
        assert!(!failed.is_success());
        assert_eq!(failed.serial_number(), None);
        assert_eq!(failed.error(), Some(&ScanError::Parse));
    }

    #[test]
    fn test_success_wire_shape() {
        let value = serde_json::to_value(ScanOutcome::success("04AABBCC")).expect("serialize");
        assert_eq!(value, json!({ "success": true, "serialNumber": "04AABBCC" }));
    }

    #[test]
    fn test_failure_wire_shape() {
        let value =
            serde_json::to_value(ScanOutcome::failure(ScanError::timeout(35_000))).expect("serialize");
        assert_eq!(
            value,
            json!({ "success": false, "error": "Scan timeout after 35000ms" })
        );
    }

    #[test]
    fn test_result_conversions() {
        let outcome: ScanOutcome = Ok::<_, ScanError>("ABC".to_string()).into();
        assert_eq!(outcome.clone().into_result(), Ok("ABC".to_string()));

        let outcome: ScanOutcome = Err(ScanError::Cancelled).into();
        assert_eq!(outcome.into_result(), Err(ScanError::Cancelled));
    }
}
