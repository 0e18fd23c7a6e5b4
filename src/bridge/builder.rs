//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`ScanBridge`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use nfc_scan_bridge::ScanBridge;
//!
//! # fn example() -> nfc_scan_bridge::Result<()> {
//! let bridge = ScanBridge::builder()
//!     .http_url("http://127.0.0.1:3001")
//!     .ws_url("ws://127.0.0.1:3001")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::scan::{NativeReader, UnsupportedReader};
use crate::transport::{BridgeApi, Connector, HttpBridgeApi, WsConnector};

use super::core::ScanBridge;

// ============================================================================
// ScanBridgeBuilder
// ============================================================================

/// Builder for configuring a [`ScanBridge`] instance.
///
/// Use [`ScanBridge::builder()`] to create a new builder.
#[derive(Default)]
pub struct ScanBridgeBuilder {
    /// Base configuration. Read from the environment when unset.
    config: Option<BridgeConfig>,
    /// Overrides `config.http_url`.
    http_url: Option<String>,
    /// Overrides `config.ws_url`.
    ws_url: Option<String>,
    /// Host NFC reader.
    native_reader: Option<Arc<dyn NativeReader>>,
    /// Persistent channel connector.
    connector: Option<Arc<dyn Connector>>,
    /// HTTP endpoints.
    bridge_api: Option<Arc<dyn BridgeApi>>,
}

// ============================================================================
// ScanBridgeBuilder Implementation
// ============================================================================

impl ScanBridgeBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the full configuration.
    ///
    /// Without this, [`BridgeConfig::from_env`] is used.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the bridge HTTP base URL.
    #[inline]
    #[must_use]
    pub fn http_url(mut self, url: impl Into<String>) -> Self {
        self.http_url = Some(url.into());
        self
    }

    /// Sets the bridge WebSocket URL.
    #[inline]
    #[must_use]
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Sets the host NFC reader.
    ///
    /// Defaults to [`UnsupportedReader`].
    #[inline]
    #[must_use]
    pub fn native_reader(mut self, reader: impl NativeReader) -> Self {
        self.native_reader = Some(Arc::new(reader));
        self
    }

    /// Replaces the WebSocket connector.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Replaces the HTTP client.
    #[inline]
    #[must_use]
    pub fn bridge_api(mut self, api: impl BridgeApi) -> Self {
        self.bridge_api = Some(Arc::new(api));
        self
    }

    /// Builds the client with validation.
    ///
    /// Nothing is contacted until [`ScanBridge::activate`] or a scan.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if a URL or timeout is invalid
    /// - [`Error::Http`](crate::Error::Http) if the HTTP client cannot be built
    pub fn build(self) -> Result<ScanBridge> {
        let config = self.resolve_config()?;

        let bridge_api = match self.bridge_api {
            Some(api) => api,
            None => Arc::new(HttpBridgeApi::new(&config)?),
        };
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector));
        let native_reader = self
            .native_reader
            .unwrap_or_else(|| Arc::new(UnsupportedReader));

        Ok(ScanBridge::from_parts(
            config,
            bridge_api,
            connector,
            native_reader,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ScanBridgeBuilder {
    /// Applies URL overrides on top of the base configuration.
    fn resolve_config(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(config) => config.clone(),
            None => BridgeConfig::from_env()?,
        };

        if let Some(url) = &self.http_url {
            config = config.with_http_url(url)?;
        }
        if let Some(url) = &self.ws_url {
            config = config.with_ws_url(url)?;
        }

        config.validate()?;
        Ok(config)
    }
}

impl fmt::Debug for ScanBridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanBridgeBuilder")
            .field("config", &self.config)
            .field("http_url", &self.http_url)
            .field("ws_url", &self.ws_url)
            .field("native_reader", &self.native_reader.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
