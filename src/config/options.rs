//! Bridge endpoints and timing configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use nfc_scan_bridge::BridgeConfig;
//!
//! # fn example() -> nfc_scan_bridge::Result<()> {
//! let config = BridgeConfig::new()
//!     .with_http_url("http://127.0.0.1:4100")?
//!     .with_ws_url("ws://127.0.0.1:4100/events")?
//!     .with_scan_timeout(Duration::from_secs(20));
//!
//! config.validate()?;
//! assert_eq!(config.status_url()?.as_str(), "http://127.0.0.1:4100/status");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the bridge HTTP origin.
pub const HTTP_URL_ENV: &str = "NFC_BRIDGE_URL";

/// Environment variable holding the bridge WebSocket origin.
pub const WS_URL_ENV: &str = "NFC_BRIDGE_WS_URL";

/// HTTP origin used for local development.
pub const DEFAULT_HTTP_URL: &str = "http://localhost:3001";

/// WebSocket origin used for local development.
pub const DEFAULT_WS_URL: &str = "ws://localhost:3001";

/// Bound on the availability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound on a bridge scan (channel or one-shot request).
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(35);

/// Bound on a native reader session.
pub const DEFAULT_NATIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound on opening the persistent channel.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// BridgeConfig
// ============================================================================

/// Where the bridge lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// HTTP origin for `/status` and `/scan`.
    pub http_url: Url,

    /// WebSocket URL of the persistent event channel.
    pub ws_url: Url,

    /// Availability probe deadline.
    pub probe_timeout: Duration,

    /// Deadline for a scan through the bridge.
    pub scan_timeout: Duration,

    /// Deadline for a native reader session.
    pub native_timeout: Duration,

    /// Deadline for opening the persistent channel.
    pub connect_timeout: Duration,

    /// Backoff applied after unclean channel closures.
    pub reconnect: ReconnectPolicy,
}

// ============================================================================
// Constructors
// ============================================================================

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeConfig {
    /// Creates a configuration pointing at the local development bridge.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_url: local_default(DEFAULT_HTTP_URL),
            ws_url: local_default(DEFAULT_WS_URL),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            native_timeout: DEFAULT_NATIVE_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Creates a configuration from `NFC_BRIDGE_URL` and `NFC_BRIDGE_WS_URL`.
    ///
    /// Unset or empty variables fall back to the local defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable holds an unusable URL.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary variable lookup.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(http) = lookup(HTTP_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config = config.with_http_url(http.trim())?;
        }

        if let Some(ws) = lookup(WS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config = config.with_ws_url(ws.trim())?;
        }

        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeConfig {
    /// Sets the HTTP origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `url` does not parse.
    pub fn with_http_url(mut self, url: &str) -> Result<Self> {
        self.http_url = Url::parse(url)?;
        Ok(self)
    }

    /// Sets the WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `url` does not parse.
    pub fn with_ws_url(mut self, url: &str) -> Result<Self> {
        self.ws_url = Url::parse(url)?;
        Ok(self)
    }

    /// Sets the availability probe deadline.
    #[inline]
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the bridge scan deadline.
    #[inline]
    #[must_use]
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Sets the native session deadline.
    #[inline]
    #[must_use]
    pub fn with_native_timeout(mut self, timeout: Duration) -> Self {
        self.native_timeout = timeout;
        self
    }

    /// Sets the channel open deadline.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reconnect backoff.
    #[inline]
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }
}

// ============================================================================
// Derived Endpoints
// ============================================================================

impl BridgeConfig {
    /// Returns the `/status` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP origin cannot carry a path.
    pub fn status_url(&self) -> Result<Url> {
        endpoint(&self.http_url, "status")
    }

    /// Returns the `/scan` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP origin cannot carry a path.
    pub fn scan_url(&self) -> Result<Url> {
        endpoint(&self.http_url, "scan")
    }

    /// Validates schemes and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.http_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "{HTTP_URL_ENV} must use http or https, got '{}'",
                self.http_url.scheme()
            )));
        }

        if !matches!(self.ws_url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "{WS_URL_ENV} must use ws or wss, got '{}'",
                self.ws_url.scheme()
            )));
        }

        let timeouts = [
            ("probe_timeout", self.probe_timeout),
            ("scan_timeout", self.scan_timeout),
            ("native_timeout", self.native_timeout),
            ("connect_timeout", self.connect_timeout),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, t)| t.is_zero()) {
            return Err(Error::config(format!("{name} must be greater than zero")));
        }

        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses one of the built-in default URLs.
fn local_default(url: &str) -> Url {
    Url::parse(url).unwrap_or_else(|e| unreachable!("built-in default '{url}' is invalid: {e}"))
}

/// Appends a path segment to `base`, keeping any existing path prefix.
fn endpoint(base: &Url, segment: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::config(format!("'{base}' cannot be used as a base URL")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
