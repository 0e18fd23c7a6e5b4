//! HTTP side of the bridge and the availability probe.
//!
//! [`BridgeApi`] covers the two request/response endpoints. The probe turns
//! `GET /status` into a plain yes/no within a short deadline: any failure
//! simply means "not available".

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::protocol::{ScanResponse, StatusResponse};
use crate::timer::deadline;

// ============================================================================
// BridgeApi
// ============================================================================

/// Request/response endpoints of the bridge.
#[async_trait]
pub trait BridgeApi: Send + Sync + 'static {
    /// `GET /status`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// undecodable body.
    async fn status(&self) -> Result<StatusResponse>;

    /// `GET /scan`. Blocks on the bridge until a card is read or the
    /// bridge gives up.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// undecodable body.
    async fn scan(&self) -> Result<ScanResponse>;
}

// ============================================================================
// HttpBridgeApi
// ============================================================================

/// [`BridgeApi`] over HTTP with `reqwest`.
///
/// Requests carry no timeout of their own; callers bound them.
#[derive(Debug, Clone)]
pub struct HttpBridgeApi {
    client: Client,
    status_url: Url,
    scan_url: Url,
}

impl HttpBridgeApi {
    /// Creates an API client for the bridge described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoints cannot be derived or the HTTP
    /// client cannot be built.
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            status_url: config.status_url()?,
            scan_url: config.scan_url()?,
        })
    }
}

#[async_trait]
impl BridgeApi for HttpBridgeApi {
    async fn status(&self) -> Result<StatusResponse> {
        let status = self
            .client
            .get(self.status_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<StatusResponse>()
            .await?;
        Ok(status)
    }

    async fn scan(&self) -> Result<ScanResponse> {
        let response = self
            .client
            .get(self.scan_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<ScanResponse>()
            .await?;
        Ok(response)
    }
}

// ============================================================================
// AvailabilityProbe
// ============================================================================

/// One-shot, time-bounded bridge health check.
#[derive(Clone)]
pub struct AvailabilityProbe {
    api: Arc<dyn BridgeApi>,
    timeout: Duration,
}

impl AvailabilityProbe {
    /// Creates a probe.
    #[must_use]
    pub fn new(api: Arc<dyn BridgeApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// Fetches the bridge status within the probe deadline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`](crate::Error::Timeout) if the bridge does
    /// not answer in time, otherwise the request error.
    pub async fn status(&self) -> Result<StatusResponse> {
        deadline("bridge status", self.timeout, self.api.status()).await
    }

    /// Returns `true` if the bridge answers in time and has a usable reader.
    ///
    /// Never fails. An unreachable bridge is expected and logged at debug;
    /// a bridge that answers with something unusable is logged as a warning.
    pub async fn check(&self) -> bool {
        match self.status().await {
            Ok(status) => {
                debug!(
                    nfc_available = status.nfc_available,
                    reader_connected = status.reader_connected,
                    "Bridge status received"
                );
                status.is_usable()
            }
            Err(e) if e.is_recoverable() => {
                debug!(error = %e, "Bridge not reachable");
                false
            }
            Err(e) => {
                warn!(error = %e, "Bridge returned an unusable status");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
