//! Client facade.
//!
//! [`ScanBridge`] is the one handle application code holds. It wires the
//! probe, connection manager, coordinator and listener registry together
//! and exposes the status fields UI code renders.
//!
//! # Example
//!
//! ```no_run
//! use nfc_scan_bridge::ScanBridge;
//!
//! # async fn example() -> nfc_scan_bridge::Result<()> {
//! let bridge = ScanBridge::builder().build()?;
//! bridge.activate().await;
//!
//! let subscription = bridge.on_card_scanned(|serial| println!("scanned {serial}"));
//!
//! match bridge.scan_card().await.into_result() {
//!     Ok(serial) => println!("card {serial}"),
//!     Err(e) => eprintln!("scan failed: {e}"),
//! }
//!
//! bridge.unsubscribe(&subscription);
//! bridge.shutdown();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::{Result, ScanError};
use crate::identifiers::SubscriptionId;
use crate::scan::{NativeReader, PendingScan, ScanCoordinator, ScanOutcome, SubscriptionRegistry};
use crate::transport::{
    AvailabilityProbe, BridgeApi, ConnectionManager, ConnectionState, Connector,
};

use super::builder::ScanBridgeBuilder;
use super::bus::EventBus;
use super::status::{BridgeStatus, StatusBoard};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ScanBridgeInner {
    /// Resolved configuration.
    pub config: BridgeConfig,

    /// Bridge health check used by `activate`.
    pub probe: AvailabilityProbe,

    /// Persistent channel owner. Disconnects on drop.
    pub manager: ConnectionManager,

    /// Scan path selection.
    pub coordinator: ScanCoordinator,

    /// Pending "next scan" request.
    pub pending: Arc<PendingScan>,

    /// Long-lived scan listeners.
    pub registry: Arc<SubscriptionRegistry>,

    /// Observable status fields.
    pub status: Arc<StatusBoard>,

    /// Host NFC reader.
    pub native: Arc<dyn NativeReader>,

    /// Set once by `shutdown`.
    pub shut_down: AtomicBool,
}

// ============================================================================
// ScanBridge
// ============================================================================

/// NFC scan-bridge client.
///
/// Cloning is cheap; all clones share one connection, one pending scan slot
/// and one listener registry. The channel is closed by [`shutdown`] or when
/// the last clone is dropped.
///
/// [`shutdown`]: Self::shutdown
#[derive(Clone)]
pub struct ScanBridge {
    /// Shared inner state.
    pub(crate) inner: Arc<ScanBridgeInner>,
}

// ============================================================================
// ScanBridge - Display
// ============================================================================

impl fmt::Debug for ScanBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanBridge")
            .field("http_url", &self.inner.config.http_url.as_str())
            .field("ws_url", &self.inner.config.ws_url.as_str())
            .field("state", &self.connection_state())
            .field("listeners", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ScanBridge - Construction
// ============================================================================

impl ScanBridge {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ScanBridgeBuilder {
        ScanBridgeBuilder::new()
    }

    /// Creates a client configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds an invalid bridge URL.
    pub fn from_env() -> Result<Self> {
        ScanBridgeBuilder::new().build()
    }

    pub(crate) fn from_parts(
        config: BridgeConfig,
        api: Arc<dyn BridgeApi>,
        connector: Arc<dyn Connector>,
        native: Arc<dyn NativeReader>,
    ) -> Self {
        let pending = Arc::new(PendingScan::new());
        let registry = Arc::new(SubscriptionRegistry::new());
        let status = Arc::new(StatusBoard::new(native.is_supported()));

        let bus = Arc::new(EventBus::new(
            Arc::clone(&pending),
            Arc::clone(&registry),
            Arc::clone(&status),
        ));
        let manager = ConnectionManager::new(&config, connector, bus.into_sink());

        let coordinator = ScanCoordinator::new(
            &config,
            Arc::clone(&pending),
            Arc::clone(&api),
            Arc::clone(&native),
            Arc::clone(&status),
            manager.subscribe_state(),
        );

        Self {
            inner: Arc::new(ScanBridgeInner {
                probe: AvailabilityProbe::new(api, config.probe_timeout),
                config,
                manager,
                coordinator,
                pending,
                registry,
                status,
                native,
                shut_down: AtomicBool::new(false),
            }),
        }
    }
}

// ============================================================================
// ScanBridge - Lifecycle
// ============================================================================

impl ScanBridge {
    /// Probes the bridge once and opens the persistent channel if it answers.
    ///
    /// Also refreshes the stored native reader flag. Returns whether the
    /// bridge is available.
    pub async fn activate(&self) -> bool {
        let native_supported = self.inner.native.is_supported();
        self.inner.status.set_native_supported(native_supported);

        let available = self.inner.probe.check().await;
        self.inner.status.set_bridge_available(available);

        if available {
            self.connect_websocket();
        }

        info!(
            bridge_available = available,
            native_supported,
            "Scan bridge activated"
        );
        available
    }

    /// Opens the persistent channel.
    ///
    /// No-op while connecting or connected. Returns `true` if an attempt
    /// started.
    pub fn connect_websocket(&self) -> bool {
        if self.is_shut_down() {
            debug!("Connect ignored after shutdown");
            return false;
        }
        self.inner.manager.connect()
    }

    /// Closes the persistent channel and cancels any reconnect.
    pub fn disconnect_websocket(&self) {
        self.inner.manager.disconnect();
    }

    /// Tears the client down.
    ///
    /// Closes the channel, fails a waiting scan with
    /// [`ScanError::Cancelled`] and removes every listener. Runs once; later
    /// calls on any clone are no-ops.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.manager.disconnect();
        self.inner.pending.fail(ScanError::Cancelled);
        self.inner.registry.clear();
        info!("Scan bridge shut down");
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) ran.
    #[inline]
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

// ============================================================================
// ScanBridge - Scanning
// ============================================================================

impl ScanBridge {
    /// Waits for the next card.
    ///
    /// Always settles; failures are reported in the outcome.
    pub async fn scan_card(&self) -> ScanOutcome {
        if self.is_shut_down() {
            return ScanOutcome::failure(ScanError::Cancelled);
        }
        self.inner.coordinator.scan_card().await
    }

    /// Clears `is_scanning` and `error`.
    ///
    /// Does not cancel a scan in progress.
    pub fn stop_scanning(&self) {
        self.inner.status.stop_scanning();
    }

    /// Returns `true` if the host has a native NFC reader.
    ///
    /// Leaves [`is_supported`](Self::is_supported) untouched; the bridge is
    /// not considered.
    #[must_use]
    pub fn check_support(&self) -> bool {
        self.inner.native.is_supported()
    }

    /// Registers a listener for every scan on the persistent channel.
    pub fn on_card_scanned<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(callback)
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        self.inner.registry.unsubscribe(id)
    }
}

// ============================================================================
// ScanBridge - Status
// ============================================================================

impl ScanBridge {
    /// Returns `true` while a scan is in progress.
    #[inline]
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.inner.status.is_scanning()
    }

    /// Returns `true` if the bridge or a native reader is usable.
    #[inline]
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.inner.status.is_supported()
    }

    /// Returns `true` if the persistent channel is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.manager.is_connected()
    }

    /// Returns `true` if the bridge last reported a usable reader.
    #[inline]
    #[must_use]
    pub fn bridge_available(&self) -> bool {
        self.inner.status.bridge_available()
    }

    /// Returns the message of the last failed scan.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.inner.status.error()
    }

    /// Returns all status fields at once.
    #[must_use]
    pub fn status(&self) -> BridgeStatus {
        self.inner.status.snapshot(self.is_connected())
    }

    /// Returns the persistent channel state.
    #[inline]
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.manager.state()
    }

    /// Returns a receiver that observes channel state changes.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.inner.manager.subscribe_state()
    }

    /// Returns the reconnect attempts made since the channel was last open.
    #[inline]
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.manager.reconnect_attempt()
    }

    /// Returns the resolved configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::time::sleep;

    use crate::protocol::BridgeCapability;
    use crate::testing::{
        ConnectStep, FakeBridge, FakeBridgeApi, FakeConnector, FakeNativeReader, init_tracing,
    };
    use crate::transport::CLOSE_NORMAL;

    fn usable() -> BridgeCapability {
        BridgeCapability {
            nfc_available: true,
            reader_connected: true,
        }
    }

    fn bridge(api: &FakeBridgeApi, connector: &FakeConnector) -> ScanBridge {
        init_tracing();
        ScanBridge::builder()
            .config(BridgeConfig::new())
            .bridge_api(api.clone())
            .connector(connector.clone())
            .native_reader(FakeNativeReader::unsupported())
            .build()
            .expect("build")
    }

    async fn connected(bridge: &ScanBridge, connector: &FakeConnector) -> FakeBridge {
        assert!(bridge.activate().await);
        let end = connector.accept().await;
        bridge
            .watch_connection()
            .wait_for(|state| state.is_connected())
            .await
            .expect("manager alive");
        end
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_connects_when_bridge_available() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);

        let _end = connected(&bridge, &connector).await;
        let status = bridge.status();
        assert!(status.is_connected);
        assert!(status.bridge_available);
        assert!(status.is_supported);
        assert!(!status.is_scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_without_bridge_stays_disconnected() {
        let api = FakeBridgeApi::new();
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);

        assert!(!bridge.activate().await);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
        assert!(connector.connect_times().is_empty());
        assert!(!bridge.is_supported());
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_scan_reaches_caller_and_every_listener_once() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let end = connected(&bridge, &connector).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..3 {
            let seen = Arc::clone(&seen);
            bridge.on_card_scanned(move |serial| seen.lock().push(serial.to_string()));
        }

        let scanner = bridge.clone();
        let scan = tokio::spawn(async move { scanner.scan_card().await });
        tokio::task::yield_now().await;
        assert!(bridge.is_scanning());

        end.send_scan("04AABBCC");
        assert_eq!(scan.await.expect("scan task"), ScanOutcome::success("04AABBCC"));

        assert_eq!(*seen.lock(), vec!["04AABBCC"; 3]);
        assert!(!bridge.is_scanning());
        assert_eq!(api.scan_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_listener_does_not_block_others() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let end = connected(&bridge, &connector).await;

        let calls = Arc::new(AtomicUsize::new(0));
        bridge.on_card_scanned(|_| panic!("listener bug"));
        let counter = Arc::clone(&calls);
        bridge.on_card_scanned(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        end.send_scan("A1");
        end.send_scan("A2");

        while calls.load(Ordering::SeqCst) < 2 {
            sleep(Duration::from_millis(10)).await;
        }
        assert!(bridge.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribed_listener_is_not_called() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let end = connected(&bridge, &connector).await;

        let removed_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&removed_calls);
        let id = bridge.on_card_scanned(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(bridge.unsubscribe(&id));

        let scanner = bridge.clone();
        let scan = tokio::spawn(async move { scanner.scan_card().await });
        tokio::task::yield_now().await;
        end.send_scan("B2");

        assert!(scan.await.expect("scan").is_success());
        assert_eq!(removed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_uses_at_most_two_probes() {
        let api = FakeBridgeApi::new();
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);

        bridge.activate().await;
        let outcome = bridge.scan_card().await;

        assert_eq!(outcome, ScanOutcome::failure(ScanError::Unavailable));
        assert!(api.status_calls() <= 2);
        assert_eq!(api.scan_calls(), 0);
        assert_eq!(bridge.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_exhausted_marks_bridge_unavailable() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Fail);
        let bridge = bridge(&api, &connector);

        assert!(bridge.activate().await);
        assert!(bridge.bridge_available());

        sleep(Duration::from_secs(120)).await;

        assert_eq!(connector.connect_times().len(), 6);
        assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);
        assert!(!bridge.bridge_available());
        assert_eq!(bridge.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_updates_capability() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let end = connected(&bridge, &connector).await;

        end.send_text(r#"{"type":"CONNECTED","nfc_available":false,"reader_connected":false}"#);
        while bridge.bridge_available() {
            sleep(Duration::from_millis(10)).await;
        }
        assert!(!bridge.is_supported());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_scanning_clears_flags() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let _end = connected(&bridge, &connector).await;

        let scanner = bridge.clone();
        let scan = tokio::spawn(async move { scanner.scan_card().await });
        tokio::task::yield_now().await;
        assert!(bridge.is_scanning());

        bridge.stop_scanning();
        assert!(!bridge.is_scanning());
        assert!(!scan.is_finished());

        assert_eq!(
            scan.await.expect("scan"),
            ScanOutcome::failure(ScanError::timeout(35_000))
        );
        assert_eq!(bridge.error().as_deref(), Some("Scan timeout after 35000ms"));

        bridge.stop_scanning();
        assert_eq!(bridge.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_and_clears_listeners() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let mut end = connected(&bridge, &connector).await;
        bridge.on_card_scanned(|_| {});

        let scanner = bridge.clone();
        let scan = tokio::spawn(async move { scanner.scan_card().await });
        tokio::task::yield_now().await;

        bridge.shutdown();
        bridge.shutdown();

        assert_eq!(
            scan.await.expect("scan"),
            ScanOutcome::failure(ScanError::Cancelled)
        );
        assert_eq!(end.closed_with().await, Some(CLOSE_NORMAL));
        assert_eq!(bridge.inner.registry.len(), 0);
        assert!(!bridge.connect_websocket());
        assert_eq!(
            bridge.scan_card().await,
            ScanOutcome::failure(ScanError::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_disconnects() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let mut end = connected(&bridge, &connector).await;

        let clone = bridge.clone();
        drop(bridge);
        assert!(clone.is_connected());

        drop(clone);
        assert_eq!(end.closed_with().await, Some(CLOSE_NORMAL));
    }

    #[tokio::test]
    async fn test_websocket_end_to_end() -> anyhow::Result<()> {
        use futures_util::{SinkExt, StreamExt};
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await?;
            let mut ws = accept_async(stream).await?;
            ws.send(Message::Text(
                r#"{"type":"CONNECTED","nfc_available":true,"reader_connected":true}"#
                    .to_string()
                    .into(),
            ))
            .await?;

            let _ = release_rx.await;
            ws.send(Message::Text(
                r#"{"type":"SCAN","uid":"04AABBCC"}"#.to_string().into(),
            ))
            .await?;

            let code = loop {
                match ws.next().await {
                    Some(Ok(Message::Close(frame))) => break frame.map(|f| u16::from(f.code)),
                    Some(Ok(_)) => continue,
                    _ => break None,
                }
            };
            anyhow::Ok(code)
        });

        let bridge = ScanBridge::builder()
            .config(BridgeConfig::new())
            .ws_url(format!("ws://127.0.0.1:{port}"))
            .bridge_api(FakeBridgeApi::new().with_status(usable()))
            .build()?;

        assert!(bridge.activate().await);
        bridge
            .watch_connection()
            .wait_for(|state| state.is_connected())
            .await?;

        let scanner = bridge.clone();
        let scan = tokio::spawn(async move { scanner.scan_card().await });
        while !bridge.inner.pending.is_pending() {
            tokio::task::yield_now().await;
        }
        release_tx
            .send(())
            .map_err(|()| anyhow::anyhow!("server task ended early"))?;

        assert_eq!(scan.await?, ScanOutcome::success("04AABBCC"));
        assert!(bridge.bridge_available());

        bridge.shutdown();
        assert_eq!(server.await??, Some(CLOSE_NORMAL));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_support() {
        init_tracing();
        let api = FakeBridgeApi::new();
        let bridge = ScanBridge::builder()
            .config(BridgeConfig::new())
            .bridge_api(api)
            .connector(FakeConnector::new(ConnectStep::Fail))
            .native_reader(FakeNativeReader::supported(Vec::new()))
            .build()
            .expect("build");

        assert!(bridge.check_support());
        assert!(bridge.is_supported());
        assert!(!bridge.bridge_available());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_support_ignores_bridge() {
        let api = FakeBridgeApi::new().with_status(usable());
        let connector = FakeConnector::new(ConnectStep::Open);
        let bridge = bridge(&api, &connector);
        let _end = connected(&bridge, &connector).await;

        assert!(bridge.bridge_available());
        assert!(!bridge.check_support());
        assert!(bridge.is_supported());
        assert!(bridge.status().is_supported);
    }
}
