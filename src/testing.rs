//! In-process fakes for unit tests.
//!
//! | Fake | Stands in for |
//! |------|---------------|
//! | [`FakeConnector`] | WebSocket connector, with a scriptable bridge end |
//! | [`FakeBridgeApi`] | `GET /status` and `GET /scan` |
//! | [`FakeNativeReader`] | Host NFC reader |

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{BridgeCapability, ScanResponse, StatusResponse};
use crate::scan::{NativeEvent, NativeReader, NativeSession};
use crate::transport::{BridgeApi, Channel, Connector, Frame};

// ============================================================================
// Logging
// ============================================================================

/// Routes `tracing` output to the test harness. Honors `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// FakeConnector
// ============================================================================

/// What a connect attempt does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectStep {
    /// Fails immediately.
    Fail,
    /// Opens a channel.
    Open,
    /// Never completes.
    Hang,
}

struct ConnectorInner {
    script: Mutex<VecDeque<ConnectStep>>,
    fallback: ConnectStep,
    times: Mutex<Vec<Instant>>,
    opened_tx: mpsc::UnboundedSender<FakeBridge>,
    opened_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<FakeBridge>>,
}

/// Scriptable [`Connector`].
///
/// Queued steps run first; afterwards every attempt follows the fallback.
#[derive(Clone)]
pub(crate) struct FakeConnector {
    inner: Arc<ConnectorInner>,
}

impl FakeConnector {
    pub(crate) fn new(fallback: ConnectStep) -> Self {
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(ConnectorInner {
                script: Mutex::new(VecDeque::new()),
                fallback,
                times: Mutex::new(Vec::new()),
                opened_tx,
                opened_rx: tokio::sync::Mutex::new(opened_rx),
            }),
        }
    }

    /// Queues a step for the next attempt.
    pub(crate) fn push(&self, step: ConnectStep) {
        self.inner.script.lock().push_back(step);
    }

    /// Instants of every connect attempt.
    pub(crate) fn connect_times(&self) -> Vec<Instant> {
        self.inner.times.lock().clone()
    }

    /// Waits for the next opened channel and returns its bridge end.
    pub(crate) async fn accept(&self) -> FakeBridge {
        self.inner
            .opened_rx
            .lock()
            .await
            .recv()
            .await
            .expect("connector alive")
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &Url) -> Result<Box<dyn Channel>> {
        self.inner.times.lock().push(Instant::now());
        let step = self
            .inner
            .script
            .lock()
            .pop_front()
            .unwrap_or(self.inner.fallback);

        match step {
            ConnectStep::Fail => Err(Error::connection("connection refused")),
            ConnectStep::Hang => pending().await,
            ConnectStep::Open => {
                let (frames_tx, frames_rx) = mpsc::unbounded_channel();
                let (closes_tx, closes_rx) = mpsc::unbounded_channel();
                let _ = self.inner.opened_tx.send(FakeBridge {
                    frames: frames_tx,
                    closes: closes_rx,
                });
                Ok(Box::new(FakeChannel {
                    frames: frames_rx,
                    closes: closes_tx,
                }))
            }
        }
    }
}

/// Client end of a fake channel.
struct FakeChannel {
    frames: mpsc::UnboundedReceiver<Frame>,
    closes: mpsc::UnboundedSender<u16>,
}

#[async_trait]
impl Channel for FakeChannel {
    async fn recv(&mut self) -> Frame {
        self.frames
            .recv()
            .await
            .unwrap_or(Frame::Closed { code: None })
    }

    async fn close(&mut self, code: u16) {
        let _ = self.closes.send(code);
    }
}

/// Bridge end of a fake channel.
pub(crate) struct FakeBridge {
    frames: mpsc::UnboundedSender<Frame>,
    closes: mpsc::UnboundedReceiver<u16>,
}

impl FakeBridge {
    pub(crate) fn send_text(&self, text: &str) {
        let _ = self.frames.send(Frame::Text(text.to_string()));
    }

    pub(crate) fn send_scan(&self, uid: &str) {
        self.send_text(&serde_json::json!({ "type": "SCAN", "uid": uid }).to_string());
    }

    /// Ends the channel as the bridge would.
    pub(crate) fn close(&self, code: Option<u16>) {
        let _ = self.frames.send(Frame::Closed { code });
    }

    /// Waits for the client to close, returning its close code.
    pub(crate) async fn closed_with(&mut self) -> Option<u16> {
        self.closes.recv().await
    }
}

// ============================================================================
// FakeBridgeApi
// ============================================================================

#[derive(Default)]
struct ApiInner {
    status: Mutex<Option<StatusResponse>>,
    status_delay: Mutex<Duration>,
    scan: Mutex<Option<ScanResponse>>,
    scan_delay: Mutex<Duration>,
    status_calls: AtomicUsize,
    scan_calls: AtomicUsize,
}

/// Scriptable [`BridgeApi`]. Unreachable unless configured otherwise.
#[derive(Clone, Default)]
pub(crate) struct FakeBridgeApi {
    inner: Arc<ApiInner>,
}

impl FakeBridgeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_status(self, status: BridgeCapability) -> Self {
        *self.inner.status.lock() = Some(status);
        self
    }

    pub(crate) fn with_status_delay(self, delay: Duration) -> Self {
        *self.inner.status_delay.lock() = delay;
        self
    }

    pub(crate) fn with_scan(self, response: ScanResponse) -> Self {
        *self.inner.scan.lock() = Some(response);
        self
    }

    pub(crate) fn with_scan_delay(self, delay: Duration) -> Self {
        *self.inner.scan_delay.lock() = delay;
        self
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.inner.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn scan_calls(&self) -> usize {
        self.inner.scan_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BridgeApi for FakeBridgeApi {
    async fn status(&self) -> Result<StatusResponse> {
        self.inner.status_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.status_delay.lock();
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let status = *self.inner.status.lock();
        status.ok_or_else(|| Error::connection("bridge unreachable"))
    }

    async fn scan(&self) -> Result<ScanResponse> {
        self.inner.scan_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.scan_delay.lock();
        if !delay.is_zero() {
            sleep(delay).await;
        }

        let response = self.inner.scan.lock().clone();
        response.ok_or_else(|| Error::connection("bridge unreachable"))
    }
}

// ============================================================================
// FakeNativeReader
// ============================================================================

struct NativeInner {
    supported: bool,
    events: Vec<NativeEvent>,
    start_error: Option<String>,
    hold_open: bool,
    /// Senders kept alive for sessions that must not end.
    held: Mutex<Vec<mpsc::Sender<NativeEvent>>>,
    sessions: AtomicUsize,
}

/// Scriptable [`NativeReader`]. Every session replays the same events.
#[derive(Clone)]
pub(crate) struct FakeNativeReader {
    inner: Arc<NativeInner>,
}

impl FakeNativeReader {
    fn build(supported: bool, events: Vec<NativeEvent>) -> Self {
        Self {
            inner: Arc::new(NativeInner {
                supported,
                events,
                start_error: None,
                hold_open: false,
                held: Mutex::new(Vec::new()),
                sessions: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn unsupported() -> Self {
        Self::build(false, Vec::new())
    }

    pub(crate) fn supported(events: Vec<NativeEvent>) -> Self {
        Self::build(true, events)
    }

    /// Makes `start_session` fail.
    pub(crate) fn failing_start(self, message: &str) -> Self {
        self.modify(|inner| inner.start_error = Some(message.to_string()))
    }

    /// Keeps sessions open after the scripted events.
    pub(crate) fn holding_open(self) -> Self {
        self.modify(|inner| inner.hold_open = true)
    }

    pub(crate) fn sessions_started(&self) -> usize {
        self.inner.sessions.load(Ordering::SeqCst)
    }

    fn modify(self, f: impl FnOnce(&mut NativeInner)) -> Self {
        let mut inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(_) => panic!("configure the fake reader before cloning it"),
        };
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }
}

#[async_trait]
impl NativeReader for FakeNativeReader {
    fn is_supported(&self) -> bool {
        self.inner.supported
    }

    async fn start_session(&self) -> Result<NativeSession> {
        self.inner.sessions.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.inner.start_error {
            return Err(Error::native_session(message.clone()));
        }

        let (tx, session) = NativeSession::channel(self.inner.events.len() + 1);
        for event in &self.inner.events {
            let _ = tx.try_send(event.clone());
        }
        if self.inner.hold_open {
            self.inner.held.lock().push(tx);
        }
        Ok(session)
    }
}
