//! Persistent channel lifecycle.
//!
//! [`ConnectionManager`] owns the one persistent channel to the bridge. It
//! opens the channel, forwards typed events from it and, when the channel
//! drops uncleanly, reconnects on the [`ReconnectPolicy`] schedule.
//!
//! # States
//!
//! ```text
//!                connect()
//! Disconnected ─────────────► Connecting ──── open ────► Connected
//!      ▲                          │                          │
//!      │ exhausted / clean close  │ failed                   │ unclean close
//!      │                          ▼                          │
//!      └───────────────────── Backoff ◄──────────────────────┘
//!                                 │
//!                                 └── timer ──► Connecting
//! ```
//!
//! # Sessions
//!
//! Each open attempt runs as its own task tagged with an epoch. Every state
//! change is checked against the current epoch while holding the state
//! lock, so a session that was superseded by `disconnect()` or a fresh
//! `connect()` cannot change state or deliver events afterwards.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::BridgeConfig;
use crate::error::Error;
use crate::protocol::{BridgeCapability, BridgeEvent, BridgeMessage};
use crate::timer::{self, TimerToken};

use super::backoff::ReconnectPolicy;
use super::channel::{CLOSE_NORMAL, Connector, Frame};

// ============================================================================
// Types
// ============================================================================

/// Receiver of typed events from the channel.
///
/// Runs on the session task; must not block.
pub type EventSink = Arc<dyn Fn(BridgeEvent) + Send + Sync>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the persistent channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No channel and no reconnect scheduled.
    #[default]
    Disconnected,
    /// An open attempt is in flight.
    Connecting,
    /// The channel is open.
    Connected,
    /// Waiting for the reconnect timer.
    Backoff,
}

impl ConnectionState {
    /// Returns `true` while an attempt is in flight or the channel is open.
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Returns `true` if the channel is open.
    #[inline]
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff => "backoff",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Shared State
// ============================================================================

/// Handle to a running session task.
struct SessionHandle {
    epoch: u64,
    close_tx: oneshot::Sender<()>,
}

/// State shared between the manager, session tasks and the reconnect timer.
struct Shared {
    url: Url,
    connect_timeout: Duration,
    connector: Arc<dyn Connector>,
    on_event: EventSink,
    state_tx: watch::Sender<ConnectionState>,
    policy: Mutex<ReconnectPolicy>,
    reconnect_timer: Mutex<Option<TimerToken>>,
    session: Mutex<Option<SessionHandle>>,
    /// Bumped under the state lock whenever a session starts or is abandoned.
    epoch: AtomicU64,
}

impl Shared {
    #[inline]
    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Starts a new epoch. Call only under the state lock.
    #[inline]
    fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Applies `next` if `epoch` is still current.
    fn transition(&self, epoch: u64, next: ConnectionState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if self.current_epoch() != epoch {
                return false;
            }
            *state = next;
            true
        })
    }

    fn cancel_reconnect(&self) {
        if let Some(timer) = self.reconnect_timer.lock().take() {
            timer.cancel();
        }
    }

    fn spawn_session(self: &Arc<Self>, epoch: u64) {
        let (close_tx, close_rx) = oneshot::channel();
        *self.session.lock() = Some(SessionHandle { epoch, close_tx });

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.run_session(epoch, close_rx).await;
        });
    }

    async fn run_session(self: Arc<Self>, epoch: u64, mut close_rx: oneshot::Receiver<()>) {
        debug!(url = %self.url, epoch, "Opening bridge channel");

        let opened = tokio::select! {
            _ = &mut close_rx => {
                debug!(epoch, "Channel open abandoned");
                return;
            }
            result = timeout(self.connect_timeout, self.connector.connect(&self.url)) => result,
        };

        let mut channel = match opened {
            Ok(Ok(channel)) => channel,
            Ok(Err(e)) => {
                warn!(url = %self.url, error = %e, "Bridge channel failed to open");
                self.handle_closure(epoch, None);
                return;
            }
            Err(_) => {
                let e = Error::connection_timeout(self.connect_timeout.as_millis() as u64);
                warn!(url = %self.url, error = %e, "Bridge channel failed to open");
                self.handle_closure(epoch, None);
                return;
            }
        };

        if !self.transition(epoch, ConnectionState::Connected) {
            channel.close(CLOSE_NORMAL).await;
            return;
        }
        self.policy.lock().reset();
        info!(url = %self.url, "Bridge channel connected");

        let code = loop {
            tokio::select! {
                _ = &mut close_rx => {
                    channel.close(CLOSE_NORMAL).await;
                    debug!(epoch, "Bridge channel closed by client");
                    return;
                }
                frame = channel.recv() => match frame {
                    Frame::Text(text) => self.dispatch(epoch, &text),
                    Frame::Closed { code } => break code,
                },
            }
        };

        self.handle_closure(epoch, code);
    }

    /// Parses one text frame and forwards the event.
    fn dispatch(&self, epoch: u64, text: &str) {
        if self.current_epoch() != epoch {
            return;
        }

        let message = match BridgeMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed bridge message");
                return;
            }
        };

        let kind = message.kind.clone();
        match message.into_event() {
            Some(event) => {
                trace!(kind = event.kind(), "Bridge event received");
                (self.on_event)(event);
            }
            None => debug!(?kind, "Ignoring bridge message"),
        }
    }

    /// Decides what follows the end of session `epoch`.
    fn handle_closure(self: &Arc<Self>, epoch: u64, code: Option<u16>) {
        let mut delay = None;
        let clean = code == Some(CLOSE_NORMAL);

        let applied = self.state_tx.send_if_modified(|state| {
            if self.current_epoch() != epoch {
                return false;
            }
            if clean {
                *state = ConnectionState::Disconnected;
            } else {
                delay = self.policy.lock().next_delay();
                *state = if delay.is_some() {
                    ConnectionState::Backoff
                } else {
                    ConnectionState::Disconnected
                };
            }
            true
        });

        if !applied {
            trace!(epoch, "Stale session ended");
            return;
        }

        {
            let mut session = self.session.lock();
            if session.as_ref().is_some_and(|s| s.epoch == epoch) {
                *session = None;
            }
        }

        if clean {
            info!("Bridge channel closed normally");
            return;
        }

        match delay {
            Some(delay) => {
                let attempt = self.policy.lock().attempt();
                info!(
                    ?code,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Bridge channel lost, scheduling reconnect"
                );
                self.schedule_reconnect(epoch, delay);
            }
            None => {
                warn!(?code, "Reconnect attempts exhausted, bridge marked unavailable");
                (self.on_event)(BridgeEvent::Capability(BridgeCapability::unavailable()));
            }
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, epoch: u64, delay: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);

        let token = timer::schedule(delay, move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // Dropping our own token leaves nothing to cancel.
            drop(shared.reconnect_timer.lock().take());

            let mut next_epoch = 0;
            let resumed = shared.state_tx.send_if_modified(|state| {
                if *state != ConnectionState::Backoff || shared.current_epoch() != epoch {
                    return false;
                }
                next_epoch = shared.advance_epoch();
                *state = ConnectionState::Connecting;
                true
            });

            if resumed {
                debug!(epoch = next_epoch, "Reconnecting to bridge");
                shared.spawn_session(next_epoch);
            }
        });

        if let Some(previous) = self.reconnect_timer.lock().replace(token) {
            previous.cancel();
        }
    }
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owner of the persistent channel.
///
/// Dropping the manager disconnects.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Creates a manager for the channel described by `config`.
    ///
    /// Nothing is opened until [`connect`](Self::connect).
    pub fn new(config: &BridgeConfig, connector: Arc<dyn Connector>, on_event: EventSink) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            shared: Arc::new(Shared {
                url: config.ws_url.clone(),
                connect_timeout: config.connect_timeout,
                connector,
                on_event,
                state_tx,
                policy: Mutex::new(config.reconnect),
                reconnect_timer: Mutex::new(None),
                session: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Opens the channel.
    ///
    /// No-op while an attempt is in flight or the channel is open. From
    /// `Backoff` the pending timer is cancelled and a fresh attempt starts
    /// with the retry counter reset. Returns `true` if an attempt started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> bool {
        let shared = &self.shared;
        let mut epoch = 0;

        let started = shared.state_tx.send_if_modified(|state| {
            if state.is_active() {
                return false;
            }
            epoch = shared.advance_epoch();
            *state = ConnectionState::Connecting;
            true
        });

        if !started {
            debug!(state = %self.state(), "Connect ignored, channel already active");
            return false;
        }

        shared.cancel_reconnect();
        shared.policy.lock().reset();
        shared.spawn_session(epoch);
        true
    }

    /// Closes the channel with a normal close and cancels any reconnect.
    ///
    /// Idempotent.
    pub fn disconnect(&self) {
        let shared = &self.shared;

        let mut previous = ConnectionState::Disconnected;
        shared.state_tx.send_modify(|state| {
            shared.advance_epoch();
            previous = std::mem::replace(state, ConnectionState::Disconnected);
        });

        shared.cancel_reconnect();
        if let Some(session) = shared.session.lock().take() {
            let _ = session.close_tx.send(());
        }

        if previous != ConnectionState::Disconnected {
            info!(from = %previous, "Bridge channel disconnected");
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Returns `true` if the channel is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Returns the number of reconnect attempts since the last open.
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.shared.policy.lock().attempt()
    }

    /// Returns the channel URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.shared.url
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.shared.url.as_str())
            .field("state", &self.state())
            .field("reconnect_attempt", &self.reconnect_attempt())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
