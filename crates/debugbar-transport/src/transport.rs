//! Reconnecting transport over an abstract message channel

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use debugbar_proto::WireMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::channel::{ChannelConnector, ChannelEvent, MessageChannel};
use crate::reconnect::{ReconnectPolicy, DEFAULT_RECONNECT_DELAY};
use crate::websocket::WebSocketConnector;

/// Liveness ping cadence while connected
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Outbound messages buffered per live session
const OUTBOUND_BUFFER: usize = 64;

/// Connection status broadcast to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:8080/_debugbar/ws`
    pub url: String,
    /// Retry after an abnormal close or failed open
    pub auto_reconnect: bool,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts before giving up (0 = unlimited)
    pub max_reconnect_attempts: u32,
    /// Liveness ping cadence
    pub ping_interval: Duration,
}

impl TransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_reconnect: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: 0,
            ping_interval: PING_INTERVAL,
        }
    }
}

/// Handle returned by subscribe calls; pass back to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type StatusHandler = Arc<dyn Fn(ConnectionStatus, Option<&str>) + Send + Sync>;
type MessageHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Reconnecting transport over an abstract channel
///
/// `connect()` spawns a driver task that owns the channel for its whole
/// lifetime: dialing, liveness pings, inbound dispatch, and reconnect
/// scheduling all happen on its select loop. Observers are invoked
/// synchronously from that task, each call isolated so one panicking
/// handler cannot starve the rest.
pub struct ReconnectingTransport {
    inner: Arc<Inner>,
}

struct Inner {
    config: TransportConfig,
    connector: Arc<dyn ChannelConnector>,
    status: Mutex<(ConnectionStatus, Option<String>)>,
    status_handlers: Mutex<HashMap<HandlerId, StatusHandler>>,
    message_handlers: Mutex<HashMap<HandlerId, MessageHandler>>,
    next_handler_id: AtomicU64,
    /// Present only while a session is connected; dropped on close so
    /// sends outside a session are discarded, never queued.
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    driver: Mutex<Option<Driver>>,
}

struct Driver {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Inner {
    fn set_status(&self, status: ConnectionStatus, error: Option<String>) {
        {
            let mut current = self.status.lock().unwrap();
            *current = (status, error.clone());
        }
        self.broadcast_status(status, error);
    }

    /// Driver-side status write: skipped once the driver is cancelled, so
    /// a stale transition can never overwrite an explicit disconnect. The
    /// check happens under the status lock, which also orders it against
    /// the disconnect write.
    fn set_status_checked(
        &self,
        cancel: &CancellationToken,
        status: ConnectionStatus,
        error: Option<String>,
    ) {
        {
            let mut current = self.status.lock().unwrap();
            if cancel.is_cancelled() {
                return;
            }
            *current = (status, error.clone());
        }
        self.broadcast_status(status, error);
    }

    fn broadcast_status(&self, status: ConnectionStatus, error: Option<String>) {
        let handlers: Vec<StatusHandler> = self
            .status_handlers
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(status, error.as_deref()))).is_err() {
                error!("status handler panicked");
            }
        }
    }

    fn dispatch_delivery(&self, delivery: &str) {
        let handlers: Vec<MessageHandler> = self
            .message_handlers
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(delivery))).is_err() {
                error!("message handler panicked");
            }
        }
    }
}

impl ReconnectingTransport {
    /// Create a transport that dials the configured endpoint over WebSocket
    pub fn new(config: TransportConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector::new()))
    }

    /// Create a transport over a custom channel implementation
    pub fn with_connector(config: TransportConfig, connector: Arc<dyn ChannelConnector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                status: Mutex::new((ConnectionStatus::Disconnected, None)),
                status_handlers: Mutex::new(HashMap::new()),
                message_handlers: Mutex::new(HashMap::new()),
                next_handler_id: AtomicU64::new(1),
                outbound: Mutex::new(None),
                driver: Mutex::new(None),
            }),
        }
    }

    /// Current status with the last error message, if any
    pub fn status(&self) -> (ConnectionStatus, Option<String>) {
        self.inner.status.lock().unwrap().clone()
    }

    /// Start the driver task; no-op while one is already running
    ///
    /// Must be called inside a tokio runtime. A manual reconnect after an
    /// exhausted attempt budget starts over with a fresh counter.
    pub fn connect(&self) {
        let mut driver = self.inner.driver.lock().unwrap();
        if let Some(active) = driver.as_ref() {
            if !active.handle.is_finished() {
                trace!("connect: driver already running");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_driver(self.inner.clone(), cancel.clone()));
        *driver = Some(Driver { handle, cancel });
    }

    /// Stop the driver, cancelling any pending reconnect or ping timer and
    /// closing the channel. Safe to call repeatedly.
    pub fn disconnect(&self) {
        if let Some(active) = self.inner.driver.lock().unwrap().take() {
            active.cancel.cancel();
        }
        self.inner.outbound.lock().unwrap().take();
        self.inner.set_status(ConnectionStatus::Disconnected, None);
    }

    /// Transmit one message if connected; silently dropped otherwise
    pub fn send(&self, text: String) {
        match self.inner.outbound.lock().unwrap().as_ref() {
            Some(tx) => {
                if tx.try_send(text).is_err() {
                    warn!("outbound buffer full, dropping message");
                }
            }
            None => trace!("send while not connected, dropping message"),
        }
    }

    /// Send a liveness ping
    pub fn ping(&self) {
        self.send(WireMessage::ping().to_json());
    }

    /// Register a status observer; immediately replayed the current status
    pub fn subscribe_status(
        &self,
        handler: impl Fn(ConnectionStatus, Option<&str>) + Send + Sync + 'static,
    ) -> HandlerId {
        let handler: StatusHandler = Arc::new(handler);
        let id = self.next_id();
        self.inner
            .status_handlers
            .lock()
            .unwrap()
            .insert(id, handler.clone());

        let (status, error) = self.status();
        if catch_unwind(AssertUnwindSafe(|| handler(status, error.as_deref()))).is_err() {
            error!("status handler panicked during replay");
        }
        id
    }

    /// Remove a status observer; unknown ids are ignored
    pub fn unsubscribe_status(&self, id: HandlerId) {
        self.inner.status_handlers.lock().unwrap().remove(&id);
    }

    /// Register an observer for raw channel deliveries
    pub fn subscribe_messages(
        &self,
        handler: impl Fn(&str) + Send + Sync + 'static,
    ) -> HandlerId {
        let id = self.next_id();
        self.inner
            .message_handlers
            .lock()
            .unwrap()
            .insert(id, Arc::new(handler));
        id
    }

    /// Remove a message observer; unknown ids are ignored
    pub fn unsubscribe_messages(&self, id: HandlerId) {
        self.inner.message_handlers.lock().unwrap().remove(&id);
    }

    /// Disconnect and release all observer registrations
    pub fn destroy(&self) {
        self.disconnect();
        self.inner.status_handlers.lock().unwrap().clear();
        self.inner.message_handlers.lock().unwrap().clear();
        debug!("transport destroyed");
    }

    fn next_id(&self) -> HandlerId {
        HandlerId(self.inner.next_handler_id.fetch_add(1, Ordering::Relaxed))
    }
}

enum SessionEnd {
    Cancelled,
    CleanClose,
    Lost(String),
}

async fn run_driver(inner: Arc<Inner>, cancel: CancellationToken) {
    let config = inner.config.clone();
    let mut policy = ReconnectPolicy::new(config.reconnect_delay, config.max_reconnect_attempts);

    loop {
        inner.set_status_checked(&cancel, ConnectionStatus::Connecting, None);

        let dialed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            dialed = inner.connector.connect(&config.url) => dialed,
        };

        match dialed {
            Ok(channel) => {
                policy.reset();
                info!(url = %config.url, "connected");
                match run_session(&inner, &cancel, channel, config.ping_interval).await {
                    SessionEnd::Cancelled => return,
                    SessionEnd::CleanClose => {
                        inner.set_status_checked(&cancel, ConnectionStatus::Disconnected, None);
                        return;
                    }
                    SessionEnd::Lost(reason) => {
                        warn!(%reason, "connection lost");
                        inner.set_status_checked(
                            &cancel,
                            ConnectionStatus::Error,
                            Some("Connection lost".to_string()),
                        );
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, url = %config.url, "failed to connect");
                inner.set_status_checked(&cancel, ConnectionStatus::Error, Some(e.to_string()));
            }
        }

        if !config.auto_reconnect {
            return;
        }
        let Some(delay) = policy.next_delay() else {
            inner.set_status_checked(
                &cancel,
                ConnectionStatus::Error,
                Some("Max reconnect attempts reached".to_string()),
            );
            return;
        };

        debug!(attempt = policy.attempt(), delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

enum Step {
    Shutdown,
    Ping,
    Outbound(String),
    Inbound(ChannelEvent),
}

async fn run_session(
    inner: &Arc<Inner>,
    cancel: &CancellationToken,
    mut channel: Box<dyn MessageChannel>,
    ping_interval: Duration,
) -> SessionEnd {
    let (tx, mut outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    *inner.outbound.lock().unwrap() = Some(tx);
    inner.set_status_checked(cancel, ConnectionStatus::Connected, None);

    let mut ping = tokio::time::interval_at(
        tokio::time::Instant::now() + ping_interval,
        ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let end = loop {
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Shutdown,
            _ = ping.tick() => Step::Ping,
            queued = outbound_rx.recv() => queued.map_or(Step::Shutdown, Step::Outbound),
            event = channel.next_event() => Step::Inbound(event),
        };

        match step {
            Step::Shutdown => {
                channel.close().await;
                break SessionEnd::Cancelled;
            }
            Step::Ping => {
                trace!("sending liveness ping");
                // A failed send surfaces as a close on the next read.
                let _ = channel.send(WireMessage::ping().to_json()).await;
            }
            Step::Outbound(text) => {
                let _ = channel.send(text).await;
            }
            Step::Inbound(ChannelEvent::Message(delivery)) => inner.dispatch_delivery(&delivery),
            Step::Inbound(ChannelEvent::Closed { clean: true, reason }) => {
                debug!(%reason, "channel closed cleanly");
                break SessionEnd::CleanClose;
            }
            Step::Inbound(ChannelEvent::Closed { clean: false, reason }) => {
                break SessionEnd::Lost(reason);
            }
        }
    };

    inner.outbound.lock().unwrap().take();
    end
}
