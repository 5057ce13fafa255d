//! Store facade composing transport, decoder, and aggregator

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use debugbar_proto::codec;
use debugbar_transport::{ChannelConnector, ConnectionStatus, ReconnectingTransport};
use tokio::sync::watch;
use tracing::debug;

use crate::config::DebugBarConfig;
use crate::state::{DebugBarState, Tab};
use debugbar_proto::{ErrorInfo, QueryInfo, RequestInfo};

/// Single subscribable unit over the whole client
///
/// Owns one live snapshot and one transport. Decoded events and transport
/// status changes flow into the aggregator; every resulting snapshot
/// version is republished through a watch channel. Destroying the store
/// tears the transport down and latches the facade unusable.
pub struct DebugBarStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: DebugBarConfig,
    connector: Option<Arc<dyn ChannelConnector>>,
    state: Mutex<Arc<DebugBarState>>,
    publisher: watch::Sender<Arc<DebugBarState>>,
    transport: Mutex<Option<ReconnectingTransport>>,
    destroyed: AtomicBool,
}

impl StoreInner {
    /// Clone the current snapshot, apply one transition, republish
    fn update(&self, mutate: impl FnOnce(&mut DebugBarState)) {
        let mut slot = self.state.lock().unwrap();
        let mut next = DebugBarState::clone(&slot);
        mutate(&mut next);
        let next = Arc::new(next);
        *slot = next.clone();
        self.publisher.send_replace(next);
    }
}

impl DebugBarStore {
    /// Create a store over the production WebSocket channel
    ///
    /// Must be called inside a tokio runtime: with auto-connect on (the
    /// default), construction spawns the connection driver task.
    pub fn new(config: DebugBarConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a store over a custom channel implementation
    ///
    /// Same runtime requirement as [`DebugBarStore::new`].
    pub fn with_connector(config: DebugBarConfig, connector: Arc<dyn ChannelConnector>) -> Self {
        Self::build(config, Some(connector))
    }

    fn build(config: DebugBarConfig, connector: Option<Arc<dyn ChannelConnector>>) -> Self {
        let initial = Arc::new(DebugBarState::new(config.start_minimized));
        let (publisher, _) = watch::channel(initial.clone());
        let store = Self {
            inner: Arc::new(StoreInner {
                config,
                connector,
                state: Mutex::new(initial),
                publisher,
                transport: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            }),
        };

        if store.inner.config.auto_connect {
            store.init();
        }
        store
    }

    /// Create and wire the transport; no-op when already initialized or
    /// destroyed. Connects right away only when auto-connect is on.
    pub fn init(&self) {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return;
        }

        let mut transport = self.inner.transport.lock().unwrap();
        if transport.is_some() {
            return;
        }

        let transport_config = self.inner.config.transport_config();
        let created = match &self.inner.connector {
            Some(connector) => {
                ReconnectingTransport::with_connector(transport_config, connector.clone())
            }
            None => ReconnectingTransport::new(transport_config),
        };

        // Handlers hold a weak reference so transport and store never form
        // a cycle; a destroyed store simply stops reacting.
        let weak = Arc::downgrade(&self.inner);
        created.subscribe_status(move |status, error| {
            if let Some(inner) = weak.upgrade() {
                inner.update(|state| {
                    state.status = status;
                    state.error_message = error.map(str::to_owned);
                });
            }
        });

        let weak = Arc::downgrade(&self.inner);
        let max_requests = self.inner.config.max_requests;
        created.subscribe_messages(move |delivery| {
            if let Some(inner) = weak.upgrade() {
                for event in codec::decode_batch(delivery) {
                    inner.update(|state| state.apply_event(event, max_requests));
                }
            }
        });

        if self.inner.config.auto_connect {
            created.connect();
        }
        *transport = Some(created);
        debug!("debug bar store initialized");
    }

    /// Open the connection, creating the transport on first use
    pub fn connect(&self) {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return;
        }
        self.init();
        if let Some(transport) = self.inner.transport.lock().unwrap().as_ref() {
            transport.connect();
        }
    }

    /// Close the connection; the transport stays wired for a later connect
    pub fn disconnect(&self) {
        if let Some(transport) = self.inner.transport.lock().unwrap().as_ref() {
            transport.disconnect();
        }
    }

    /// Tear down the transport and stop reacting; safe to call repeatedly,
    /// the store is unusable afterwards
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(transport) = self.inner.transport.lock().unwrap().take() {
            transport.destroy();
        }
        debug!("debug bar store destroyed");
    }

    // Actions

    pub fn select_request(&self, id: Option<&str>) {
        self.inner.update(|state| state.select_request(id));
    }

    pub fn set_active_tab(&self, tab: Tab) {
        self.inner.update(|state| state.set_active_tab(tab));
    }

    pub fn toggle_minimized(&self) {
        self.inner.update(|state| state.toggle_minimized());
    }

    pub fn set_minimized(&self, minimized: bool) {
        self.inner.update(|state| state.set_minimized(minimized));
    }

    pub fn clear_requests(&self) {
        self.inner.update(|state| state.clear_requests());
    }

    // Reads

    /// Subscribe to snapshot versions; the receiver starts at the current one
    pub fn subscribe(&self) -> watch::Receiver<Arc<DebugBarState>> {
        self.inner.publisher.subscribe()
    }

    /// The current snapshot version
    pub fn snapshot(&self) -> Arc<DebugBarState> {
        self.inner.state.lock().unwrap().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.snapshot().status
    }

    pub fn requests(&self) -> Vec<RequestInfo> {
        self.snapshot().requests.clone()
    }

    pub fn selected_request(&self) -> Option<RequestInfo> {
        self.snapshot().selected_request().cloned()
    }

    pub fn active_tab(&self) -> Tab {
        self.snapshot().active_tab
    }

    pub fn minimized(&self) -> bool {
        self.snapshot().minimized
    }

    pub fn total_queries(&self) -> usize {
        self.snapshot().total_queries()
    }

    pub fn total_errors(&self) -> usize {
        self.snapshot().total_errors()
    }

    pub fn selected_queries(&self) -> Vec<QueryInfo> {
        self.snapshot().selected_queries().to_vec()
    }

    pub fn selected_errors(&self) -> Vec<ErrorInfo> {
        self.snapshot().selected_errors().to_vec()
    }
}
