//! Debug bar client configuration

use std::time::Duration;

use debugbar_transport::TransportConfig;

/// Where the bar is docked (display-only, carried for UI consumers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Bottom,
    Top,
    Left,
    Right,
}

/// Debug bar configuration
///
/// Only the endpoint URL is required; everything else starts from the
/// defaults set in [`DebugBarConfig::new`].
#[derive(Debug, Clone)]
pub struct DebugBarConfig {
    /// WebSocket endpoint, e.g. `ws://localhost:8080/_debugbar/ws`
    pub ws_url: String,
    /// Connect on construction
    pub auto_connect: bool,
    /// Retry on abnormal close
    pub auto_reconnect: bool,
    /// Delay between reconnect attempts
    pub reconnect_delay: Duration,
    /// Maximum reconnect attempts (0 = unlimited)
    pub max_reconnect_attempts: u32,
    /// Retention bound for tracked requests; oldest evicted first
    pub max_requests: usize,
    /// Start with the bar minimized
    pub start_minimized: bool,
    /// Docking position (display-only)
    pub position: Position,
    /// Default height/width in pixels (display-only)
    pub default_size: u32,
}

impl DebugBarConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            auto_connect: true,
            auto_reconnect: true,
            reconnect_delay: Duration::from_millis(3000),
            max_reconnect_attempts: 0,
            max_requests: 100,
            start_minimized: false,
            position: Position::default(),
            default_size: 300,
        }
    }

    pub fn auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn max_requests(mut self, max: usize) -> Self {
        self.max_requests = max;
        self
    }

    pub fn start_minimized(mut self, minimized: bool) -> Self {
        self.start_minimized = minimized;
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn default_size(mut self, size: u32) -> Self {
        self.default_size = size;
        self
    }

    /// The subset the transport cares about
    pub(crate) fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::new(self.ws_url.clone());
        config.auto_reconnect = self.auto_reconnect;
        config.reconnect_delay = self.reconnect_delay;
        config.max_reconnect_attempts = self.max_reconnect_attempts;
        config
    }
}
