//! Connection parameters forwarded to the socket on every (re)connect
//!
//! `ConnectParams` derives `Deserialize`, so it can be loaded straight from
//! a JSON configuration block:
//!
//! ```rust
//! use resock_transport::ConnectParams;
//!
//! let params: ConnectParams = serde_json::from_value(serde_json::json!({
//!     "query": {"roomId": "r1", "peerId": "p1"},
//!     "connect_timeout_ms": 5000
//! })).unwrap();
//!
//! assert_eq!(params.query["roomId"], "r1");
//! assert_eq!(params.retry_delay_ms, 1000);
//! ```

use resock_core::util::duration_to_millis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 20_000;

/// Default wait between failed handshakes of a socket that never connected
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Options for opening a socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectParams {
    /// Query parameters appended to the connection URL
    pub query: BTreeMap<String, String>,
    /// Extra headers sent with the WebSocket handshake
    pub headers: BTreeMap<String, String>,
    /// Handshake timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Wait between failed handshakes, in milliseconds
    pub retry_delay_ms: u64,
    /// How many failed handshakes a socket retries before reporting an
    /// error; `None` retries forever
    pub retry_attempts: Option<u32>,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            retry_attempts: None,
        }
    }
}

impl ConnectParams {
    /// Default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a handshake header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the handshake timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_to_millis(timeout);
        self
    }

    /// Set the wait between failed handshakes
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = duration_to_millis(delay);
        self
    }

    /// Limit handshake retries of a socket that has not connected yet
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Handshake timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Wait between failed handshakes
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
