//! Transport builder
//!
//! The `TransportBuilder` provides a fluent API for configuring a transport
//! before its first socket is opened. It allows you to:
//! - Pass connection parameters (query, headers, timeouts)
//! - Swap the reconnection strategy (default: [`FixedDelay::default`])
//! - Plug in another [`Connector`]
//! - Route the transport's logs to a specific subscriber
//! - Configure observability (OpenTelemetry)
//! - Register listeners that must not miss the first events
//!
//! # Examples
//!
//! ```rust,no_run
//! use resock_transport::{EventKind, ExponentialBackoff, TransportBuilder};
//! use std::time::Duration;
//!
//! # async fn example() -> resock_core::Result<()> {
//! let transport = TransportBuilder::new("ws://localhost:4443")
//!     .with_reconnect(Box::new(
//!         ExponentialBackoff::new(Duration::from_millis(250), Duration::from_secs(10))
//!             .with_max_attempts(20),
//!     ))
//!     .on(EventKind::Failed, |event| eprintln!("{:?}", event))
//!     .build()?;
//!
//! let traced = TransportBuilder::new("ws://localhost:4443")
//!     .with_default_observability()
//!     .service_name("my-peer")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::connection_state::ConnectionManager;
use crate::events::{EventDispatcher, EventKind, Listener, TransportEvent};
use crate::metrics::TransportMetrics;
use crate::params::ConnectParams;
use crate::reconnect::{FixedDelay, NoReconnect, ReconnectionStrategy};
use crate::socket::Connector;
use crate::transport::{Transport, TransportParts};
use crate::ws::WsConnector;
use resock_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;
use tracing::{dispatcher, Dispatch};

/// Builder for configuring and creating a [`Transport`]
pub struct TransportBuilder {
    url: String,
    params: ConnectParams,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    connector: Option<Arc<dyn Connector>>,
    log_dispatch: Option<Dispatch>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
    listeners: Vec<(EventKind, Listener)>,
}

impl TransportBuilder {
    /// Create a new transport builder
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: ConnectParams::default(),
            reconnect_strategy: None,
            connector: None,
            log_dispatch: None,
            observability_config: None,
            service_name: None,
            listeners: Vec::new(),
        }
    }

    /// Set the connection parameters
    pub fn params(mut self, params: ConnectParams) -> Self {
        self.params = params;
        self
    }

    /// Reconnect with the given strategy
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }

    /// Reconnect every 500ms, at most 240 times (default)
    pub fn with_default_reconnect(mut self) -> Self {
        self.reconnect_strategy = Some(Box::new(FixedDelay::default()));
        self
    }

    /// Never reconnect; the first disconnect is terminal
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect_strategy = Some(Box::new(NoReconnect));
        self
    }

    /// Open sockets through `connector` instead of [`WsConnector`]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Send this transport's log events to `dispatch`
    ///
    /// Defaults to the dispatcher current when [`build`](Self::build) runs.
    pub fn with_log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Register a listener before the first socket is opened
    pub fn on<F>(mut self, kind: EventKind, listener: F) -> Self
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.listeners.push((kind, Arc::new(listener)));
        self
    }

    /// Build the transport and open its first socket
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when called outside a Tokio runtime or when the URL
    /// is empty or invalid; [`Error::Internal`] when observability fails to
    /// initialize.
    pub fn build(self) -> Result<Transport> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("no tokio runtime: {}", e)))?;

        // Global setup happens once per process; metrics are per transport
        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            resock_core::init_observability(config.clone()).map_err(|e| {
                Error::Internal(format!("Failed to initialize observability: {}", e))
            })?;

            Some(Arc::new(TransportMetrics::new(config.service_name.clone())))
        } else {
            None
        };

        let strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(FixedDelay::default()));
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::new()));
        let dispatch = self
            .log_dispatch
            .unwrap_or_else(|| dispatcher::get_default(Dispatch::clone));

        let events = EventDispatcher::new();
        for (kind, listener) in self.listeners {
            events.subscribe_shared(kind, listener);
        }

        Transport::start(TransportParts {
            url: self.url,
            params: self.params,
            manager: ConnectionManager::new(strategy),
            events,
            connector,
            dispatch,
            metrics,
            runtime,
        })
    }
}
