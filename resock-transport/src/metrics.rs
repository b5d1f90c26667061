//! Transport metrics definitions
//!
//! OpenTelemetry instruments describing transport health. They are exported
//! through whatever meter provider [`resock_core::init_observability`]
//! installed; without one the global no-op provider swallows them.
//!
//! # Metrics Collected
//!
//! - **connection.state**: current [`ConnectionState`] code (gauge)
//! - **messages.sent**: frames written by `send` (counter)
//! - **messages.received**: decoded messages delivered to listeners (counter)
//! - **messages.dropped**: inbound frames dropped, by `reason` (counter)
//! - **reconnection.attempts**: replacement sockets opened (counter)
//! - **reconnection.success**: replacement sockets that connected (counter)
//! - **errors.total**: socket and send errors, by `error_type` (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use resock_transport::TransportMetrics;
//!
//! let metrics = TransportMetrics::new("my-service");
//! metrics.record_sent();
//! ```

use crate::connection_state::ConnectionState;
use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Meter},
    KeyValue,
};

/// Transport metrics for monitoring
pub struct TransportMetrics {
    /// Connection state (see [`ConnectionState::code`])
    pub connection_state: Gauge<i64>,
    /// Total number of messages sent
    pub messages_sent: Counter<u64>,
    /// Total number of messages delivered to listeners
    pub messages_received: Counter<u64>,
    /// Total number of inbound frames dropped
    pub messages_dropped: Counter<u64>,
    /// Total number of reconnection attempts
    pub reconnection_attempts: Counter<u64>,
    /// Total number of successful reconnections
    pub reconnection_success: Counter<u64>,
    /// Total number of errors
    pub errors_total: Counter<u64>,
}

impl TransportMetrics {
    /// Create metrics on the global meter named `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        // meter names must be 'static; one leak per transport built with observability
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a custom meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            connection_state: meter
                .i64_gauge("resock.transport.connection.state")
                .with_description("Connection state (0=disconnected, 1=connecting, 2=connected, 3=reconnecting, 4=failed, 5=closed)")
                .build(),
            messages_sent: meter
                .u64_counter("resock.transport.messages.sent")
                .with_description("Total number of messages sent")
                .build(),
            messages_received: meter
                .u64_counter("resock.transport.messages.received")
                .with_description("Total number of messages delivered to listeners")
                .build(),
            messages_dropped: meter
                .u64_counter("resock.transport.messages.dropped")
                .with_description("Total number of inbound frames dropped")
                .build(),
            reconnection_attempts: meter
                .u64_counter("resock.transport.reconnection.attempts")
                .with_description("Total number of reconnection attempts")
                .build(),
            reconnection_success: meter
                .u64_counter("resock.transport.reconnection.success")
                .with_description("Total number of successful reconnections")
                .build(),
            errors_total: meter
                .u64_counter("resock.transport.errors.total")
                .with_description("Total number of errors encountered")
                .build(),
        }
    }

    /// Update connection state
    pub fn update_connection_state(&self, state: ConnectionState) {
        self.connection_state.record(state.code(), &[]);
    }

    /// Record a sent message
    pub fn record_sent(&self) {
        self.messages_sent.add(1, &[]);
    }

    /// Record a message delivered to listeners
    pub fn record_received(&self, kind: &str) {
        self.messages_received
            .add(1, &[KeyValue::new("kind", kind.to_string())]);
    }

    /// Record a dropped inbound frame
    pub fn record_dropped(&self, reason: &str) {
        self.messages_dropped
            .add(1, &[KeyValue::new("reason", reason.to_string())]);
    }

    /// Record an error
    pub fn record_error(&self, error_type: &str) {
        let attributes = &[KeyValue::new("error_type", error_type.to_string())];
        self.errors_total.add(1, attributes);
    }

    /// Record a reconnection attempt
    pub fn record_reconnection_attempt(&self) {
        self.reconnection_attempts.add(1, &[]);
    }

    /// Record a successful reconnection
    pub fn record_reconnection_success(&self) {
        self.reconnection_success.add(1, &[]);
    }
}
