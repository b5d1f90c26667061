//! Connection state management
//!
//! Tracks where a transport is in its lifecycle and owns the reconnection
//! counter and strategy.
//!
//! # Connection States
//!
//! - **Connecting**: first socket opened, not connected yet
//! - **Connected**: socket reports itself connected
//! - **Disconnected**: socket dropped, no reconnection decided yet
//! - **Reconnecting**: replacement socket opened after a drop
//! - **Failed**: reconnection ceiling reached, gave up (terminal)
//! - **Closed**: closed by its owner (terminal)
//!
//! # State Transitions
//!
//! ```text
//! Connecting → Connected ⇄ Disconnected → Reconnecting → Connected
//!                                  ↓
//!                               Failed
//! (any) → Closed
//! ```
//!
//! `Failed` only leaves for `Closed`; `Closed` never changes again.

use crate::reconnect::ReconnectionStrategy;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial socket opened, waiting for it to connect
    Connecting,
    /// Socket connected
    Connected,
    /// Socket dropped
    Disconnected,
    /// Replacement socket opened; `attempt` counts reconnections so far
    Reconnecting { attempt: u32 },
    /// Reconnection abandoned
    Failed,
    /// Closed by the owner
    Closed,
}

impl ConnectionState {
    /// Numeric code used for the connection state gauge
    pub fn code(&self) -> i64 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting { .. } => 3,
            ConnectionState::Failed => 4,
            ConnectionState::Closed => 5,
        }
    }

    /// Whether no further reconnection can happen from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

/// Manages connection state and the reconnection counter
///
/// Locks are synchronous and never held across an `.await`, so both the
/// transport's event loop and its synchronous `close()` can use it.
pub struct ConnectionManager {
    state: RwLock<ConnectionState>,
    strategy: Mutex<Box<dyn ReconnectionStrategy>>,
    attempts: AtomicU32,
}

impl ConnectionManager {
    /// Create a new connection manager in the `Connecting` state
    pub fn new(strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self {
            state: RwLock::new(ConnectionState::Connecting),
            strategy: Mutex::new(strategy),
            attempts: AtomicU32::new(0),
        }
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Number of reconnection attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Move to `new_state` unless the current state forbids it
    ///
    /// Returns whether the state changed.
    fn transition(&self, new_state: ConnectionState) -> bool {
        let mut state = self.state.write();
        match *state {
            ConnectionState::Closed => false,
            ConnectionState::Failed if new_state != ConnectionState::Closed => false,
            _ => {
                *state = new_state;
                true
            }
        }
    }

    /// Transition to connected state
    pub fn connected(&self) -> bool {
        self.transition(ConnectionState::Connected)
    }

    /// Transition to disconnected state
    pub fn disconnected(&self) -> bool {
        self.transition(ConnectionState::Disconnected)
    }

    /// Transition to failed state
    pub fn failed(&self) -> bool {
        self.transition(ConnectionState::Failed)
    }

    /// Transition to closed state
    pub fn closed(&self) -> bool {
        self.transition(ConnectionState::Closed)
    }

    /// Decide on the next reconnection
    ///
    /// Consults the strategy with the current attempt count. On `Some`, the
    /// counter is incremented and the state becomes `Reconnecting`; on
    /// `None` the state becomes `Failed`. Always `None` from a terminal state.
    pub fn next_reconnect_delay(&self) -> Option<Duration> {
        let mut state = self.state.write();
        if state.is_terminal() {
            return None;
        }

        let attempt = self.attempts.load(Ordering::SeqCst);
        match self.strategy.lock().next_delay(attempt) {
            Some(delay) => {
                let attempt = attempt + 1;
                self.attempts.store(attempt, Ordering::SeqCst);
                *state = ConnectionState::Reconnecting { attempt };
                Some(delay)
            }
            None => {
                *state = ConnectionState::Failed;
                None
            }
        }
    }
}
