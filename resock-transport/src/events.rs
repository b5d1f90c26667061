//! Transport events and listener registry
//!
//! A transport reports everything that happens to its connection as a
//! [`TransportEvent`]. Callers register listeners per [`EventKind`]; each
//! kind keeps its listeners in registration order.
//!
//! # Event Vocabulary
//!
//! | Kind | Fired when |
//! |---|---|
//! | `open` | the socket connected (once per connection) |
//! | `close` | `close()` was called (exactly once) |
//! | `disconnect` | the socket dropped |
//! | `reconnect` | the socket library recovered a failed connect on its own |
//! | `failed` | a socket error occurred or reconnection was abandoned |
//! | `message` | an inbound frame decoded into a [`Message`] |
//!
//! # Examples
//!
//! ```rust
//! use resock_transport::{EventDispatcher, EventKind, TransportEvent};
//!
//! let events = EventDispatcher::new();
//! let id = events.subscribe(EventKind::Open, |_event| println!("connected"));
//!
//! assert_eq!(events.emit(&TransportEvent::Open), 1);
//! assert!(events.unsubscribe(EventKind::Open, id));
//! assert_eq!(events.emit(&TransportEvent::Open), 0);
//! ```

use parking_lot::Mutex;
use resock_core::Message;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Kinds of transport events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Disconnect,
    Reconnect,
    Failed,
    Message,
}

impl EventKind {
    /// Every event kind
    pub const ALL: [EventKind; 6] = [
        EventKind::Open,
        EventKind::Close,
        EventKind::Disconnect,
        EventKind::Reconnect,
        EventKind::Failed,
        EventKind::Message,
    ];

    /// Event name as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Disconnect => "disconnect",
            EventKind::Reconnect => "reconnect",
            EventKind::Failed => "failed",
            EventKind::Message => "message",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a `failed` event fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The socket reported an error it could not recover from
    SocketError(String),
    /// The reconnection ceiling was reached; no further attempts will be made
    ReconnectAbandoned { attempts: u32 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SocketError(error) => write!(f, "socket error: {}", error),
            FailureReason::ReconnectAbandoned { attempts } => {
                write!(f, "reconnection abandoned after {} attempts", attempts)
            }
        }
    }
}

/// Event emitted by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Open,
    Close,
    Disconnect { reason: String },
    Reconnect,
    Failed(FailureReason),
    Message(Message),
}

impl TransportEvent {
    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            TransportEvent::Open => EventKind::Open,
            TransportEvent::Close => EventKind::Close,
            TransportEvent::Disconnect { .. } => EventKind::Disconnect,
            TransportEvent::Reconnect => EventKind::Reconnect,
            TransportEvent::Failed(_) => EventKind::Failed,
            TransportEvent::Message(_) => EventKind::Message,
        }
    }
}

/// Handle returned by [`EventDispatcher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Type for event listener functions
pub type Listener = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
}

/// Ordered listener lists keyed by event kind
#[derive(Default)]
pub struct EventDispatcher {
    registry: Mutex<Registry>,
}

impl EventDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&TransportEvent) + Send + Sync + 'static,
    {
        self.subscribe_shared(kind, Arc::new(listener))
    }

    /// Register an already shared listener
    pub fn subscribe_shared(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut registry = self.registry.lock();
        match registry.listeners.get_mut(&kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(listener_id, _)| *listener_id != id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Number of listeners registered for `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every listener of its kind, in registration order
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe while being called. A panicking listener is logged and
    /// skipped. Returns the number of listeners that ran to completion.
    pub fn emit(&self, event: &TransportEvent) -> usize {
        let kind = event.kind();
        let listeners: Vec<Listener> = match self.registry.lock().listeners.get(&kind) {
            Some(list) => list.iter().map(|(_, listener)| Arc::clone(listener)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    let panic = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(event = %kind, panic = %panic, "event listener panicked");
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_in_registration_order() {
        let events = EventDispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = Arc::clone(&order);
            events.subscribe(EventKind::Open, move |_| order.lock().push(n));
        }

        assert_eq!(events.emit(&TransportEvent::Open), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_emit_only_matching_kind() {
        let events = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        events.subscribe(EventKind::Close, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(events.emit(&TransportEvent::Open), 0);
        assert_eq!(events.emit(&TransportEvent::Close), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let events = EventDispatcher::new();
        let id = events.subscribe(EventKind::Message, |_| {});
        events.subscribe(EventKind::Message, |_| {});
        assert_eq!(events.listener_count(EventKind::Message), 2);

        assert!(events.unsubscribe(EventKind::Message, id));
        assert!(!events.unsubscribe(EventKind::Message, id));
        assert!(!events.unsubscribe(EventKind::Open, id));
        assert_eq!(events.listener_count(EventKind::Message), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let events = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        events.subscribe(EventKind::Failed, |_| panic!("listener bug"));
        let counter = Arc::clone(&count);
        events.subscribe(EventKind::Failed, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let event = TransportEvent::Failed(FailureReason::SocketError("boom".into()));
        assert_eq!(events.emit(&event), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_subscribe_while_emitting() {
        let events = Arc::new(EventDispatcher::new());
        let inner = Arc::clone(&events);
        events.subscribe(EventKind::Open, move |_| {
            inner.subscribe(EventKind::Open, |_| {});
        });

        assert_eq!(events.emit(&TransportEvent::Open), 1);
        assert_eq!(events.listener_count(EventKind::Open), 2);
    }

    #[test]
    fn test_event_kinds_and_names() {
        assert_eq!(TransportEvent::Reconnect.kind(), EventKind::Reconnect);
        assert_eq!(
            TransportEvent::Disconnect { reason: "x".into() }.kind(),
            EventKind::Disconnect
        );
        let names: Vec<&str> = EventKind::ALL.iter().map(EventKind::name).collect();
        assert_eq!(
            names,
            vec!["open", "close", "disconnect", "reconnect", "failed", "message"]
        );
    }

    #[test]
    fn test_failure_reason_display() {
        let reason = FailureReason::ReconnectAbandoned { attempts: 240 };
        assert_eq!(reason.to_string(), "reconnection abandoned after 240 attempts");
    }
}
