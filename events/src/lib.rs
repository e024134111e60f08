//! State change notification infrastructure for the telemetry bridge.
//!
//! This crate provides the event system that decouples the in-memory state
//! stores from the infrastructure that mirrors them to clients (the broadcast hub).
//!
//! # Architecture
//!
//! - **StateEvent**: Enum representing every change a state store can make
//! - **EventHandler**: Trait for implementing synchronous listeners
//! - **EventPublisher**: Registry of listeners owned by one store
//! - **SnapshotSource**: Read side used to build a full snapshot for new subscribers
//!
//! This crate has no dependencies on internal crates (domain, hub, etc.),
//! avoiding circular dependencies. State data is carried as serialized JSON values.

use log::*;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Position of an update within the sequence of updates applied to a single store.
/// The first update a store applies is numbered 1; 0 means "nothing applied yet".
pub type Seq = u64;

/// Changes emitted by the state stores. Every event carries the sequence number
/// the owning store assigned to the update that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// The latest reported location replaced the previous one.
    LocationUpdated { seq: Seq, location: Value },
    /// A new entry was appended to the alert log.
    AlertAppended { seq: Seq, alert: Value },
}

impl StateEvent {
    pub fn seq(&self) -> Seq {
        match self {
            StateEvent::LocationUpdated { seq, .. } | StateEvent::AlertAppended { seq, .. } => *seq,
        }
    }
}

/// Full current state, stamped with the sequence number of the last update
/// that each part reflects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateSnapshot {
    pub location: Option<Value>,
    pub location_seq: Seq,
    pub alerts: Vec<Value>,
    pub alerts_seq: Seq,
}

impl StateSnapshot {
    pub fn watermark(&self) -> Watermark {
        Watermark {
            location_seq: self.location_seq,
            alerts_seq: self.alerts_seq,
        }
    }
}

/// The last sequence numbers a consumer has already seen, per store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermark {
    pub location_seq: Seq,
    pub alerts_seq: Seq,
}

impl Watermark {
    /// Returns true if `event` is at or below this watermark, i.e. already seen.
    pub fn covers(&self, event: &StateEvent) -> bool {
        match event {
            StateEvent::LocationUpdated { seq, .. } => *seq <= self.location_seq,
            StateEvent::AlertAppended { seq, .. } => *seq <= self.alerts_seq,
        }
    }
}

/// Anything able to produce a consistent snapshot of the current state.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> StateSnapshot;
}

/// Trait for handling state events.
///
/// Handlers are invoked synchronously, inline with the store update that
/// produced the event, and while that store is held for writing. They must
/// not block and must not call back into the store that notified them.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &StateEvent);
}

/// Identifies one registration with an [`EventPublisher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Publishes state events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Default)]
pub struct EventPublisher {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(ListenerId, Arc<dyn EventHandler>)>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It sees every event published after this call returns.
    pub fn register(&self, handler: Arc<dyn EventHandler>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, handler));
        debug!("Registered state event listener {:?}", id);
        id
    }

    /// Deregister a handler. Removing an unknown id is a no-op.
    pub fn deregister(&self, id: ListenerId) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        if handlers.len() != before {
            debug!("Deregistered state event listener {:?}", id);
        }
    }

    /// Publish an event to all registered handlers.
    pub fn publish(&self, event: &StateEvent) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, handler) in handlers.iter() {
            handler.handle(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorder {
        tag: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, Seq)>>>,
    }

    impl EventHandler for Recorder {
        fn handle(&self, event: &StateEvent) {
            self.seen.lock().unwrap().push((self.tag, event.seq()));
        }
    }

    fn alert(seq: Seq) -> StateEvent {
        StateEvent::AlertAppended {
            seq,
            alert: json!({"message": "Speed alert"}),
        }
    }

    #[test]
    fn publish_calls_handlers_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublisher::new();
        publisher.register(Arc::new(Recorder { tag: "a", seen: seen.clone() }));
        publisher.register(Arc::new(Recorder { tag: "b", seen: seen.clone() }));

        publisher.publish(&alert(1));
        publisher.publish(&alert(2));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]
        );
    }

    #[test]
    fn deregistered_handler_misses_later_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublisher::new();
        let id = publisher.register(Arc::new(Recorder { tag: "a", seen: seen.clone() }));

        publisher.publish(&alert(1));
        publisher.deregister(id);
        publisher.publish(&alert(2));
        // second removal is a no-op
        publisher.deregister(id);

        assert_eq!(*seen.lock().unwrap(), vec![("a", 1)]);
        assert_eq!(publisher.listener_count(), 0);
    }

    #[test]
    fn late_registration_sees_no_replay() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublisher::new();
        publisher.publish(&alert(1));
        publisher.register(Arc::new(Recorder { tag: "a", seen: seen.clone() }));
        publisher.publish(&alert(2));

        assert_eq!(*seen.lock().unwrap(), vec![("a", 2)]);
    }

    #[test]
    fn watermark_covers_events_at_or_below_snapshot_sequence() {
        let watermark = StateSnapshot {
            location: Some(json!({"lat": 1.0, "lng": 2.0})),
            location_seq: 3,
            alerts: vec![json!({}), json!({})],
            alerts_seq: 2,
        }
        .watermark();

        assert!(watermark.covers(&alert(2)));
        assert!(!watermark.covers(&alert(3)));
        assert!(watermark.covers(&StateEvent::LocationUpdated {
            seq: 3,
            location: json!(null)
        }));
        assert!(!watermark.covers(&StateEvent::LocationUpdated {
            seq: 4,
            location: json!(null)
        }));
    }
}
