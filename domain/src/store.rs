//! In-memory state stores mirrored to live clients.
//!
//! There are two stores: the latest [`Location`] (overwritten on every update)
//! and the [`Alert`] log (append only). Each store stamps every update with the
//! next sequence number and notifies its listeners synchronously, before
//! `update` returns and while still holding the store. Two updates to the same
//! store therefore reach every listener in the order they were applied.
//!
//! Nothing here is persisted; state is lost on restart.

use crate::alert::Alert;
use crate::location::Location;
use events::{
    EventHandler, EventPublisher, ListenerId, Seq, SnapshotSource, StateEvent, StateSnapshot,
};
use log::*;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Versioned<T> {
    seq: Seq,
    value: T,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_value<T: Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("Failed to serialize state value for listeners: {e}");
            None
        }
    }
}

/// Holds the latest reported location. Last write wins.
#[derive(Default)]
pub struct LocationStore {
    state: Mutex<Versioned<Option<Location>>>,
    publisher: EventPublisher,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current location and notifies listeners. Returns the
    /// sequence number assigned to this update.
    pub fn update(&self, location: Location) -> Seq {
        let mut state = lock(&self.state);
        state.seq += 1;
        state.value = Some(location);
        let seq = state.seq;

        if let Some(location) = to_value(&location) {
            self.publisher
                .publish(&StateEvent::LocationUpdated { seq, location });
        }
        trace!("Location updated (seq {seq})");
        seq
    }

    /// Returns the latest location, or `None` before the first update.
    pub fn get(&self) -> Option<Location> {
        lock(&self.state).value
    }

    fn versioned(&self) -> (Option<Location>, Seq) {
        let state = lock(&self.state);
        (state.value, state.seq)
    }

    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) -> ListenerId {
        self.publisher.register(handler)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.publisher.deregister(id)
    }
}

/// Append-only, ordered log of alerts. Entries never change once appended.
#[derive(Default)]
pub struct AlertStore {
    state: Mutex<Versioned<Vec<Alert>>>,
    publisher: EventPublisher,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an alert and notifies listeners with the new entry. The returned
    /// sequence number equals the new length of the log.
    pub fn update(&self, alert: Alert) -> Seq {
        let mut state = lock(&self.state);
        let event_value = to_value(&alert);
        state.value.push(alert);
        state.seq += 1;
        let seq = state.seq;

        if let Some(alert) = event_value {
            self.publisher.publish(&StateEvent::AlertAppended { seq, alert });
        }
        trace!("Alert appended (seq {seq})");
        seq
    }

    /// Returns every alert in append order.
    pub fn get_all(&self) -> Vec<Alert> {
        lock(&self.state).value.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn versioned(&self) -> (Vec<Alert>, Seq) {
        let state = lock(&self.state);
        (state.value.clone(), state.seq)
    }

    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) -> ListenerId {
        self.publisher.register(handler)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.publisher.deregister(id)
    }
}

/// Both stores, passed explicitly to whatever needs them.
#[derive(Clone, Default)]
pub struct StateStores {
    pub location: Arc<LocationStore>,
    pub alerts: Arc<AlertStore>,
}

impl StateStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one handler with both stores.
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) -> (ListenerId, ListenerId) {
        (
            self.location.subscribe(handler.clone()),
            self.alerts.subscribe(handler),
        )
    }
}

impl SnapshotSource for StateStores {
    fn snapshot(&self) -> StateSnapshot {
        let (location, location_seq) = self.location.versioned();
        let (alerts, alerts_seq) = self.alerts.versioned();

        StateSnapshot {
            location: location.as_ref().and_then(to_value),
            location_seq,
            alerts: alerts.iter().filter_map(to_value).collect(),
            alerts_seq,
        }
    }
}
