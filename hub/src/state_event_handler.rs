use crate::Hub;
use events::{EventHandler, StateEvent};
use log::*;

/// Forwards store notifications into the hub.
///
/// Runs inline with the store update, so it only enqueues: the hub task does
/// the actual fan-out. Queue order equals update order per store.
pub struct StateEventHandler {
    hub: Hub,
}

impl StateEventHandler {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }
}

impl EventHandler for StateEventHandler {
    fn handle(&self, event: &StateEvent) {
        debug!("Queueing state event seq {} for broadcast", event.seq());
        self.hub.publish(event.clone());
    }
}
