use axum::extract::ws::Message as Frame;
use events::{StateEvent, Watermark};
use log::*;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Frames a subscriber may have queued before it is considered stalled and dropped.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// Sending half of a subscriber's outbound queue.
pub type FrameSender = mpsc::Sender<Frame>;
pub type FrameReceiver = mpsc::Receiver<Frame>;

/// A subscriber queue with the standard capacity.
pub fn subscriber_channel() -> (FrameSender, FrameReceiver) {
    mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY)
}

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscriber: where to send frames and what it has already seen.
#[derive(Debug)]
struct Subscriber {
    sender: FrameSender,
    seen: Watermark,
}

/// Set of live subscribers. Owned by the hub task; not shared.
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Subscriber>,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, connection_id: ConnectionId, sender: FrameSender, seen: Watermark) {
        self.connections
            .insert(connection_id, Subscriber { sender, seen });
    }

    /// Removes a subscriber. Returns false if it was already gone.
    pub(crate) fn unregister(&mut self, connection_id: &ConnectionId) -> bool {
        self.connections.remove(connection_id).is_some()
    }

    /// Sends `frame` to every subscriber that hasn't already seen `event`.
    /// Subscribers whose queue is closed or full are dropped from the set; the
    /// rest are unaffected. Returns how many subscribers were sent the frame.
    pub(crate) fn broadcast(&mut self, event: &StateEvent, frame: &Frame) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (connection_id, subscriber) in self.connections.iter() {
            if subscriber.seen.covers(event) {
                trace!(
                    "Skipping event seq {} for connection {}: covered by its snapshot",
                    event.seq(),
                    connection_id.as_str()
                );
                continue;
            }

            match subscriber.sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Connection {} is not reading ({} frames queued). Removing it.",
                        connection_id.as_str(),
                        SUBSCRIBER_QUEUE_CAPACITY
                    );
                    dead.push(connection_id.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(
                        "Connection {} closed its queue. Removing it.",
                        connection_id.as_str()
                    );
                    dead.push(connection_id.clone());
                }
            }
        }

        for connection_id in dead {
            self.unregister(&connection_id);
        }

        delivered
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }
}
