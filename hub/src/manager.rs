use crate::connection::{ConnectionId, ConnectionRegistry, FrameSender};
use crate::message::{Message, MessageType};
use events::{SnapshotSource, StateEvent};
use log::*;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

enum HubCommand {
    Admit {
        connection_id: ConnectionId,
        sender: FrameSender,
    },
    Publish(StateEvent),
    Remove(ConnectionId),
    Count(oneshot::Sender<usize>),
}

/// Handle to the broadcast hub task. Cheap to clone; all clones feed the same task.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::UnboundedSender<HubCommand>,
}

impl Hub {
    /// Spawns the hub task on the current tokio runtime. `source` is read once
    /// per admission to build the subscriber's snapshot.
    pub fn spawn(source: Arc<dyn SnapshotSource>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run(source, receiver));
        Self { commands }
    }

    /// Admit a new subscriber. Its snapshot is queued on `sender` ahead of any
    /// incremental update.
    pub fn admit(&self, sender: FrameSender) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.send(HubCommand::Admit {
            connection_id: connection_id.clone(),
            sender,
        });
        connection_id
    }

    /// Remove a subscriber. Removing one that is already gone is a no-op.
    pub fn remove(&self, connection_id: &ConnectionId) {
        self.send(HubCommand::Remove(connection_id.clone()));
    }

    /// Queue a state event for delivery to every current subscriber.
    pub fn publish(&self, event: StateEvent) {
        self.send(HubCommand::Publish(event));
    }

    /// Number of live subscribers once every previously queued command has been handled.
    pub async fn subscriber_count(&self) -> usize {
        let (reply, count) = oneshot::channel();
        self.send(HubCommand::Count(reply));
        count.await.unwrap_or(0)
    }

    fn send(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            error!("Broadcast hub task is no longer running; command dropped");
        }
    }
}

async fn run(source: Arc<dyn SnapshotSource>, mut commands: mpsc::UnboundedReceiver<HubCommand>) {
    let mut registry = ConnectionRegistry::new();

    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Admit {
                connection_id,
                sender,
            } => admit(&mut registry, source.as_ref(), connection_id, sender),
            HubCommand::Publish(event) => publish(&mut registry, &event),
            HubCommand::Remove(connection_id) => {
                if registry.unregister(&connection_id) {
                    info!(
                        "Removed subscriber {} ({} remaining)",
                        connection_id.as_str(),
                        registry.len()
                    );
                }
            }
            HubCommand::Count(reply) => {
                let _ = reply.send(registry.len());
            }
        }
    }

    debug!("Broadcast hub stopped: all handles dropped");
}

fn admit(
    registry: &mut ConnectionRegistry,
    source: &dyn SnapshotSource,
    connection_id: ConnectionId,
    sender: FrameSender,
) {
    let snapshot = source.snapshot();

    for message in Message::snapshot(&snapshot) {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize {} snapshot: {e}", message.message_type());
                return;
            }
        };
        if let Err(e) = sender.try_send(frame) {
            debug!(
                "Subscriber {} could not take its snapshot ({e}); not admitted",
                connection_id.as_str()
            );
            return;
        }
    }

    registry.register(connection_id.clone(), sender, snapshot.watermark());
    info!(
        "Admitted subscriber {} with {} alert(s) in snapshot ({} total)",
        connection_id.as_str(),
        snapshot.alerts.len(),
        registry.len()
    );
}

fn publish(registry: &mut ConnectionRegistry, event: &StateEvent) {
    let message = Message::from_event(event);
    let frame = match message.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to serialize {} update: {e}", message.message_type());
            return;
        }
    };

    let delivered = registry.broadcast(event, &frame);
    debug!(
        "Broadcast {} (seq {}) to {} subscriber(s)",
        message.message_type(),
        event.seq(),
        delivered
    );
}
