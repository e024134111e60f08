//! Real-time fan-out of state changes to connected clients.
//!
//! This crate keeps every live client connection (a *subscriber*) in sync with
//! the location and alert stores.
//!
//! # Architecture
//!
//! - **Single owner task**: the subscriber set lives inside one task spawned by
//!   [`Hub::spawn`]. Admissions, state events and removals all reach it through
//!   one ordered channel, so no lock is ever shared with connection tasks.
//! - **Snapshot first**: on admission a subscriber receives the current location
//!   and the full alert log before any incremental message.
//! - **Sequence watermarks**: each store numbers its updates. A subscriber
//!   remembers the numbers its snapshot reflected and skips queued events at or
//!   below them, so nothing is delivered twice and nothing is missed.
//! - **Isolated delivery**: every subscriber has its own bounded queue
//!   ([`subscriber_channel`]). A closed queue, or one left full by a client that
//!   stopped reading, removes that subscriber only.
//!
//! # Message Flow
//!
//! 1. Client opens a WebSocket on `/ws`
//! 2. The web layer creates a channel and calls [`Hub::admit`]
//! 3. The hub pushes `{type:"location"}` and `{type:"alerts"}` snapshot messages
//! 4. A store update calls [`StateEventHandler`] synchronously, which queues the event
//! 5. The hub sends `{type:"location"}` or `{type:"alert"}` to every subscriber
//! 6. When the socket closes the web layer calls [`Hub::remove`]
//!
//! # Modules
//!
//! - `connection`: Subscriber registry and type-safe ConnectionId
//! - `manager`: The hub task and its handle
//! - `message`: Outbound message definitions
//! - `state_event_handler`: Bridges store notifications into the hub

pub mod connection;
pub mod manager;
pub mod message;
pub mod state_event_handler;

pub use connection::{subscriber_channel, ConnectionId, FrameReceiver, FrameSender};
pub use manager::Hub;
pub use state_event_handler::StateEventHandler;
