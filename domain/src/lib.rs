//! Domain layer of the telemetry bridge.
//!
//! Holds the value types that cross the system (locations, alerts, commands for
//! the remote device), the payload codec used on every byte that reaches the
//! device link, and the in-memory state stores that the broadcast hub mirrors.

pub use events::{ListenerId, Seq};

pub mod alert;
pub mod command;
pub mod encryption;
pub mod error;
pub mod ingest;
pub mod location;
pub mod store;

pub use alert::Alert;
pub use command::Command;
pub use encryption::Codec;
pub use location::Location;
pub use store::{AlertStore, LocationStore, StateStores};
