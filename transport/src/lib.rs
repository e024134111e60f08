//! Durable, self-healing command channel to the remote device.
//!
//! [`RemoteTransport`] owns exactly one logical connection to the vehicle unit.
//! Every command is validated, serialized, encrypted with the process-wide
//! [`domain::Codec`] and transmitted as a single opaque hex token. The connection
//! is supervised by a background task that reconnects after any failure using a
//! [`Backoff`] policy, forever.
//!
//! Delivery is best effort: a command sent while the link isn't ready is logged
//! and dropped, and a command that fails mid-transmission is not retried. The
//! wire itself sits behind the [`Connector`] and [`Link`] traits; [`ssh`]
//! provides the production implementation.

pub mod backoff;
pub mod error;
pub mod link;
pub mod remote;
pub mod ssh;

pub use backoff::Backoff;
pub use error::{Error, TransportErrorKind};
pub use link::{Connector, Link};
pub use remote::{ConnectionState, Delivery, RemoteTransport};
