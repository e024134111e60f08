//! Error types for the `transport` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and an error kind enum.

use domain::error::{
    DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: TransportErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum TransportErrorKind {
    /// Command failed validation; nothing was sent.
    InvalidCommand,
    /// Command could not be serialized/encrypted; nothing was sent.
    Encryption,
    /// TCP connect or protocol handshake failed.
    Connect,
    /// The remote rejected our credentials.
    Auth,
    /// Opening a channel or running the remote command failed.
    Channel,
    /// The link already reported itself closed.
    Closed,
    /// Transport settings are unusable.
    Config,
}

impl Error {
    pub fn new(error_kind: TransportErrorKind, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: Some(source.into()),
            error_kind,
        }
    }

    pub fn kind(error_kind: TransportErrorKind) -> Self {
        Self {
            source: None,
            error_kind,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{:?}: {source}", self.error_kind),
            None => write!(f, "{:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Translate transport errors into the domain layer so `web` only deals with
// domain error kinds. A command rejected inside `send` is a server error: the
// API layer is expected to have validated it already.
impl From<Error> for DomainError {
    fn from(err: Error) -> Self {
        let error_kind = match err.error_kind {
            TransportErrorKind::InvalidCommand | TransportErrorKind::Encryption => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
            TransportErrorKind::Connect
            | TransportErrorKind::Channel
            | TransportErrorKind::Closed => DomainErrorKind::External(ExternalErrorKind::Network),
            TransportErrorKind::Auth | TransportErrorKind::Config => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
        };

        DomainError {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_command_becomes_internal_domain_error() {
        let err = Error::new(TransportErrorKind::InvalidCommand, "lat out of range");
        let domain_err: DomainError = err.into();

        assert!(matches!(
            domain_err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Other(ref msg)) if msg.contains("lat out of range")
        ));
    }

    #[test]
    fn link_failures_become_network_errors() {
        let domain_err: DomainError = Error::kind(TransportErrorKind::Closed).into();
        assert_eq!(
            domain_err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Network)
        );
    }
}
