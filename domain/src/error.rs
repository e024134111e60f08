//! Error types for the `domain` layer.
use crate::encryption::EncryptionError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. Lower layers (e.g. `transport`) translate their own errors into
/// this type, and `web` maps the resulting `error_kind` to HTTP status codes.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    /// A command or report failed field validation. Carries a client-facing message.
    Validation(String),
    /// A ciphertext could not be decrypted or decoded.
    Codec,
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Validation(message.into()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            DomainErrorKind::Validation(message) => write!(f, "{message}"),
            DomainErrorKind::Codec => write!(f, "payload could not be decoded"),
            DomainErrorKind::Internal(InternalErrorKind::Config) => {
                write!(f, "invalid configuration")
            }
            DomainErrorKind::Internal(InternalErrorKind::Other(message)) => write!(f, "{message}"),
            DomainErrorKind::External(ExternalErrorKind::Network) => {
                write!(f, "remote device unreachable")
            }
            DomainErrorKind::External(ExternalErrorKind::Other(message)) => write!(f, "{message}"),
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

// Key material problems are configuration errors; everything else the codec
// reports means the ciphertext (or the value being encrypted) was bad.
impl From<EncryptionError> for Error {
    fn from(err: EncryptionError) -> Self {
        let error_kind = match err {
            EncryptionError::InvalidKey
            | EncryptionError::InvalidIv
            | EncryptionError::HexDecodeError(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Config)
            }
            EncryptionError::SerializationFailed(_) => {
                DomainErrorKind::Internal(InternalErrorKind::Other(err.to_string()))
            }
            EncryptionError::MalformedCiphertext
            | EncryptionError::DecryptionFailed
            | EncryptionError::DeserializationFailed(_) => DomainErrorKind::Codec,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
