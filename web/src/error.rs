use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{DomainErrorKind, Error as DomainError, ExternalErrorKind};

use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

// Every error body is `{"error": "<message>"}`.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self.0.error_kind {
            DomainErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
            DomainErrorKind::Codec => StatusCode::UNPROCESSABLE_ENTITY,
            DomainErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DomainErrorKind::External(ExternalErrorKind::Network) => StatusCode::BAD_GATEWAY,
            DomainErrorKind::External(ExternalErrorKind::Other(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
