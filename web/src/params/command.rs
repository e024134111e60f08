use axum::extract::rejection::JsonRejection;
use axum::Json;
use domain::error::Error as DomainError;
use domain::Command;
use serde::Deserialize;
use utoipa::ToSchema;

pub(crate) const DESTINATION_REQUIRED: &str = "lat and lng required";
pub(crate) const SPEED_LIMIT_REQUIRED: &str = "speedLimit required";

/// Body of `POST /send-destination`. Fields are optional so a missing field
/// produces the same 400 as an invalid one.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DestinationParams {
    #[schema(example = 37.7749)]
    pub lat: Option<f64>,
    #[schema(example = -122.4194)]
    pub lng: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SpeedLimitParams {
    /// Speed limit in km/h
    #[serde(rename = "speedLimit")]
    #[schema(example = 60)]
    pub speed_limit: Option<f64>,
}

impl DestinationParams {
    /// Unparsable bodies are treated like missing fields.
    pub fn command(body: Result<Json<Self>, JsonRejection>) -> Result<Command, DomainError> {
        let Ok(Json(Self {
            lat: Some(lat),
            lng: Some(lng),
        })) = body
        else {
            return Err(DomainError::validation(DESTINATION_REQUIRED));
        };

        let command = Command::Destination { lat, lng };
        command
            .validate()
            .map_err(|_| DomainError::validation(DESTINATION_REQUIRED))?;
        Ok(command)
    }
}

impl SpeedLimitParams {
    pub fn command(body: Result<Json<Self>, JsonRejection>) -> Result<Command, DomainError> {
        let Ok(Json(Self {
            speed_limit: Some(speed_limit),
        })) = body
        else {
            return Err(DomainError::validation(SPEED_LIMIT_REQUIRED));
        };

        let command = Command::SpeedLimit { speed_limit };
        command
            .validate()
            .map_err(|_| DomainError::validation(SPEED_LIMIT_REQUIRED))?;
        Ok(command)
    }
}
