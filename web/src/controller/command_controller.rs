use crate::controller::SuccessResponse;
use crate::params::command::{DestinationParams, SpeedLimitParams};
use crate::{AppState, Error};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use domain::Command;
use transport::Delivery;

use log::*;

/// POST a navigation destination to the remote device
///
/// Returns success once the command has been handed to the transport, whether
/// or not the device link is currently up.
#[utoipa::path(
    post,
    path = "/send-destination",
    request_body = DestinationParams,
    responses(
        (status = 200, description = "Command accepted", body = SuccessResponse),
        (status = 400, description = "lat and lng required"),
        (status = 500, description = "Command could not be prepared for sending"),
    )
)]
pub async fn send_destination(
    State(app_state): State<AppState>,
    body: Result<Json<DestinationParams>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let command = DestinationParams::command(body)?;
    debug!("POST send destination: {command:?}");

    dispatch(&app_state, &command).await
}

/// POST a speed limit to the remote device
#[utoipa::path(
    post,
    path = "/set-speed-limit",
    request_body = SpeedLimitParams,
    responses(
        (status = 200, description = "Command accepted", body = SuccessResponse),
        (status = 400, description = "speedLimit required"),
        (status = 500, description = "Command could not be prepared for sending"),
    )
)]
pub async fn set_speed_limit(
    State(app_state): State<AppState>,
    body: Result<Json<SpeedLimitParams>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let command = SpeedLimitParams::command(body)?;
    debug!("POST set speed limit: {command:?}");

    dispatch(&app_state, &command).await
}

async fn dispatch(app_state: &AppState, command: &Command) -> Result<Json<SuccessResponse>, Error> {
    match app_state.transport.send(command).await? {
        Delivery::Sent => debug!("{} command delivered", command.kind()),
        Delivery::Dropped { state } => {
            debug!("{} command accepted but dropped ({state})", command.kind())
        }
        Delivery::Lost => debug!("{} command accepted but lost in transit", command.kind()),
    }

    Ok(Json(SuccessResponse::accepted()))
}
