use crate::controller::SuccessResponse;
use crate::params::device_report::DeviceReportParams;
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use domain::ingest;

use log::*;

/// POST an encrypted location or alert report from the vehicle
#[utoipa::path(
    post,
    path = "/device/reports",
    request_body = DeviceReportParams,
    responses(
        (status = 202, description = "Report applied", body = SuccessResponse),
        (status = 400, description = "Report decoded but its fields are invalid"),
        (status = 422, description = "Payload could not be decrypted or decoded"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(params): Json<DeviceReportParams>,
) -> Result<impl IntoResponse, Error> {
    let seq = ingest::apply(&app_state.codec, &app_state.stores, params.payload.trim())?;
    trace!("Device report applied as update {seq}");

    Ok((StatusCode::ACCEPTED, Json(SuccessResponse::accepted())))
}
