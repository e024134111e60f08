use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use domain::Location;

/// GET the most recent vehicle location, or `null` if none has been reported
#[utoipa::path(
    get,
    path = "/location",
    responses(
        (status = 200, description = "Current location or null", body = Option<Location>),
    )
)]
pub async fn read(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.stores.location.get())
}
