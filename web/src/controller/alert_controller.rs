use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use domain::Alert;

/// GET every alert received so far, oldest first
#[utoipa::path(
    get,
    path = "/alerts",
    responses(
        (status = 200, description = "All alerts in arrival order", body = [Alert]),
    )
)]
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.stores.alerts.get_all())
}
