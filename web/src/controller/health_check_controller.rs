use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use transport::ConnectionState;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    status: String,
    /// State of the link to the remote device
    #[schema(value_type = String, example = "ready")]
    transport: ConnectionState,
    /// Number of connected WebSocket clients
    subscribers: usize,
}

/// GET service health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API router is up and responding to requests", body = HealthResponse),
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        transport: app_state.transport.state(),
        subscribers: app_state.hub.subscriber_count().await,
    })
}
