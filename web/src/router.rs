use crate::controller::{
    alert_controller, command_controller, device_report_controller, health_check_controller,
    location_controller, SuccessResponse,
};
use crate::params::command::{DestinationParams, SpeedLimitParams};
use crate::params::device_report::DeviceReportParams;
use crate::ws::handler::ws_handler;
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Telemetry Bridge API"
        ),
        paths(
            command_controller::send_destination,
            command_controller::set_speed_limit,
            location_controller::read,
            alert_controller::index,
            device_report_controller::create,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                domain::Location,
                domain::Alert,
                DestinationParams,
                SpeedLimitParams,
                DeviceReportParams,
                SuccessResponse,
                health_check_controller::HealthResponse,
            )
        ),
        tags(
            (name = "telemetry_bridge", description = "Vehicle telemetry and command bridge API")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(command_routes(app_state.clone()))
        .merge(state_routes(app_state.clone()))
        .merge(device_report_routes(app_state.clone()))
        .merge(health_routes(app_state.clone()))
        .merge(ws_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn command_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/send-destination",
            post(command_controller::send_destination),
        )
        .route("/set-speed-limit", post(command_controller::set_speed_limit))
        .with_state(app_state)
}

fn state_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/location", get(location_controller::read))
        .route("/alerts", get(alert_controller::index))
        .with_state(app_state)
}

fn device_report_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/device/reports", post(device_report_controller::create))
        .with_state(app_state)
}

pub fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

fn ws_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
