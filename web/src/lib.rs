//! HTTP and WebSocket surface of the telemetry bridge.

use axum::http::{header, HeaderValue, Method};
use log::*;
use tower_http::cors::{Any, CorsLayer};

pub use error::{Error, Result};
pub(crate) use service::AppState;

mod controller;
mod error;
mod params;
pub mod router;
mod ws;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listen_addr = format!("{interface}:{}", app_state.config.port);

    let cors = cors_layer(&app_state.config.allowed_origins);
    let app = router::define_routes(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Server starting... listening for connections on http://{listen_addr}");

    axum::serve(listener, app).await
}

/// A `*` entry allows any origin; unparsable entries are skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.trim().parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();
    debug!("CORS allowed origins: {origins:?}");

    layer.allow_origin(origins)
}
