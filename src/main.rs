use log::*;
use service::{config::Config, logging::Logger, AppState};

mod demo;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Starting telemetry bridge...");

    let app_state = match AppState::init(config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to initialize telemetry bridge: {e}");
            std::process::exit(1);
        }
    };

    if app_state.config.demo_feed {
        demo::spawn(
            app_state.stores.clone(),
            app_state.config.demo_feed_delay(),
        );
    }

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
