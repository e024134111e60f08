//! Sample data for running without a vehicle attached.

use domain::{Alert, Location, StateStores};
use log::*;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEMO_LOCATION: Location = Location {
    lat: 37.7749,
    lng: -122.4194,
};
pub const DEMO_ALERT: &str = "Speed alert";

/// After `delay`, pushes one location and one alert through the stores so
/// connected clients see live updates.
pub fn spawn(stores: StateStores, delay: Duration) -> JoinHandle<()> {
    info!("Demo feed enabled, injecting sample data in {}s", delay.as_secs());
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        stores.location.update(DEMO_LOCATION);
        stores.alerts.update(Alert::now(DEMO_ALERT));
        info!("Demo feed injected sample location and alert");
    })
}
