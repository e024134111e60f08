//! Process-level wiring: configuration, logging and the shared application
//! state handed to the web layer.

use config::Config;
use domain::error::Error;
use domain::{Codec, StateStores};
use hub::{Hub, StateEventHandler};
use log::*;
use std::sync::Arc;
use transport::ssh::SshConnector;
use transport::RemoteTransport;

pub mod config;
pub mod logging;

pub fn init_codec(config: &Config) -> Result<Codec, Error> {
    Ok(Codec::from_hex(config.encryption_key(), config.encryption_iv())?)
}

/// Builds the device transport. Connecting starts immediately in the
/// background; this never waits for the device. Must run inside a tokio runtime.
pub fn init_transport(config: &Config, codec: Codec) -> Result<RemoteTransport, Error> {
    let Some(settings) = config.ssh_settings() else {
        return Ok(RemoteTransport::offline(codec));
    };

    let connector = SshConnector::new(settings)?;
    info!(
        "Remote transport using {} reconnect every {}ms",
        config.reconnect_strategy, config.reconnect_interval_ms
    );
    Ok(RemoteTransport::connect(
        codec,
        Arc::new(connector),
        config.backoff(),
    ))
}

/// Spawns the broadcast hub and subscribes it to both stores.
pub fn init_hub(stores: &StateStores) -> Hub {
    let hub = Hub::spawn(Arc::new(stores.clone()));
    stores.subscribe(Arc::new(StateEventHandler::new(hub.clone())));
    hub
}

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub codec: Codec,
    pub stores: StateStores,
    pub hub: Hub,
    pub transport: RemoteTransport,
}

impl AppState {
    /// Wires every component from `config`. Must run inside a tokio runtime.
    pub fn init(config: Config) -> Result<Self, Error> {
        let codec = init_codec(&config)?;
        let stores = StateStores::new();
        let hub = init_hub(&stores);
        let transport = init_transport(&config, codec.clone())?;

        Ok(Self::new(config, codec, stores, hub, transport))
    }

    pub fn new(
        config: Config,
        codec: Codec,
        stores: StateStores,
        hub: Hub,
        transport: RemoteTransport,
    ) -> Self {
        Self {
            config,
            codec,
            stores,
            hub,
            transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use domain::error::{DomainErrorKind, InternalErrorKind};
    use domain::Location;
    use hub::subscriber_channel;
    use transport::ConnectionState;

    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const IV: &str = "000102030405060708090a0b0c0d0e0f";

    fn config(extra: &[&str]) -> Config {
        let mut args = vec!["telemetry_bridge", "--encryption-key", KEY, "--encryption-iv", IV];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn offline_config_builds_disconnected_transport() {
        let state = AppState::init(config(&[])).unwrap();

        assert_eq!(state.transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn short_key_is_a_config_error() {
        let config = Config::try_parse_from([
            "telemetry_bridge",
            "--encryption-key",
            "abcd",
            "--encryption-iv",
            IV,
        ])
        .unwrap();

        let err = init_codec(&config).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[tokio::test]
    async fn remote_host_without_placeholder_is_rejected() {
        let config = config(&[
            "--ssh-host",
            "10.0.0.7",
            "--ssh-username",
            "pi",
            "--remote-command",
            "true",
        ]);
        let codec = init_codec(&config).unwrap();

        let err = init_transport(&config, codec).err().unwrap();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Config)
        );
    }

    #[tokio::test]
    async fn store_updates_reach_the_hub() {
        let stores = StateStores::new();
        let hub = init_hub(&stores);
        let (tx, mut rx) = subscriber_channel();
        hub.admit(tx);

        // location snapshot, alerts snapshot
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();

        stores.location.update(Location::new(1.0, 2.0));
        let frame = rx.recv().await.unwrap();
        let text = frame.to_text().unwrap();
        assert!(text.contains("\"type\":\"location\""));
    }
}
