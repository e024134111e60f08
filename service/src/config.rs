use clap::builder::TypedValueParser as _;
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use transport::ssh::{SshSettings, DEFAULT_COMMAND_TEMPLATE};
use transport::Backoff;

/// Host value that means "no remote device, run in demo mode".
const OFFLINE_HOST: &str = "localhost";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReconnectStrategy {
    Constant,
    Exponential,
}

impl fmt::Display for ReconnectStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReconnectStrategy::Constant => write!(f, "constant"),
            ReconnectStrategy::Exponential => write!(f, "exponential"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:5173,http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// AES-256 key shared with the remote device, as 64 hex characters.
    #[arg(long, env, hide_env_values = true)]
    encryption_key: String,

    /// AES-CBC initialization vector shared with the remote device, as 32 hex characters.
    #[arg(long, env, hide_env_values = true)]
    encryption_iv: String,

    /// Remote device host. Leave unset (or set to `localhost`) to run without a device.
    #[arg(long, env)]
    ssh_host: Option<String>,

    #[arg(long, env, default_value_t = 22)]
    pub ssh_port: u16,

    #[arg(long, env)]
    ssh_username: Option<String>,

    /// Private key file used for public key authentication.
    #[arg(long, env)]
    ssh_private_key_path: Option<PathBuf>,

    #[arg(long, env, hide_env_values = true)]
    ssh_passphrase: Option<String>,

    /// Command run on the device for every outgoing command. `{payload}` is
    /// replaced with the hex ciphertext.
    #[arg(long, env, default_value = DEFAULT_COMMAND_TEMPLATE)]
    pub remote_command: String,

    /// Milliseconds to wait before reconnecting to the device.
    #[arg(long, env, default_value_t = 5000)]
    pub reconnect_interval_ms: u64,

    #[arg(long, env, value_enum, default_value_t = ReconnectStrategy::Constant)]
    pub reconnect_strategy: ReconnectStrategy,

    /// Upper bound on the reconnect delay when using the exponential strategy.
    #[arg(long, env, default_value_t = 60000)]
    pub reconnect_max_interval_ms: u64,

    /// Timeout applied to the TCP connect and every blocking SSH operation.
    #[arg(long, env, default_value_t = 30)]
    pub ssh_timeout_secs: u64,

    /// How often an idle device connection is checked for liveness.
    #[arg(long, env, default_value_t = 15)]
    pub keepalive_interval_secs: u64,

    /// Inject a sample location and alert shortly after startup.
    #[arg(long, env, default_value_t = false)]
    pub demo_feed: bool,

    #[arg(long, env, default_value_t = 10)]
    pub demo_feed_delay_secs: u64,
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn encryption_key(&self) -> &str {
        &self.encryption_key
    }

    pub fn encryption_iv(&self) -> &str {
        &self.encryption_iv
    }

    /// The configured device host, or `None` when running without a device.
    pub fn ssh_host(&self) -> Option<&str> {
        self.ssh_host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty() && !host.eq_ignore_ascii_case(OFFLINE_HOST))
    }

    pub fn is_offline(&self) -> bool {
        self.ssh_host().is_none()
    }

    pub fn backoff(&self) -> Backoff {
        let interval = Duration::from_millis(self.reconnect_interval_ms);
        match self.reconnect_strategy {
            ReconnectStrategy::Constant => Backoff::constant(interval),
            ReconnectStrategy::Exponential => Backoff::exponential(
                interval,
                Duration::from_millis(self.reconnect_max_interval_ms).max(interval),
            ),
        }
    }

    /// SSH settings for the device, or `None` in offline mode. Missing
    /// credentials are left empty and rejected when the connector is built.
    pub fn ssh_settings(&self) -> Option<SshSettings> {
        let host = self.ssh_host()?;
        Some(SshSettings {
            host: host.to_string(),
            port: self.ssh_port,
            username: self.ssh_username.clone().unwrap_or_default(),
            private_key_path: self.ssh_private_key_path.clone().unwrap_or_default(),
            passphrase: self.ssh_passphrase.clone(),
            command_template: self.remote_command.clone(),
            timeout: Duration::from_secs(self.ssh_timeout_secs),
            keepalive_interval: Duration::from_secs(self.keepalive_interval_secs),
        })
    }

    pub fn demo_feed_delay(&self) -> Duration {
        Duration::from_secs(self.demo_feed_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const IV: &str = "000102030405060708090a0b0c0d0e0f";

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec![
            "telemetry_bridge",
            "--encryption-key",
            KEY,
            "--encryption-iv",
            IV,
        ];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = parse(&[]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.interface.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.ssh_port, 22);
        assert_eq!(config.remote_command, "echo '{payload}'");
        assert_eq!(config.backoff(), Backoff::constant(Duration::from_millis(5000)));
        assert!(!config.demo_feed);
        assert_eq!(config.demo_feed_delay(), Duration::from_secs(10));
    }

    #[test]
    fn missing_encryption_key_is_a_usage_error() {
        let result = Config::try_parse_from(["telemetry_bridge", "--encryption-iv", IV]);
        assert!(result.is_err());
    }

    #[test]
    fn localhost_means_offline() {
        let config = parse(&["--ssh-host", "localhost"]);

        assert!(config.is_offline());
        assert!(config.ssh_settings().is_none());
    }

    #[test]
    fn remote_host_produces_ssh_settings() {
        let config = parse(&[
            "--ssh-host",
            "10.0.0.7",
            "--ssh-username",
            "pi",
            "--ssh-private-key-path",
            "/keys/id_ed25519",
        ]);

        let settings = config.ssh_settings().unwrap();
        assert_eq!(settings.address(), "10.0.0.7:22");
        assert_eq!(settings.username, "pi");
        assert_eq!(settings.private_key_path, PathBuf::from("/keys/id_ed25519"));
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn exponential_strategy_uses_configured_cap() {
        let config = parse(&[
            "--reconnect-strategy",
            "exponential",
            "--reconnect-interval-ms",
            "1000",
            "--reconnect-max-interval-ms",
            "8000",
        ]);

        assert_eq!(
            config.backoff(),
            Backoff::exponential(Duration::from_secs(1), Duration::from_secs(8))
        );
    }

    #[test]
    fn log_level_is_parsed_from_upper_case_name() {
        let config = parse(&["--log-level-filter", "DEBUG"]);
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
    }
}
