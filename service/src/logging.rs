//! Terminal logging for the bridge.
//!
//! The HTTP and WebSocket stack logs every frame and connection at debug
//! level, which drowns out hub and transport activity. Those crates stay
//! quiet unless the bridge runs at `trace`.

use crate::config::Config;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

const NETWORK_STACK: &[&str] = &["tokio", "tower", "hyper", "axum", "tungstenite"];

pub struct Logger {}

impl Logger {
    pub fn init_logger(config: &Config) {
        let level = config.log_level_filter;
        let log_config = Self::build_log_config(level);

        // Tests and embedders may have installed a logger already.
        if let Err(e) = TermLogger::init(level, log_config, TerminalMode::Mixed, ColorChoice::Auto)
        {
            eprintln!("Logger already initialized: {e}");
        }
    }

    /// Module prefixes suppressed at `level`.
    fn silenced_modules(level: LevelFilter) -> &'static [&'static str] {
        match level {
            LevelFilter::Trace => &[],
            _ => NETWORK_STACK,
        }
    }

    fn build_log_config(level: LevelFilter) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();
        for module in Self::silenced_modules(level) {
            builder.add_filter_ignore_str(module);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_shows_the_network_stack() {
        assert!(Logger::silenced_modules(LevelFilter::Trace).is_empty());
    }

    #[test]
    fn quieter_levels_silence_the_network_stack() {
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert_eq!(Logger::silenced_modules(level), NETWORK_STACK, "{level}");
        }
    }

    #[test]
    fn bridge_crates_are_never_silenced() {
        let silenced = Logger::silenced_modules(LevelFilter::Info);
        for module in ["telemetry_bridge", "transport", "hub", "domain", "service", "web"] {
            assert!(
                !silenced.iter().any(|prefix| module.starts_with(prefix)),
                "{module} should stay visible"
            );
        }
    }

    #[test]
    fn log_config_builds_at_every_level() {
        for level in [LevelFilter::Trace, LevelFilter::Info] {
            let _ = Logger::build_log_config(level);
        }
    }
}
