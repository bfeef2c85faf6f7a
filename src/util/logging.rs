//! Structured logging setup for spinepipe
//!
//! Logs go to stderr so that report tables and JSON/YAML output on stdout stay clean.
//! `RUST_LOG` is respected when set; otherwise the configured level applies to this
//! crate and noisy HTTP dependencies are held at `warn`.
//!
//! # Example
//!
//! ```no_run
//! use spinepipe::util::logging;
//!
//! logging::init_logging(logging::config_from_env());
//! tracing::info!(scan = "patient-07", "Pipeline starting");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const QUIET_DEPENDENCIES: [&str; 3] = ["h2=warn", "hyper=warn", "reqwest=warn"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g. spinepipe::pipeline) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

/// Parses a log level (case-insensitive), defaulting to `INFO` for unknown input
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. \
                 Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn build_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("spinepipe={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    if env::var("RUST_LOG").is_err() {
        for quiet in QUIET_DEPENDENCIES {
            if let Ok(directive) = quiet.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

/// Reads `SPINEPIPE_LOG_LEVEL` and `SPINEPIPE_LOG_JSON`
pub fn config_from_env() -> LoggingConfig {
    let level = env::var("SPINEPIPE_LOG_LEVEL")
        .map(|v| parse_level(&v))
        .unwrap_or(Level::INFO);

    let use_json = env::var("SPINEPIPE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    LoggingConfig {
        level,
        use_json,
        ..Default::default()
    }
}

/// Environment settings with command-line flags on top. An explicit level wins over
/// `verbose`, which wins over `quiet`.
pub fn config_for_flags(log_level: Option<&str>, verbose: bool, quiet: bool) -> LoggingConfig {
    let mut config = config_from_env();
    if let Some(level) = log_level {
        config.level = parse_level(level);
    } else if verbose {
        config.level = Level::DEBUG;
    } else if quiet {
        config.level = Level::ERROR;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level("INFO"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("loud"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_default_config() {
        let default = LoggingConfig::default();
        assert_eq!(default.level, Level::INFO);
        assert!(!default.use_json);
        assert!(!default.include_location);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        std::env::set_var("SPINEPIPE_LOG_LEVEL", "debug");
        std::env::set_var("SPINEPIPE_LOG_JSON", "true");
        let config = config_from_env();
        std::env::remove_var("SPINEPIPE_LOG_LEVEL");
        std::env::remove_var("SPINEPIPE_LOG_JSON");

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);
    }

    #[test]
    #[serial]
    fn test_flags_override_env_level_and_keep_json() {
        std::env::set_var("SPINEPIPE_LOG_LEVEL", "warn");
        std::env::set_var("SPINEPIPE_LOG_JSON", "true");
        let explicit = config_for_flags(Some("trace"), true, false);
        let verbose = config_for_flags(None, true, false);
        let quiet = config_for_flags(None, false, true);
        let plain = config_for_flags(None, false, false);
        std::env::remove_var("SPINEPIPE_LOG_LEVEL");
        std::env::remove_var("SPINEPIPE_LOG_JSON");

        assert_eq!(explicit.level, Level::TRACE);
        assert_eq!(verbose.level, Level::DEBUG);
        assert_eq!(quiet.level, Level::ERROR);
        assert_eq!(plain.level, Level::WARN);
        assert!(plain.use_json && quiet.use_json);
    }

    #[test]
    #[serial]
    fn test_flags_without_env_default_to_info() {
        std::env::remove_var("SPINEPIPE_LOG_LEVEL");
        std::env::remove_var("SPINEPIPE_LOG_JSON");
        let config = config_for_flags(None, false, false);
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
    }
}
