//! Utility modules for spinepipe

pub mod logging;

pub use logging::{config_for_flags, config_from_env, init_logging, LoggingConfig};
