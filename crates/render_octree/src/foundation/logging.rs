//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize logging with a default filter, still overridable through `RUST_LOG`
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second initialisation (tests, embedding apps) keeps the first logger
    let _ = env_logger::Builder::from_env(env).try_init();
}
