//! Logger setup for hosts embedding the engine.
//!
//! The library only emits through `log`; hosts install the logger once at
//! startup, typically from the loaded configuration:
//!
//! ```
//! let config = relgraph::Config::from_toml_str("[relgraph]\nlog_level = \"debug\"\n").unwrap();
//! relgraph::logging::init(&config.relgraph.log_level);
//! log::debug!("relgraph logging ready");
//! ```

/// Initialize env_logger, honouring RUST_LOG and falling back to `level`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", level))
        .format_timestamp_millis()
        .try_init();
}

/// Initialize logging for tests (captured output, no timestamps)
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "debug"))
        .is_test(true)
        .try_init();
}
