//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// rkterrain::core::logging::init();
/// log::info!("Generator started");
/// ```
pub fn init() {
    // try_init so tests and binaries can both call this without panicking
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}

/// Initialize logging with millisecond timestamps, for long-running tools.
pub fn init_with_timestamps() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .try_init();
}
