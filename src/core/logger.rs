/// Install the process-wide `env_logger`. `RUST_LOG` overrides the default
/// `info` level. Safe to call more than once; later calls are ignored.
pub fn setup_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .is_test(cfg!(test))
        .try_init();
}
