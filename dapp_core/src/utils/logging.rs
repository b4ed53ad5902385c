use env_logger::Env;
use log::LevelFilter;

/// Initialize logging using env_logger.
/// `RUST_LOG` wins when set, e.g. `RUST_LOG=dapp_core=debug dapp-connect status`;
/// otherwise `default_level` applies.
pub fn init_logging(default_level: LevelFilter) {
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()))
        .init();
}
