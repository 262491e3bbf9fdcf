use cfg_if::cfg_if;
use lazy_static::lazy_static;
pub use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::Once;

lazy_static! {
    pub static ref FREQUENT_ERROR_ONCE: Once = Once::new();
}

/// Logger backends, selected in the configuration.
/// The backend is only effective when the crate is compiled with the matched feature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Logger {
    /// `env_logger` with the given default filter, e.g., "warn"
    EnvLogger(String),
    /// `log4rs` with the given configuration file
    Log4rs(String),
}

impl Default for Logger {
    fn default() -> Self {
        Logger::EnvLogger(crate::config::DEFAULT_LOG_LEVEL.into())
    }
}

cfg_if! {
    if #[cfg(feature = "logger_env")] {
        fn init_env_logger(filter: &str) {
            // a logger may have been installed by the application or by a previous `Sentinel`
            let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
                .try_init();
        }
        pub fn logger_init(logger: &Logger) {
            match logger {
                Logger::EnvLogger(filter) => init_env_logger(filter),
                Logger::Log4rs(_) => init_env_logger(crate::config::DEFAULT_LOG_LEVEL),
            }
        }
    }
    else if #[cfg(feature = "logger_log4rs")] {
        use std::path::Path;
        fn init_log4rs(file_name: &str) {
            let path = Path::new(file_name);
            if path.exists() {
                if let Err(err) = log4rs::init_file(path, Default::default()) {
                    eprintln!("[Logging] Failed to initialize log4rs, file: {}, error: {:?}", file_name, err);
                }
            }
        }
        pub fn logger_init(logger: &Logger) {
            if let Logger::Log4rs(file_name) = logger {
                init_log4rs(file_name);
            }
        }
    } else {
        pub fn logger_init(_: &Logger) {}
    }
}
