use crate::base::ResourceType;

pub const SENTINEL_VERSION: &str = "v1";

// application identity, overridable through the environment
pub const DEFAULT_APP_NAME: &str = "unknown_service";
pub const DEFAULT_APP_TYPE: u8 = ResourceType::Common as _;
pub const APP_NAME_ENV_KEY: &str = "SENTINEL_APP_NAME";
pub const APP_TYPE_ENV_KEY: &str = "SENTINEL_APP_TYPE";
pub const CONF_FILE_PATH_ENV_KEY: &str = "SENTINEL_CONFIG_FILE_PATH";

pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Listening address of the Prometheus endpoint.
pub const EXPORTER_ADDR: &str = "127.0.0.1:9091";

// sampling periods of the system collectors
pub const SYSTEM_INTERVAL_MS: u32 = 1000;
pub const LOAD_INTERVAL_MS: u32 = 1000;
pub const CPU_INTERVAL_MS: u32 = 1000;
pub const MEMORY_INTERVAL_MS: u32 = 150;
