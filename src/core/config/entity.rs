use super::constant::*;
use crate::{
    base::{check_validity_for_reuse_statistic, ResourceType, DEFAULT_INTERVAL_MS, DEFAULT_INTERVAL_MS_TOTAL, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_COUNT_TOTAL},
    logging::Logger,
    utils, Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the protected application.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub app_name: String,
    pub app_type: ResourceType,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_name: DEFAULT_APP_NAME.into(),
            app_type: DEFAULT_APP_TYPE.into(),
        }
    }
}

/// Where the Prometheus endpoint listens, read only with the `exporter` feature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    pub addr: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            addr: EXPORTER_ADDR.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct LogConfig {
    pub logger: Logger,
    pub exporter: ExporterConfig,
}

/// Sampling periods of the background collectors feeding the system rules, all positive.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SystemStatConfig {
    /// process memory
    pub system_interval_ms: u32,
    /// 1-minute load average
    pub load_interval_ms: u32,
    /// CPU usage ratio
    pub cpu_interval_ms: u32,
    /// host memory usage
    pub memory_interval_ms: u32,
}

impl Default for SystemStatConfig {
    fn default() -> Self {
        SystemStatConfig {
            system_interval_ms: SYSTEM_INTERVAL_MS,
            load_interval_ms: LOAD_INTERVAL_MS,
            cpu_interval_ms: CPU_INTERVAL_MS,
            memory_interval_ms: MEMORY_INTERVAL_MS,
        }
    }
}

/// Window settings of the resource nodes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StatConfig {
    /// the window every resource node writes into
    pub sample_count_total: u32,
    pub interval_ms_total: u32,
    /// the read-only window derived from the one above, read by the flow rules by default
    pub sample_count: u32,
    pub interval_ms: u32,
    pub system: SystemStatConfig,
}

impl Default for StatConfig {
    fn default() -> Self {
        StatConfig {
            sample_count_total: DEFAULT_SAMPLE_COUNT_TOTAL,
            interval_ms_total: DEFAULT_INTERVAL_MS_TOTAL,
            sample_count: DEFAULT_SAMPLE_COUNT,
            interval_ms: DEFAULT_INTERVAL_MS,
            system: SystemStatConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SentinelConfig {
    pub app: AppConfig,
    pub log: LogConfig,
    pub stat: StatConfig,
    /// read the clock from a millisecond ticker thread instead of the system clock
    pub use_cache_time: bool,
}

/// The whole configuration, as read from the YAML file.
/// Missing fields take their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConfigEntity {
    pub version: String,
    pub config: SentinelConfig,
}

impl Default for ConfigEntity {
    fn default() -> Self {
        ConfigEntity {
            version: SENTINEL_VERSION.into(),
            config: SentinelConfig::default(),
        }
    }
}

impl ConfigEntity {
    pub fn new() -> Self {
        ConfigEntity::default()
    }

    /// Rejects a configuration the engine can not start with.
    pub fn check(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(Error::msg("empty version"));
        }
        if utils::is_blank(&self.config.app.app_name) {
            return Err(Error::msg("empty app name"));
        }
        let system = &self.config.stat.system;
        let intervals = [
            system.system_interval_ms,
            system.load_interval_ms,
            system.cpu_interval_ms,
            system.memory_interval_ms,
        ];
        if intervals.contains(&0) {
            return Err(Error::msg(
                "illegal system statistic configuration: collecting interval should be positive",
            ));
        }
        check_validity_for_reuse_statistic(
            self.config.stat.sample_count,
            self.config.stat.interval_ms,
            self.config.stat.sample_count_total,
            self.config.stat.interval_ms_total,
        )?;
        Ok(())
    }

    pub fn app_name(&self) -> &str {
        &self.config.app.app_name
    }

    pub fn stat(&self) -> &StatConfig {
        &self.config.stat
    }
}

impl fmt::Display for ConfigEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_yaml::to_string(self) {
            Ok(yaml) => f.write_str(&yaml),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
