use super::{constant::*, ConfigEntity};
use crate::{base::ResourceType, logging, utils, Error, Result};
use std::env;
use std::fs;
use std::path::Path;

impl ConfigEntity {
    /// Loads the configuration from a YAML file, missing items take the default values.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::msg(format!(
                "Sentinel YAML configuration file does not exist: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        let entity: ConfigEntity = serde_yaml::from_str(&content)?;
        entity.check()?;
        logging::info!(
            "[Config] Resolving Sentinel config from file, file {}",
            path.display()
        );
        Ok(entity)
    }
}

/// load_config resolves the configuration.
/// Priority: system environment > YAML file > default config.
/// If `config_path` is blank, the path is read from `SENTINEL_CONFIG_FILE_PATH`,
/// and the default config is used when it is absent too.
pub fn load_config(config_path: &str) -> Result<ConfigEntity> {
    let config_path = if utils::is_blank(config_path) {
        env::var(CONF_FILE_PATH_ENV_KEY).unwrap_or_default()
    } else {
        config_path.to_owned()
    };
    let mut entity = if utils::is_blank(&config_path) {
        ConfigEntity::new()
    } else {
        ConfigEntity::from_yaml_file(&config_path)?
    };
    override_items_from_system_env(&mut entity)?;
    logging::info!("[Config] App name resolved, appName {}", entity.app_name());
    Ok(entity)
}

/// The items present in the system environment override the loaded ones.
pub fn override_items_from_system_env(entity: &mut ConfigEntity) -> Result<()> {
    if let Ok(app_name) = env::var(APP_NAME_ENV_KEY) {
        if !utils::is_blank(&app_name) {
            entity.config.app.app_name = app_name;
        }
    }
    if let Ok(app_type) = env::var(APP_TYPE_ENV_KEY) {
        let app_type = app_type.trim().parse::<u8>().map_err(|err| {
            Error::msg(format!("invalid {}: {}", APP_TYPE_ENV_KEY, err))
        })?;
        entity.config.app.app_type = ResourceType::from(app_type);
    }
    entity.check()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::logging::Logger;

    #[test]
    fn yaml_file() {
        let path = env::temp_dir().join(format!("sentinel-{}.yaml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"
version: v1
config:
  app:
    app_name: yaml-app
  log:
    logger:
      EnvLogger: debug
  stat:
    sample_count: 4
    interval_ms: 2000
"#,
        )
        .unwrap();
        let entity = ConfigEntity::from_yaml_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(entity.app_name(), "yaml-app");
        assert_eq!(entity.config.log.logger, Logger::EnvLogger("debug".into()));
        assert_eq!(entity.stat().sample_count, 4);
        assert_eq!(entity.stat().interval_ms, 2000);
        // absent items are defaulted
        assert_eq!(entity.stat().interval_ms_total, 10000);
        assert_eq!(entity.config.stat.system.memory_interval_ms, MEMORY_INTERVAL_MS);
    }

    #[test]
    fn missing_file() {
        assert!(ConfigEntity::from_yaml_file("not-exist-sentinel.yaml").is_err());
    }

    #[test]
    fn invalid_yaml_rejected() {
        let path = env::temp_dir().join(format!("sentinel-{}.yaml", uuid::Uuid::new_v4()));
        fs::write(&path, "config:\n  stat:\n    sample_count: 3\n").unwrap();
        let res = ConfigEntity::from_yaml_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(res.is_err());
    }
}
