use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use zkit_error::{ConfigError, ConfigResult};

use super::structures::{DictConfig, SkipListConfig};
use crate::logging::LoggingConfig;

/// Префикс переменных окружения (`ZKIT__DICT__INITIAL_SIZE=64`).
pub const ENV_PREFIX: &str = "ZKIT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dict: DictConfig,
    pub skiplist: SkipListConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Значения по умолчанию + переменные окружения `ZKIT__*`.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(None)
    }

    /// Как `load`, но сначала читает файл (toml/yaml/json по расширению).
    /// Переменные окружения перекрывают значения из файла.
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let settings: Settings = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.dict.validate()?;
        self.logging.validate()
    }
}
