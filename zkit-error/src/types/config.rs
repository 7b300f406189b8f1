use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Ошибки загрузки и проверки конфигурации.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Источник конфигурации не удалось прочитать или разобрать.
    #[error("Failed to load configuration: {0}")]
    Load(String),

    /// Значение поля не прошло проверку.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Не удалось инициализировать логирование.
    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Load(_) | Self::Invalid { .. } => StatusCode::InvalidConfig,
            Self::Logging(_) => StatusCode::Internal,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
