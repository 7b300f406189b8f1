use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use zkit_error::{ConfigError, ConfigResult};

/// Формат вывода логов.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень (`trace`, `debug`, `info`, ...) или полная директива
    /// фильтра (`zkit=debug,info`).
    pub level: String,
    pub format: LogFormat,
    pub ansi: bool,
    pub with_target: bool,
    pub with_line_numbers: bool,
}

impl LoggingConfig {
    /// Директива для `EnvFilter`.
    pub fn build_filter_directive(&self) -> String {
        self.level.trim().to_string()
    }

    /// Проверяет, что директива уровня разбирается `EnvFilter`.
    pub fn validate(&self) -> ConfigResult<()> {
        let directive = self.build_filter_directive();
        if directive.is_empty() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: "empty filter directive".to_string(),
            });
        }

        EnvFilter::try_new(&directive).map_err(|e| ConfigError::Invalid {
            field: "logging.level",
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            ansi: true,
            with_target: true,
            with_line_numbers: false,
        }
    }
}
