//! Инициализация логирования на `tracing-subscriber`.

pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zkit_error::{ConfigError, ConfigResult};

/// Устанавливает глобальный subscriber по конфигурации.
///
/// Возвращает `ConfigError::Logging`, если глобальный subscriber уже
/// установлен.
pub fn init_logging(config: &LoggingConfig) -> ConfigResult<()> {
    config.validate()?;

    let env_filter = filters::build_filter_from_config(config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatter::build_formatter_from_config(config))
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = ?config.format,
        "Logging system initialized"
    );

    Ok(())
}
