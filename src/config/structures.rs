use serde::{Deserialize, Serialize};
use zkit_error::{ConfigError, ConfigResult};

/// Минимальный размер таблицы словаря.
pub const DICT_MIN_SIZE: usize = 4;

/// Порог принудительного расширения (used / size) по умолчанию.
pub const DICT_FORCE_RESIZE_RATIO: usize = 5;

/// Разрешено ли словарю расширяться по обычному порогу.
///
/// `Avoid` откладывает расширение, пока коэффициент заполнения не превысит
/// `force_resize_ratio` (например, на время снимка памяти).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizePolicy {
    #[default]
    Enable,
    Avoid,
}

/// Параметры словаря.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictConfig {
    /// Размер первой таблицы (степень двойки, не меньше 4).
    pub initial_size: usize,
    /// Коэффициент заполнения, после которого расширение идёт даже при
    /// `ResizePolicy::Avoid`.
    pub force_resize_ratio: usize,
    pub resize_policy: ResizePolicy,
}

/// Параметры пропускного списка.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipListConfig {
    /// Сид генератора уровней; `None` — случайный сид.
    pub seed: Option<u64>,
}

impl DictConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.initial_size < DICT_MIN_SIZE || !self.initial_size.is_power_of_two() {
            return Err(ConfigError::Invalid {
                field: "dict.initial_size",
                reason: format!(
                    "{} is not a power of two >= {DICT_MIN_SIZE}",
                    self.initial_size
                ),
            });
        }

        if self.force_resize_ratio == 0 {
            return Err(ConfigError::Invalid {
                field: "dict.force_resize_ratio",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for DictConfig {
    fn default() -> Self {
        Self {
            initial_size: DICT_MIN_SIZE,
            force_resize_ratio: DICT_FORCE_RESIZE_RATIO,
            resize_policy: ResizePolicy::Enable,
        }
    }
}
