use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

pub type DictResult<T> = Result<T, DictError>;

/// Ошибки хеш-таблицы с инкрементальным рехешированием.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DictError {
    /// Ключ уже присутствует (для `add` это штатный результат, а не сбой).
    #[error("Key already exists")]
    KeyExists,

    /// Ключ не найден.
    #[error("Key not found")]
    KeyNotFound,

    /// Расширение запрошено во время незавершённого рехеширования.
    #[error("Cannot expand: rehashing is already in progress")]
    Rehashing,

    /// Запрошенный размер меньше количества живых элементов.
    #[error("Cannot expand to {requested} buckets: table holds {used} entries")]
    SizeBelowUsed { requested: usize, used: usize },

    /// Не удалось выделить массив бакетов.
    #[error("Out of memory while allocating {buckets} buckets")]
    OutOfMemory { buckets: usize },

    /// Структура изменилась во время небезопасной итерации.
    #[error("Dict modified during unsafe iteration: fingerprint {expected:#x} != {actual:#x}")]
    FingerprintMismatch { expected: u64, actual: u64 },
}

impl ErrorExt for DictError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::KeyExists => StatusCode::AlreadyExists,
            Self::KeyNotFound => StatusCode::NotFound,
            Self::Rehashing => StatusCode::InvalidOperation,
            Self::SizeBelowUsed { .. } => StatusCode::InvalidArgs,
            Self::OutOfMemory { .. } => StatusCode::OutOfMemory,
            Self::FingerprintMismatch { .. } => StatusCode::ConcurrentModification,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
