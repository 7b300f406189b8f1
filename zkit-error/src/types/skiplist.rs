use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

pub type SkipListResult<T> = Result<T, SkipListError>;

/// Ошибки пропускного списка с рангами.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipListError {
    /// Пара (score, member) уже есть в списке.
    #[error("Element ({score}, {member:?}) is already present")]
    DuplicateElement { score: f64, member: String },

    /// Элемент для обновления не найден.
    #[error("Element ({score}, {member:?}) not found")]
    ElementNotFound { score: f64, member: String },

    /// NaN не участвует в полном порядке по score.
    #[error("Score is not a number")]
    NanScore,

    /// Не удалось разобрать границу диапазона.
    #[error("Invalid score range: {reason}")]
    InvalidRange { reason: String },
}

impl ErrorExt for SkipListError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateElement { .. } => StatusCode::AlreadyExists,
            Self::ElementNotFound { .. } => StatusCode::NotFound,
            Self::NanScore => StatusCode::InvalidValue,
            Self::InvalidRange { .. } => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
