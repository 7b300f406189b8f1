use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Нарушения инвариантов, найденные проверками `validate_invariants`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Уровень узла превышает максимальный
    #[error("Node level {node_level} exceeds maximum level {max_level}")]
    InvalidLevel { node_level: usize, max_level: usize },
    /// Нарушен порядок сортировки
    #[error("Sort order violation: {message}")]
    SortOrderViolation { message: String },
    /// Длина не соответствует реальному кол-ву элементов
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    /// Backward-ссылка указывает на неверный узел
    #[error("Invalid backward link: {message}")]
    InvalidBackwardLink { message: String },
    /// Span уровня не совпадает с реальным расстоянием
    #[error("Span mismatch at level {level}: stored {stored}, actual {actual}")]
    SpanMismatch {
        level: usize,
        stored: usize,
        actual: usize,
    },
    /// Размер таблицы не является степенью двойки или меньше минимума
    #[error("Invalid table size {size}")]
    InvalidTableSize { size: usize },
    /// Ключ лежит не в том бакете или в уже перенесённой части таблицы
    #[error("Misplaced entry: {message}")]
    MisplacedEntry { message: String },
}

impl ErrorExt for ValidationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::CorruptedData
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
