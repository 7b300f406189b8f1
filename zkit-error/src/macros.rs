/// Немедленно возвращает ошибку из текущей функции.
///
/// Ошибка конвертируется через `Into`, поэтому подходит любой тип, для
/// которого реализовано преобразование в тип ошибки функции.
///
/// Пример:
///
/// ```ignore
/// use zkit_error::{bail, DictError};
///
/// fn check(rehashing: bool) -> Result<(), DictError> {
///     if rehashing {
///         bail!(DictError::Rehashing);
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err(::core::convert::Into::into($err))
    };
}

/// Проверяет условие и вызывает `bail!`, если условие ложно.
///
/// Пример:
///
/// ```ignore
/// use zkit_error::{ensure, DictError};
///
/// fn expand(used: usize, size: usize) -> Result<(), DictError> {
///     ensure!(size >= used, DictError::SizeBelowUsed { requested: size, used });
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            $crate::bail!($err);
        }
    };
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
