//! Словарь с инкрементальным рехешированием.
//!
//! # Модули
//!
//! - `dict_base`: таблицы, вставка, поиск, удаление и рехеширование.
//! - `dict_type`: трейт `DictType` и готовые типы словаря.
//! - `cursor`: безопасные и небезопасные курсоры обхода.
//! - `entry`: Entry API.
//! - `hash`: MurmurHash2 и перемешивание для отпечатка.
//! - `stats`: статистика и проверка инвариантов.

pub mod cursor;
pub mod dict_base;
pub mod dict_type;
pub mod entry;
pub mod hash;
pub mod stats;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use cursor::*;
pub use dict_base::{Dict, DictEntry, DictIter, EntryKey, Replaced};
pub use dict_type::*;
pub use entry::*;
pub use hash::{murmur2, DEFAULT_SEED};
pub use stats::*;
