//! ZSkipList - пропускной список с рангами для упорядоченных множеств.
//!
//! # Модули
//!
//! - `skiplist_base`: узлы, вставка, удаление, ранги и диапазоны.
//! - `level`: генераторы уровней новых узлов.
//! - `range`: диапазоны score с открытыми и закрытыми границами.
//! - `safety`: валидация и статистика.

pub mod level;
pub mod range;
pub mod safety;
pub mod skiplist_base;

// Publicly re-export all error types and functions from the submodules to
// simplify access from external code.
pub use level::*;
pub use range::*;
pub use safety::*;
pub use skiplist_base::{NodeKey, RangeIter, ReverseIter, SkipListIter, SkipListNode, ZSkipList};
