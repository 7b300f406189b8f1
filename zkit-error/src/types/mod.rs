pub mod config;
pub mod dict;
pub mod skiplist;
pub mod validation;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use config::*;
pub use dict::*;
pub use skiplist::*;
pub use validation::*;
