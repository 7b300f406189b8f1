//! zkit: in-memory building blocks of a key-value engine.
//!
//! - [`Dict`]: chained hash table with incremental rehashing, safe and
//!   unsafe cursors and a pluggable [`DictType`].
//! - [`ZSkipList`]: rank-augmented skip list ordered by `(score, member)`.

/// Settings loading: defaults, optional file, `ZKIT__*` environment.
pub mod config;
/// Built-in data structures (Dict, ZSkipList).
pub mod database;
/// Logging setup (formatting, filters).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{DictConfig, ResizePolicy, Settings, SkipListConfig};
/// Data types: Dict, ZSkipList and their helpers.
pub use database::{
    CursorKind, Dict, DictCursor, DictEntry, DictStats, DictType, Entry, GeometricLevels,
    HashDictType, LevelSampler, MurmurDictType, Replaced, ScoreRange, SkipListNode,
    SkipListStatistics, ZSkipList,
};
/// Logging initialisation.
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// Operation errors and result types.
pub use zkit_error::{
    ConfigError, ConfigResult, DictError, DictResult, ErrorExt, SkipListError, SkipListResult,
    StatusCode, ValidationError,
};
