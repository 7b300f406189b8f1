pub mod dict;
pub mod skiplist;

pub use dict::{
    CursorKind, Dict, DictCursor, DictEntry, DictStats, DictType, Entry, HashDictType,
    MurmurDictType, Replaced, TableStats,
};
pub use skiplist::{
    GeometricLevels, LevelSampler, ScoreRange, SkipListNode, SkipListStatistics, ZSkipList,
    MAX_LEVEL,
};
