pub mod settings;
pub mod structures;

pub use settings::Settings;
pub use structures::{DictConfig, ResizePolicy, SkipListConfig};
