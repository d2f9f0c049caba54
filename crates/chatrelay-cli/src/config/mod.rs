pub mod settings;

pub use settings::{ConfigError, FileConfig, LoggingSettings, Settings};
