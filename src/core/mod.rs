mod config;
pub use config::{AppConfig, CompletionSettings, DEFAULT_TEMPERATURE};
