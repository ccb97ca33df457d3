// Configuration management module
// TOML settings, the API credential, and interactive setup

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    ApiConfig, ApiKey, ChatConfig, Config, ConfigError, CorpusConfig, EmbeddingConfig,
    RetrievalConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
