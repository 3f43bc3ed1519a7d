//! Error types for configuration resolution

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown service type: {0}")]
    UnknownServiceType(String),

    #[error("Missing option '{option}' for {context}")]
    MissingOption { option: String, context: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigError {
    /// Whether the error stems from configuration content (as opposed to loading it).
    pub fn is_invalid_configuration(&self) -> bool {
        !matches!(self, ConfigError::Load(_))
    }
}
