use thiserror::Error;

pub type Result<T> = std::result::Result<T, StarterError>;

/// Errors raised while wiring the exception handler at start-up
#[derive(Debug, Error)]
pub enum StarterError {
    #[error("Dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Invalid value '{value}' for configuration key {key}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },
}

impl StarterError {
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
