use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    #[error("No {kind} provider registered under the name '{name}'")]
    ProviderNotFound { kind: String, name: String },

    #[error("Invalid {kind} provider '{name}': {reason}")]
    InvalidProvider {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl RunnerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        RunnerError::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        RunnerError::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RunnerError::Validation(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RunnerError::Configuration(_)
                | RunnerError::ProviderNotFound { .. }
                | RunnerError::InvalidProvider { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;
