//! Domain-specific error types for echoleaf

use thiserror::Error;

use crate::clients::UpstreamError;

/// Main error type for the EchoLeaf pipeline
#[derive(Error, Debug)]
pub enum EchoLeafError {
    #[error("Invalid input: {message}")]
    InputValidation { message: String },

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Format error: {message}")]
    Format { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EchoLeafError {
    pub fn validation(message: impl Into<String>) -> Self {
        EchoLeafError::InputValidation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EchoLeafError::Internal {
            message: message.into(),
        }
    }

    /// Display string shown to the user at the pipeline boundary.
    pub fn user_message(&self) -> String {
        match self {
            EchoLeafError::InputValidation { message } => message.clone(),
            EchoLeafError::Upstream(err) => crate::error_map::user_message(err).to_string(),
            EchoLeafError::Format { .. } => {
                "The AI returned an invalid data format. Please try again.".to_string()
            }
            EchoLeafError::Storage { .. } => {
                "Your library could not be saved to disk. Results are still available for this session."
                    .to_string()
            }
            EchoLeafError::Config { message } => format!("Configuration problem: {message}"),
            EchoLeafError::Serialization { .. } | EchoLeafError::Internal { .. } => {
                "Something went wrong while processing the request. Please try again.".to_string()
            }
        }
    }

    /// Whether the user should simply be asked to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EchoLeafError::Format { .. } | EchoLeafError::Upstream(_)
        )
    }
}

impl From<anyhow::Error> for EchoLeafError {
    fn from(err: anyhow::Error) -> Self {
        EchoLeafError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for EchoLeafError {
    fn from(err: serde_json::Error) -> Self {
        EchoLeafError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for EchoLeafError {
    fn from(err: std::io::Error) -> Self {
        EchoLeafError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EchoLeafError {
    fn from(err: toml::de::Error) -> Self {
        EchoLeafError::Config {
            message: err.to_string(),
        }
    }
}

/// Result type alias for EchoLeaf operations
pub type Result<T> = std::result::Result<T, EchoLeafError>;
