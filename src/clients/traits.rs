use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{ChatRole, GroundingSource};

/// One piece of a turn sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    /// Inline binary content, base64 encoded
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: ChatRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// A single generateContent call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub contents: Vec<Turn>,
    /// Enables search augmentation (grounding)
    pub use_search: bool,
    pub thinking_budget: Option<u32>,
}

impl GenerationRequest {
    /// Concatenated text of every part, for logging and assertions.
    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|t| t.parts.iter())
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    /// Citations from grounding metadata, delivered outside the text body
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("upstream returned HTTP {status} {code}: {message}")]
    Http {
        status: u16,
        /// Upstream status string, e.g. RESOURCE_EXHAUSTED
        code: String,
        message: String,
    },
    #[error("response blocked by upstream: {reason}")]
    Blocked { reason: String },
    #[error("upstream returned no content")]
    Empty,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Network {
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError>;
}

#[async_trait]
impl<B: GenerationBackend + ?Sized> GenerationBackend for Arc<B> {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, UpstreamError> {
        (**self).generate(request).await
    }
}
