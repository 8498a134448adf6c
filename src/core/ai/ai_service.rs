use super::models::{AiConfig, AiMessage, AiProviderResponse};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP request never produced a response (DNS, TLS, connect, read).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The provider answered but the body did not have the expected shape.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Whether the same request can succeed later. Client errors other than
    /// 408/429 (bad key, rejected schema) will keep failing.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Request(_) => true,
            ProviderError::Status { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            ProviderError::MalformedResponse(_) => false,
        }
    }
}

// ============================================================================
// PROVIDER TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request to the AI provider.
    ///
    /// Returns an `AiProviderResponse` containing the main content and
    /// optional thinking/reasoning from the model.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, ProviderError>;
}

// Lets the classifier hold a provider chosen at runtime (OpenRouter, Gemini).
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, ProviderError> {
        (**self).chat_complete(messages, config).await
    }
}
