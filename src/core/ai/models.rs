use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: String,
    pub content: String,
}

impl AiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A JSON schema the provider should constrain its reply to.
///
/// Providers that support structured output translate this into their own
/// request field (`response_format` for OpenAI-compatible APIs,
/// `responseJsonSchema` for Gemini).
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    /// Short identifier for the schema, sent where the API asks for a name.
    pub name: String,
    /// The JSON Schema document.
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub response_format: Option<ResponseFormat>,
}

/// Response from an AI provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiProviderResponse {
    /// The main response content from the model.
    pub content: String,

    /// Optional thinking/reasoning the provider returned alongside the answer.
    pub thinking: Option<String>,
}
