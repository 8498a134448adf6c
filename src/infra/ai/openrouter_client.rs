// OpenRouter (and any OpenAI-compatible) chat completions client.
//
// Structured output is requested through `response_format` with a strict
// JSON schema; the reply text is at `choices[0].message.content`.

use crate::core::ai::{
    models::{AiConfig, AiMessage, AiProviderResponse, ResponseFormat},
    AiProvider, ProviderError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [AiMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonSchemaFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaSpec<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

impl<'a> From<&'a ResponseFormat> for JsonSchemaFormat<'a> {
    fn from(format: &'a ResponseFormat) -> Self {
        Self {
            kind: "json_schema",
            json_schema: JsonSchemaSpec {
                name: &format.name,
                strict: true,
                schema: &format.schema,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    /// Reasoning text, only present for models with reasoning enabled.
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    /// `base_url` is OpenRouter's API root or any other OpenAI-compatible
    /// endpoint (e.g. `https://api.openai.com/v1`).
    pub fn with_base_url(client: Client, api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(
        messages: &'a [AiMessage],
        config: &'a AiConfig,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &config.model,
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: config.response_format.as_ref().map(JsonSchemaFormat::from),
        }
    }

    fn extract_response(body: ChatCompletionResponse) -> Result<AiProviderResponse, ProviderError> {
        let message = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".to_string()))?;

        let content = message.content.filter(|c| !c.trim().is_empty()).ok_or_else(|| {
            ProviderError::MalformedResponse("response message has no content".to_string())
        })?;

        Ok(AiProviderResponse {
            content,
            thinking: message.reasoning,
        })
    }
}

#[async_trait]
impl AiProvider for OpenRouterClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, ProviderError> {
        let payload = Self::build_request(messages, config);

        tracing::debug!(
            "OpenRouter request to model {}: {} messages",
            config.model,
            messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let body: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON body: {}", e)))?;

        Self::extract_response(body)
    }
}
