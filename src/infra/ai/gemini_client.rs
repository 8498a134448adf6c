// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// Implements `AiProvider` against Gemini's `generateContent` endpoint.
//
// **Differences from the OpenAI-compatible client:**
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - Request format: `contents[]` with nested `parts`; the system prompt goes
//   in the top-level `systemInstruction` field.
// - Structured output: `generationConfig.responseMimeType` plus
//   `responseJsonSchema`.
// - Response format: text is at `candidates[0].content.parts[*].text`.

use crate::core::ai::{
    models::{AiConfig, AiMessage, AiProviderResponse},
    AiProvider, ProviderError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================

/// A single part of content.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Set on parts that carry the model's thinking rather than its answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    /// "user" or "model" (Gemini uses "model" instead of "assistant")
    #[serde(skip_serializing_if = "String::is_empty")]
    role: String,
    parts: Vec<Part>,
}

/// See: https://ai.google.dev/api/generate-content#generationconfig
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    /// "application/json" when a schema is supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,

    /// Why the model stopped generating (e.g., "STOP", "SAFETY").
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    /// Creates a new Gemini client with the given API key.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (connection pool)
    /// * `api_key` - Your Gemini API key from https://aistudio.google.com/apikey
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }

    fn text_part(text: String) -> Part {
        Part {
            text: Some(text),
            thought: None,
        }
    }

    /// Converts our generic `AiMessage` to Gemini's `Content` format.
    fn convert_message(msg: &AiMessage) -> Content {
        let role = match msg.role.as_str() {
            "assistant" => "model".to_string(),
            other => other.to_string(),
        };

        Content {
            role,
            parts: vec![Self::text_part(msg.content.clone())],
        }
    }

    fn build_request(messages: &[AiMessage], config: &AiConfig) -> GenerateContentRequest {
        // Gemini takes the system prompt as a separate field.
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| Content {
                role: String::new(),
                parts: vec![Self::text_part(m.content.clone())],
            });

        let contents = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(Self::convert_message)
            .collect();

        let schema = config.response_format.as_ref().map(|f| f.schema.clone());
        let generation_config = GenerationConfig {
            temperature: Some(config.temperature),
            max_output_tokens: config.max_tokens,
            response_mime_type: schema.as_ref().map(|_| "application/json"),
            response_json_schema: schema,
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    fn extract_response(body: GenerateContentResponse) -> Result<AiProviderResponse, ProviderError> {
        let candidate = body
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| {
                ProviderError::MalformedResponse(
                    "no candidates in Gemini response - the request may have been blocked"
                        .to_string(),
                )
            })?;

        let (thoughts, answers): (Vec<Part>, Vec<Part>) = candidate
            .content
            .parts
            .into_iter()
            .filter(|p| p.text.is_some())
            .partition(|p| p.thought == Some(true));

        let content: String = answers.into_iter().filter_map(|p| p.text).collect();
        if content.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(format!(
                "Gemini candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        let thinking: Vec<String> = thoughts.into_iter().filter_map(|p| p.text).collect();
        let thinking = if thinking.is_empty() {
            None
        } else {
            Some(thinking.join("\n\n"))
        };

        Ok(AiProviderResponse { content, thinking })
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, ProviderError> {
        let url = format!("{}/{}:generateContent", API_BASE, config.model);
        let request = Self::build_request(messages, config);

        // Never log the URL with the key attached.
        tracing::debug!(
            "Gemini request to model {}: {} messages",
            config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            let message = serde_json::from_str::<GeminiErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        let body: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON body: {}", e)))?;

        Self::extract_response(body)
    }
}

// =============================================================================
// TESTS
// =============================================================================
