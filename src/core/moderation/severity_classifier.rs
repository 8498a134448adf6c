// Severity classifier - asks an external judgment capability for a verdict
// and holds it to a strict two-field contract.
//
// The `SeverityJudge` trait is the seam: the workflow only knows about it,
// production code plugs in `LlmSeverityClassifier`, tests plug in stubs.

use super::moderation_models::{
    ContentMetadata, ModerationState, PipelineStage, SeverityJudgment, SeverityLevel,
    UnknownSeverity,
};
use super::moderation_service::ModerationError;
use crate::core::ai::{AiConfig, AiMessage, AiProvider, ProviderError, ResponseFormat};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

// ============================================================================
// INSTRUCTION CONTRACT
// ============================================================================

/// Bump whenever the instruction text or the judgment schema changes; the
/// two form one contract with the judgment capability.
pub const INSTRUCTION_VERSION: &str = "2";

pub const SEVERITY_INSTRUCTION: &str = "\
You are a content moderation system. Classify content into EXACTLY ONE of these severity levels:

1. safe - Content is appropriate, follows guidelines, no issues.

2. questionable - Content is borderline, may contain mild profanity or be slightly inappropriate but not clearly harmful. Examples: mild swearing, borderline language, controversial opinions.

3. inappropriate - Content clearly violates community guidelines. Contains strong profanity, harassment, spam, or explicit content. Should be rejected. Examples: strong profanity, personal attacks, spam, explicit sexual content.

4. harmful - Content is dangerous, illegal, or severely violates guidelines. Examples: threats, hate speech, illegal content, severe harassment, scams.

Be strict: if content clearly violates guidelines, classify as \"inappropriate\", not \"questionable\".

Respond with a JSON object with exactly two fields:
- \"severity\": one of \"safe\", \"questionable\", \"inappropriate\", \"harmful\"
- \"explanation\": a short explanation of why the content received that severity";

const SCHEMA_NAME: &str = "severity_classification";

/// JSON schema for the judgment, sent to providers that support structured
/// output.
pub fn judgment_schema() -> serde_json::Value {
    let levels: Vec<&str> = SeverityLevel::ALL.iter().map(|l| l.as_str()).collect();
    serde_json::json!({
        "type": "object",
        "properties": {
            "severity": {
                "type": "string",
                "enum": levels,
                "description": "Severity level of the content"
            },
            "explanation": {
                "type": "string",
                "description": "Why the content received this severity"
            }
        },
        "required": ["severity", "explanation"],
        "additionalProperties": false
    })
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// The capability could not be reached, refused the request or did not
    /// answer in time. `retryable` is false when repeating the same call
    /// cannot help (e.g. the provider rejected the API key).
    #[error("judgment capability unavailable: {detail}")]
    Unavailable { detail: String, retryable: bool },

    /// The capability answered, but not with a valid severity/explanation.
    #[error("judgment contract violated: {0}")]
    Contract(String),
}

// ============================================================================
// JUDGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait SeverityJudge: Send + Sync {
    /// Classify non-empty content. Implementations must only return severities
    /// from the closed enumeration and a non-blank explanation.
    async fn classify(
        &self,
        content: &str,
        metadata: &ContentMetadata,
    ) -> Result<SeverityJudgment, ClassificationError>;
}

// Lets one judge be shared between workflows (and inspected by tests).
#[async_trait]
impl<J: SeverityJudge + ?Sized> SeverityJudge for Arc<J> {
    async fn classify(
        &self,
        content: &str,
        metadata: &ContentMetadata,
    ) -> Result<SeverityJudgment, ClassificationError> {
        (**self).classify(content, metadata).await
    }
}

/// Run the classification stage on a prepared state.
pub async fn classify_state<J: SeverityJudge + ?Sized>(
    judge: &J,
    mut state: ModerationState,
) -> Result<ModerationState, ModerationError> {
    let metadata = match (state.stage(), state.metadata()) {
        (PipelineStage::Prepared, Some(metadata)) => *metadata,
        (stage, _) => {
            return Err(ModerationError::InvariantViolation(format!(
                "classifier reached with state {} (expected prepared)",
                stage
            )))
        }
    };

    let judgment = judge.classify(state.content(), &metadata).await?;
    state.record_judgment(judgment)?;
    Ok(state)
}

// ============================================================================
// LLM-BACKED JUDGE
// ============================================================================

/// Settings for the LLM-backed judge. Passed in explicitly so nothing is read
/// from the environment below `main`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub model: String,
    /// 0.0 is the most deterministic setting and the default.
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Upper bound on a single call to the provider.
    pub timeout: Duration,
}

impl ClassifierConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

pub struct LlmSeverityClassifier<P: AiProvider> {
    provider: P,
    config: ClassifierConfig,
    ai_config: AiConfig,
}

impl<P: AiProvider> LlmSeverityClassifier<P> {
    pub fn new(provider: P, config: ClassifierConfig) -> Self {
        let ai_config = AiConfig {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: Some(ResponseFormat {
                name: SCHEMA_NAME.to_string(),
                schema: judgment_schema(),
            }),
        };

        Self {
            provider,
            config,
            ai_config,
        }
    }

    fn build_messages(content: &str, metadata: &ContentMetadata) -> Vec<AiMessage> {
        vec![
            AiMessage::system(SEVERITY_INSTRUCTION),
            AiMessage::user(format!(
                "Analyze the following content.\n\nContent:\n{}\n\nAnalysis metadata:\n{}",
                content,
                render_metadata(metadata)
            )),
        ]
    }
}

#[async_trait]
impl<P: AiProvider> SeverityJudge for LlmSeverityClassifier<P> {
    async fn classify(
        &self,
        content: &str,
        metadata: &ContentMetadata,
    ) -> Result<SeverityJudgment, ClassificationError> {
        let messages = Self::build_messages(content, metadata);
        let started = Instant::now();

        tracing::debug!(
            model = %self.config.model,
            instruction_version = INSTRUCTION_VERSION,
            content_length = metadata.length,
            "Requesting severity judgment"
        );

        let call = self.provider.chat_complete(&messages, &self.ai_config);
        let response = match tokio::time::timeout(self.config.timeout, call).await {
            Err(_) => {
                return Err(ClassificationError::Unavailable {
                    detail: format!("no response within {}ms", self.config.timeout.as_millis()),
                    retryable: true,
                })
            }
            Ok(Err(ProviderError::MalformedResponse(detail))) => {
                return Err(ClassificationError::Contract(detail))
            }
            Ok(Err(err)) => {
                return Err(ClassificationError::Unavailable {
                    retryable: err.is_retryable(),
                    detail: err.to_string(),
                })
            }
            Ok(Ok(response)) => response,
        };

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            reply_chars = response.content.len(),
            thinking_chars = response.thinking.as_ref().map(|t| t.len()).unwrap_or(0),
            "Severity judgment received"
        );

        parse_judgment(&response.content)
    }
}

fn render_metadata(metadata: &ContentMetadata) -> String {
    format!(
        "- length: {}\n- word_count: {}\n- has_url: {}",
        metadata.length, metadata.word_count, metadata.has_url
    )
}

// ============================================================================
// REPLY PARSING
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJudgment {
    severity: Option<String>,
    explanation: Option<String>,
}

/// Validate a raw model reply into a judgment.
pub fn parse_judgment(reply: &str) -> Result<SeverityJudgment, ClassificationError> {
    let body = strip_code_fence(reply);
    if body.is_empty() {
        return Err(ClassificationError::Contract("empty reply".to_string()));
    }

    let raw: RawJudgment = serde_json::from_str(body).map_err(|e| {
        ClassificationError::Contract(format!("reply is not a judgment object: {}", e))
    })?;

    let severity = raw
        .severity
        .ok_or_else(|| ClassificationError::Contract("severity is missing".to_string()))?;
    let severity: SeverityLevel = severity
        .trim()
        .parse()
        .map_err(|e: UnknownSeverity| ClassificationError::Contract(e.to_string()))?;

    let explanation = raw
        .explanation
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ClassificationError::Contract("explanation is missing or empty".to_string()))?;

    Ok(SeverityJudgment {
        severity,
        explanation,
    })
}

/// Some models wrap JSON in a Markdown fence even when asked not to.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // Drop the info string ("json") on the opening fence line.
    match rest.find('\n') {
        Some(newline) => rest[newline + 1..].trim(),
        None => rest.trim(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::AiProviderResponse;
    use crate::core::moderation::{
        extract_metadata, prepare_content, ModerationErrorKind, ModerationWorkflow,
    };
    use std::sync::Mutex;

    /// Provider that replays a canned reply and captures what it was sent.
    struct CannedProvider {
        reply: Result<String, fn() -> ProviderError>,
        delay: Option<Duration>,
        seen: Arc<Mutex<Vec<(Vec<AiMessage>, AiConfig)>>>,
    }

    impl CannedProvider {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: None,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing(err: fn() -> ProviderError) -> Self {
            Self {
                reply: Err(err),
                delay: None,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl AiProvider for CannedProvider {
        async fn chat_complete(
            &self,
            messages: &[AiMessage],
            config: &AiConfig,
        ) -> Result<AiProviderResponse, ProviderError> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), config.clone()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(content) => Ok(AiProviderResponse {
                    content: content.clone(),
                    thinking: None,
                }),
                Err(make_err) => Err(make_err()),
            }
        }
    }

    async fn classify_with(
        provider: CannedProvider,
    ) -> Result<SeverityJudgment, ClassificationError> {
        let content = "check https://example.com";
        let classifier = LlmSeverityClassifier::new(provider, ClassifierConfig::new("test-model"));
        classifier.classify(content, &extract_metadata(content)).await
    }

    #[test]
    fn test_parse_valid_judgment() {
        let judgment =
            parse_judgment(r#"{"severity": "questionable", "explanation": "Mild swearing."}"#)
                .unwrap();

        assert_eq!(judgment.severity, SeverityLevel::Questionable);
        assert_eq!(judgment.explanation, "Mild swearing.");
    }

    #[test]
    fn test_parse_keeps_explanation_verbatim() {
        let judgment =
            parse_judgment(r#"{"severity":"harmful","explanation":"  Threat of violence.\n"}"#)
                .unwrap();
        assert_eq!(judgment.explanation, "  Threat of violence.\n");
    }

    #[test]
    fn test_parse_accepts_fenced_json() {
        let reply = "```json\n{\"severity\": \"safe\", \"explanation\": \"Friendly.\"}\n```";
        assert_eq!(parse_judgment(reply).unwrap().severity, SeverityLevel::Safe);
    }

    #[test]
    fn test_parse_rejects_unknown_severity() {
        let err =
            parse_judgment(r#"{"severity": "unknown", "explanation": "Not sure."}"#).unwrap_err();
        assert!(matches!(err, ClassificationError::Contract(_)));
    }

    #[test]
    fn test_parse_rejects_missing_or_blank_explanation() {
        for reply in [
            r#"{"severity": "safe"}"#,
            r#"{"severity": "safe", "explanation": ""}"#,
            r#"{"severity": "safe", "explanation": "   "}"#,
            r#"{"severity": "safe", "explanation": null}"#,
        ] {
            let err = parse_judgment(reply).unwrap_err();
            assert!(matches!(err, ClassificationError::Contract(_)), "{}", reply);
        }
    }

    #[test]
    fn test_parse_rejects_non_json_and_extra_fields() {
        for reply in [
            "",
            "safe",
            "The content is safe.",
            r#"{"explanation": "no severity"}"#,
            r#"{"severity": 1, "explanation": "numeric"}"#,
            r#"{"severity": "safe", "explanation": "ok", "action": "approve"}"#,
        ] {
            let err = parse_judgment(reply).unwrap_err();
            assert!(matches!(err, ClassificationError::Contract(_)), "{}", reply);
        }
    }

    #[test]
    fn test_schema_lists_exactly_the_four_levels() {
        let schema = judgment_schema();
        let levels = schema["properties"]["severity"]["enum"].as_array().unwrap();

        assert_eq!(levels.len(), 4);
        for level in SeverityLevel::ALL {
            assert!(levels.iter().any(|v| v == level.as_str()));
        }
        assert_eq!(schema["required"], serde_json::json!(["severity", "explanation"]));
    }

    #[tokio::test]
    async fn test_classifier_sends_instruction_content_and_metadata() {
        let provider = CannedProvider::replying(r#"{"severity":"safe","explanation":"Fine."}"#);
        let seen = Arc::clone(&provider.seen);

        let judgment = classify_with(provider).await.unwrap();
        assert_eq!(judgment.severity, SeverityLevel::Safe);

        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (messages, config) = &calls[0];

        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SEVERITY_INSTRUCTION);
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains("check https://example.com"));
        assert!(messages[1].content.contains("- has_url: true"));

        assert_eq!(config.model, "test-model");
        assert_eq!(config.temperature, 0.0);
        assert!(config.response_format.is_some());
    }

    #[tokio::test]
    async fn test_classifier_maps_transport_failure_to_unavailable() {
        let provider = CannedProvider::failing(|| ProviderError::Status {
            status: 503,
            message: "overloaded".to_string(),
        });

        let err = classify_with(provider).await.unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::Unavailable {
                retryable: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_classifier_marks_rejected_credentials_as_not_retryable() {
        let provider = CannedProvider::failing(|| ProviderError::Status {
            status: 401,
            message: "Invalid API key".to_string(),
        });

        let err = classify_with(provider).await.unwrap_err();
        match err {
            ClassificationError::Unavailable { detail, retryable } => {
                assert!(!retryable);
                assert!(detail.contains("401"));
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_severity_fails_full_run_as_contract_error() {
        let classifier = LlmSeverityClassifier::new(
            CannedProvider::replying(r#"{"severity":"unknown","explanation":"Not sure."}"#),
            ClassifierConfig::new("test-model"),
        );
        let workflow = ModerationWorkflow::new(classifier);

        let err = workflow.run("hello").await.unwrap_err();

        assert_eq!(err.kind(), ModerationErrorKind::ClassificationContract);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_full_run_without_retry() {
        let classifier = LlmSeverityClassifier::new(
            CannedProvider::failing(|| ProviderError::Status {
                status: 401,
                message: "Invalid API key".to_string(),
            }),
            ClassifierConfig::new("test-model"),
        );
        let workflow = ModerationWorkflow::new(classifier);

        let err = workflow.run("hello").await.unwrap_err();

        assert_eq!(err.kind(), ModerationErrorKind::ClassificationUnavailable);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_classifier_maps_malformed_envelope_to_contract() {
        let provider = CannedProvider::failing(|| {
            ProviderError::MalformedResponse("no choices in response".to_string())
        });

        let err = classify_with(provider).await.unwrap_err();
        assert!(matches!(err, ClassificationError::Contract(_)));
    }

    #[tokio::test]
    async fn test_classifier_times_out_as_unavailable() {
        let mut provider = CannedProvider::replying(r#"{"severity":"safe","explanation":"Fine."}"#);
        provider.delay = Some(Duration::from_secs(5));

        let mut config = ClassifierConfig::new("test-model");
        config.timeout = Duration::from_millis(20);
        let classifier = LlmSeverityClassifier::new(provider, config);

        let err = classifier
            .classify("hello", &extract_metadata("hello"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::Unavailable {
                retryable: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_classify_state_requires_prepared_state() {
        let classifier = LlmSeverityClassifier::new(
            CannedProvider::replying(r#"{"severity":"safe","explanation":"Fine."}"#),
            ClassifierConfig::new("test-model"),
        );

        let err = classify_state(&classifier, ModerationState::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::InvariantViolation(_)));

        let state = classify_state(&classifier, prepare_content("hello").unwrap())
            .await
            .unwrap();
        assert_eq!(state.stage(), PipelineStage::Classified);
        assert_eq!(state.explanation(), Some("Fine."));
    }
}
