// Moderation workflow - runs one submission through the pipeline.
//
// Prepare -> Classify -> Route, each exactly once and strictly forward.
// The first failing stage ends the run; nothing is ever defaulted.
//
// NO provider or console dependencies here - the judge is injected.

use super::content_analysis::prepare_content;
use super::moderation_models::ModerationState;
use super::router::route_state;
use super::severity_classifier::{classify_state, ClassificationError, SeverityJudge};
use std::fmt;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModerationError {
    /// The submission was blank. Not retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The judgment capability was unreachable, refused the request or timed
    /// out. `retryable` is false when the provider rejected the request itself.
    #[error("Classification unavailable: {detail}")]
    ClassificationUnavailable { detail: String, retryable: bool },

    /// The judgment capability answered outside the severity/explanation
    /// contract. Retrying the same call is unlikely to help.
    #[error("Classification contract error: {0}")]
    ClassificationContract(String),

    /// A pipeline stage ran out of order. Indicates a defect.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Which of the four failure kinds an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationErrorKind {
    Validation,
    ClassificationUnavailable,
    ClassificationContract,
    InvariantViolation,
}

impl fmt::Display for ModerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationErrorKind::Validation => write!(f, "validation"),
            ModerationErrorKind::ClassificationUnavailable => write!(f, "classification unavailable"),
            ModerationErrorKind::ClassificationContract => write!(f, "classification contract"),
            ModerationErrorKind::InvariantViolation => write!(f, "invariant violation"),
        }
    }
}

impl ModerationError {
    pub fn kind(&self) -> ModerationErrorKind {
        match self {
            ModerationError::Validation(_) => ModerationErrorKind::Validation,
            ModerationError::ClassificationUnavailable { .. } => {
                ModerationErrorKind::ClassificationUnavailable
            }
            ModerationError::ClassificationContract(_) => {
                ModerationErrorKind::ClassificationContract
            }
            ModerationError::InvariantViolation(_) => ModerationErrorKind::InvariantViolation,
        }
    }

    /// Only a transiently unavailable capability is worth retrying (with
    /// backoff, at the caller's discretion).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModerationError::ClassificationUnavailable {
                retryable: true,
                ..
            }
        )
    }
}

impl From<ClassificationError> for ModerationError {
    fn from(err: ClassificationError) -> Self {
        match err {
            ClassificationError::Unavailable { detail, retryable } => {
                ModerationError::ClassificationUnavailable { detail, retryable }
            }
            ClassificationError::Contract(detail) => ModerationError::ClassificationContract(detail),
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Moderation pipeline around an injected severity judge.
///
/// Holds no per-request state, so one instance can serve concurrent callers
/// (wrap it in an `Arc`).
pub struct ModerationWorkflow<J: SeverityJudge> {
    judge: J,
}

impl<J: SeverityJudge> ModerationWorkflow<J> {
    /// Create a new workflow with the given judge.
    pub fn new(judge: J) -> Self {
        Self { judge }
    }

    /// Moderate one piece of content.
    ///
    /// # Returns
    /// A routed `ModerationState` with metadata, severity, explanation and
    /// action populated, or the first error encountered.
    pub async fn run(&self, content: &str) -> Result<ModerationState, ModerationError> {
        let state = match prepare_content(content) {
            Ok(state) => state,
            Err(err) => {
                tracing::info!(error = %err, "Content rejected before classification");
                return Err(err);
            }
        };

        let state = match classify_state(&self.judge, state).await {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(
                    kind = %err.kind(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "Severity classification failed"
                );
                return Err(err);
            }
        };

        let state = route_state(state)?;

        if let (Some(severity), Some(action)) = (state.severity(), state.action()) {
            tracing::info!(
                severity = %severity,
                action = %action,
                content_length = state.metadata().map(|m| m.length).unwrap_or_default(),
                "Content moderated"
            );
        }

        Ok(state)
    }
}

// ============================================================================
// TESTS
// ============================================================================
