// Moderation domain models - the values that flow through the pipeline.
//
// These are pure domain types with no provider or console dependencies.
// Callers receive a finished `ModerationState` and decide how to present it.

use super::moderation_service::ModerationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Auxiliary facts about a piece of content, computed before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetadata {
    /// Number of characters (Unicode scalar values), not bytes.
    pub length: usize,
    pub word_count: usize,
    pub has_url: bool,
    /// True when the content is blank after trimming.
    pub is_empty: bool,
}

/// How concerning a piece of content is, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    /// Appropriate, follows guidelines
    Safe,
    /// Borderline or mildly inappropriate, needs human review
    Questionable,
    /// Clear guideline violation
    Inappropriate,
    /// Dangerous, illegal or severe violation
    Harmful,
}

impl SeverityLevel {
    pub const ALL: [SeverityLevel; 4] = [
        SeverityLevel::Safe,
        SeverityLevel::Questionable,
        SeverityLevel::Inappropriate,
        SeverityLevel::Harmful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Safe => "safe",
            SeverityLevel::Questionable => "questionable",
            SeverityLevel::Inappropriate => "inappropriate",
            SeverityLevel::Harmful => "harmful",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the four severity names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity level: {0:?}")]
pub struct UnknownSeverity(pub String);

impl FromStr for SeverityLevel {
    type Err = UnknownSeverity;

    /// Exact lowercase match only. The judgment capability is told to use
    /// these spellings, so anything else is a contract breach.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeverityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

/// Terminal disposition for a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionDecision {
    Approve,
    /// Hold for review
    Flag,
    Reject,
    /// Urgent human attention
    Escalate,
}

impl ActionDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionDecision::Approve => "approve",
            ActionDecision::Flag => "flag",
            ActionDecision::Reject => "reject",
            ActionDecision::Escalate => "escalate",
        }
    }
}

impl fmt::Display for ActionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated answer from the judgment capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityJudgment {
    pub severity: SeverityLevel,
    pub explanation: String,
}

/// Where a `ModerationState` is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    Prepared,
    Classified,
    Routed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Start => write!(f, "start"),
            PipelineStage::Prepared => write!(f, "prepared"),
            PipelineStage::Classified => write!(f, "classified"),
            PipelineStage::Routed => write!(f, "routed"),
        }
    }
}

/// The record threaded through one moderation run.
///
/// Fields are private so they can only be filled in pipeline order:
/// metadata, then severity together with explanation, then action. Each
/// setter refuses to run out of order or to overwrite a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationState {
    content: String,
    metadata: Option<ContentMetadata>,
    severity: Option<SeverityLevel>,
    action: Option<ActionDecision>,
    explanation: Option<String>,
}

impl ModerationState {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
            severity: None,
            action: None,
            explanation: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> Option<&ContentMetadata> {
        self.metadata.as_ref()
    }

    pub fn severity(&self) -> Option<SeverityLevel> {
        self.severity
    }

    pub fn action(&self) -> Option<ActionDecision> {
        self.action
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn stage(&self) -> PipelineStage {
        if self.action.is_some() {
            PipelineStage::Routed
        } else if self.severity.is_some() {
            PipelineStage::Classified
        } else if self.metadata.is_some() {
            PipelineStage::Prepared
        } else {
            PipelineStage::Start
        }
    }

    pub(crate) fn attach_metadata(
        &mut self,
        metadata: ContentMetadata,
    ) -> Result<(), ModerationError> {
        self.expect_stage(PipelineStage::Start, "attach metadata")?;
        self.metadata = Some(metadata);
        Ok(())
    }

    pub(crate) fn record_judgment(
        &mut self,
        judgment: SeverityJudgment,
    ) -> Result<(), ModerationError> {
        self.expect_stage(PipelineStage::Prepared, "record a judgment")?;
        self.severity = Some(judgment.severity);
        self.explanation = Some(judgment.explanation);
        Ok(())
    }

    pub(crate) fn record_action(&mut self, action: ActionDecision) -> Result<(), ModerationError> {
        self.expect_stage(PipelineStage::Classified, "record an action")?;
        self.action = Some(action);
        Ok(())
    }

    fn expect_stage(&self, expected: PipelineStage, step: &str) -> Result<(), ModerationError> {
        let actual = self.stage();
        if actual != expected {
            return Err(ModerationError::InvariantViolation(format!(
                "cannot {} while state is {} (expected {})",
                step, actual, expected
            )));
        }
        Ok(())
    }
}
