//! Plain-text rendering of moderation results.
//!
//! The core hands back the judge's explanation untouched; the wording shown to
//! the submitter is decided here.

use crate::core::moderation::{
    ActionDecision, ModerationError, ModerationErrorKind, ModerationState,
};

/// The message shown to the person who submitted the content.
pub fn verdict_message(action: ActionDecision, explanation: &str) -> String {
    match action {
        ActionDecision::Approve => format!(
            "✅ Your content has been approved and is safe to publish. No changes needed.\n\nAnalysis: {}",
            explanation
        ),
        ActionDecision::Flag => format!(
            "⚠️ Your content was classified as questionable.\n\nReason: {}\n\nPlease review and revise your content to make it more appropriate before resubmitting.",
            explanation
        ),
        ActionDecision::Reject => format!(
            "❌ Your content was classified as inappropriate.\n\nReason: {}\n\nIt contains content that violates our guidelines and cannot be published. Please revise your content to make it more appropriate before resubmitting.",
            explanation
        ),
        ActionDecision::Escalate => format!(
            "🚨 Your content was classified as harmful.\n\nReason: {}\n\nThis content contains material that is dangerous, illegal, or severely violates our guidelines. This submission has been escalated for review. Please revise your content to remove any harmful material. If you believe this is an error, please contact support.",
            explanation
        ),
    }
}

/// Verdict plus an "Analysis Details" block with severity, action and the
/// metadata as JSON.
pub fn format_result(state: &ModerationState) -> String {
    let (Some(severity), Some(action)) = (state.severity(), state.action()) else {
        // Only routed states are handed to the console.
        return format!("Moderation incomplete (state is {})", state.stage());
    };
    let explanation = state.explanation().unwrap_or_default();

    let mut out = verdict_message(action, explanation);
    out.push_str("\n\n--- Analysis Details ---\n");
    out.push_str(&format!("Severity: {}\n", severity.as_str().to_uppercase()));
    out.push_str(&format!("Action:   {}\n", action.as_str().to_uppercase()));

    if let Some(metadata) = state.metadata() {
        let json = serde_json::to_string_pretty(metadata).unwrap_or_else(|e| e.to_string());
        out.push_str("Metadata:\n");
        out.push_str(&json);
        out.push('\n');
    }

    out
}

pub fn format_error(err: &ModerationError) -> String {
    let hint = match err.kind() {
        ModerationErrorKind::Validation => "Please enter some content to moderate.",
        ModerationErrorKind::ClassificationUnavailable => {
            "The moderation service is unavailable right now. Please try again shortly."
        }
        ModerationErrorKind::ClassificationContract => {
            "The moderation service returned an unusable answer. Please try again or contact support."
        }
        ModerationErrorKind::InvariantViolation => {
            "An internal error occurred. Please contact support."
        }
    };

    format!("Error ({}): {}\n{}", err.kind(), err, hint)
}
