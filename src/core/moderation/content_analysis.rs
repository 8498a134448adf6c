// Content analysis - the deterministic first stage of the pipeline.
//
// `extract_metadata` never fails; `prepare_content` only refuses blank input.

use super::moderation_models::{ContentMetadata, ModerationState};
use super::moderation_service::ModerationError;

/// Scheme prefixes that count as a URL. Matched case-insensitively anywhere
/// in the content, so "see HTTPS://example.com" is detected but a bare
/// "example.com" is not.
const URL_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Compute metadata for a content string.
pub fn extract_metadata(content: &str) -> ContentMetadata {
    let lowered = content.to_lowercase();

    ContentMetadata {
        length: content.chars().count(),
        word_count: content.split_whitespace().count(),
        has_url: URL_SCHEMES.iter().any(|scheme| lowered.contains(scheme)),
        is_empty: content.trim().is_empty(),
    }
}

/// Build the prepared state for a submission.
///
/// Blank content is a terminal `Validation` error; the caller decides whether
/// that means "rejected" or "please resubmit".
pub fn prepare_content(content: &str) -> Result<ModerationState, ModerationError> {
    let metadata = extract_metadata(content);
    if metadata.is_empty {
        return Err(ModerationError::Validation(
            "content is empty".to_string(),
        ));
    }

    let mut state = ModerationState::new(content);
    state.attach_metadata(metadata)?;
    Ok(state)
}
