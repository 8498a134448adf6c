// Router - maps a severity judgment to its terminal action.

use super::moderation_models::{ActionDecision, ModerationState, SeverityLevel};
use super::moderation_service::ModerationError;

/// The fixed routing table. One action per severity, no fallthrough.
pub fn route(severity: SeverityLevel) -> ActionDecision {
    match severity {
        SeverityLevel::Safe => ActionDecision::Approve,
        SeverityLevel::Questionable => ActionDecision::Flag,
        SeverityLevel::Inappropriate => ActionDecision::Reject,
        SeverityLevel::Harmful => ActionDecision::Escalate,
    }
}

/// Record the routed action on a classified state.
///
/// A state without a severity, or one that already carries an action, means
/// the pipeline was driven out of order. That is reported as an
/// `InvariantViolation` and never replaced with a default action.
pub fn route_state(mut state: ModerationState) -> Result<ModerationState, ModerationError> {
    let Some(severity) = state.severity() else {
        let err = ModerationError::InvariantViolation(format!(
            "router reached with no severity (state is {})",
            state.stage()
        ));
        tracing::error!(error = %err, "Refusing to route unclassified content");
        return Err(err);
    };

    let action = route(severity);
    if let Err(err) = state.record_action(action) {
        tracing::error!(error = %err, severity = %severity, "Refusing to route content twice");
        return Err(err);
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{prepare_content, PipelineStage, SeverityJudgment};
    use std::collections::HashSet;

    fn classified(severity: SeverityLevel) -> ModerationState {
        let mut state = prepare_content("some content").unwrap();
        state
            .record_judgment(SeverityJudgment {
                severity,
                explanation: "because".to_string(),
            })
            .unwrap();
        state
    }

    #[test]
    fn test_routing_table() {
        assert_eq!(route(SeverityLevel::Safe), ActionDecision::Approve);
        assert_eq!(route(SeverityLevel::Questionable), ActionDecision::Flag);
        assert_eq!(route(SeverityLevel::Inappropriate), ActionDecision::Reject);
        assert_eq!(route(SeverityLevel::Harmful), ActionDecision::Escalate);
    }

    #[test]
    fn test_routing_is_injective() {
        let actions: HashSet<ActionDecision> = SeverityLevel::ALL.into_iter().map(route).collect();
        assert_eq!(actions.len(), SeverityLevel::ALL.len());
    }

    #[test]
    fn test_routing_is_idempotent() {
        for severity in SeverityLevel::ALL {
            assert_eq!(route(severity), route(severity));
        }
    }

    #[test]
    fn test_route_state_sets_action() {
        let state = route_state(classified(SeverityLevel::Harmful)).unwrap();

        assert_eq!(state.stage(), PipelineStage::Routed);
        assert_eq!(state.action(), Some(ActionDecision::Escalate));
        assert_eq!(state.explanation(), Some("because"));
    }

    #[test]
    fn test_route_state_without_severity_is_invariant_violation() {
        let state = prepare_content("some content").unwrap();
        let err = route_state(state).unwrap_err();
        assert!(matches!(err, ModerationError::InvariantViolation(_)));
    }

    #[test]
    fn test_route_state_twice_is_invariant_violation() {
        let state = route_state(classified(SeverityLevel::Safe)).unwrap();
        let err = route_state(state).unwrap_err();
        assert!(matches!(err, ModerationError::InvariantViolation(_)));
    }
}
