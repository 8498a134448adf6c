// Interactive moderation session: one submission per line until EOF or
// "quit". Each line is an independent workflow run.

use super::formatter::{format_error, format_result};
use crate::core::moderation::{ActionDecision, ModerationWorkflow, SeverityJudge};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const PROMPT: &str = "\nEnter your content (or \"quit\" to exit):\n> ";

const INSTRUCTIONS: &str = "\
Content Moderation System
Submit your content for moderation. You'll receive feedback and can revise your content.

Severity levels:
  safe          - content approved
  questionable  - borderline, needs review
  inappropriate - violates guidelines
  harmful       - dangerous content";

/// Counts of how a session went, returned when input ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub submissions: usize,
    pub approved: usize,
    pub errors: usize,
}

pub async fn run_session<J, R, W>(
    workflow: &ModerationWorkflow<J>,
    mut input: R,
    mut output: W,
) -> std::io::Result<SessionSummary>
where
    J: SeverityJudge,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = SessionSummary::default();
    let mut buf = Vec::new();

    output.write_all(INSTRUCTIONS.as_bytes()).await?;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        // Invalid UTF-8 is replaced rather than ending the session.
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }

        summary.submissions += 1;
        let rendered = match workflow.run(line).await {
            Ok(state) => {
                if state.action() == Some(ActionDecision::Approve) {
                    summary.approved += 1;
                }
                format_result(&state)
            }
            Err(err) => {
                summary.errors += 1;
                format_error(&err)
            }
        };

        output.write_all(b"\n").await?;
        output.write_all(rendered.as_bytes()).await?;
    }

    output.write_all(b"\nGoodbye!\n").await?;
    output.flush().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{
        ClassificationError, ContentMetadata, SeverityJudgment, SeverityLevel,
    };
    use async_trait::async_trait;

    /// Flags anything mentioning "annoying", approves everything else.
    struct PickyJudge;

    #[async_trait]
    impl SeverityJudge for PickyJudge {
        async fn classify(
            &self,
            content: &str,
            _metadata: &ContentMetadata,
        ) -> Result<SeverityJudgment, ClassificationError> {
            let severity = if content.contains("annoying") {
                SeverityLevel::Questionable
            } else {
                SeverityLevel::Safe
            };
            Ok(SeverityJudgment {
                severity,
                explanation: "stub".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_session_revise_until_approved() {
        let workflow = ModerationWorkflow::new(PickyJudge);
        let input: &[u8] = b"This is mildly annoying\n\nThanks for the help!\nquit\nnever read\n";
        let mut output = Vec::new();

        let summary = run_session(&workflow, input, &mut output).await.unwrap();

        assert_eq!(
            summary,
            SessionSummary {
                submissions: 3,
                approved: 1,
                errors: 1,
            }
        );

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("classified as questionable"));
        assert!(text.contains("Error (validation)"));
        assert!(text.contains("has been approved"));
        assert!(text.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_session_survives_invalid_utf8_line() {
        let workflow = ModerationWorkflow::new(PickyJudge);
        let input: &[u8] = b"\xff\xfe bad\nhello\r\n";
        let mut output = Vec::new();

        let summary = run_session(&workflow, input, &mut output).await.unwrap();

        assert_eq!(summary.submissions, 2);
        assert_eq!(summary.approved, 2);
        assert_eq!(summary.errors, 0);
        assert!(String::from_utf8(output).unwrap().ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_session_ends_at_eof() {
        let workflow = ModerationWorkflow::new(PickyJudge);
        let input: &[u8] = b"";
        let mut output = Vec::new();

        let summary = run_session(&workflow, input, &mut output).await.unwrap();

        assert_eq!(summary, SessionSummary::default());
    }
}
