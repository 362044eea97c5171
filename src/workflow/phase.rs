use serde::{Deserialize, Serialize};

/// Conversation phases, strictly linear. There is no backward transition;
/// REOPENED is a status, not a phase rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    Analysis,
    Strategy,
    TestPlanning,
    Completed,
}

impl WorkflowPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowPhase::Analysis => "ANALYSIS",
            WorkflowPhase::Strategy => "STRATEGY",
            WorkflowPhase::TestPlanning => "TEST_PLANNING",
            WorkflowPhase::Completed => "COMPLETED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ANALYSIS" => Some(WorkflowPhase::Analysis),
            "STRATEGY" => Some(WorkflowPhase::Strategy),
            "TEST_PLANNING" => Some(WorkflowPhase::TestPlanning),
            "COMPLETED" => Some(WorkflowPhase::Completed),
            _ => None,
        }
    }

    /// The next phase in the fixed sequence. COMPLETED is terminal.
    pub fn next(self) -> WorkflowPhase {
        match self {
            WorkflowPhase::Analysis => WorkflowPhase::Strategy,
            WorkflowPhase::Strategy => WorkflowPhase::TestPlanning,
            WorkflowPhase::TestPlanning => WorkflowPhase::Completed,
            WorkflowPhase::Completed => WorkflowPhase::Completed,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == WorkflowPhase::Completed
    }

    /// Ordinal used to assert forward-only movement.
    pub fn ordinal(self) -> u8 {
        match self {
            WorkflowPhase::Analysis => 0,
            WorkflowPhase::Strategy => 1,
            WorkflowPhase::TestPlanning => 2,
            WorkflowPhase::Completed => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    InProgress,
    ReadyToAdvance,
    Completed,
    Submitted,
    Reopened,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::InProgress => "IN_PROGRESS",
            WorkflowStatus::ReadyToAdvance => "READY_TO_ADVANCE",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Submitted => "SUBMITTED",
            WorkflowStatus::Reopened => "REOPENED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN_PROGRESS" => Some(WorkflowStatus::InProgress),
            "READY_TO_ADVANCE" => Some(WorkflowStatus::ReadyToAdvance),
            "COMPLETED" => Some(WorkflowStatus::Completed),
            "SUBMITTED" => Some(WorkflowStatus::Submitted),
            "REOPENED" => Some(WorkflowStatus::Reopened),
            _ => None,
        }
    }

    /// Whether chat turns are accepted in this status.
    pub fn accepts_chat(self) -> bool {
        matches!(
            self,
            WorkflowStatus::InProgress | WorkflowStatus::ReadyToAdvance | WorkflowStatus::Reopened
        )
    }
}

/// Message author, USER or ASSISTANT on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "USER",
            MessageRole::Assistant => "ASSISTANT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USER" => Some(MessageRole::User),
            "ASSISTANT" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// Coarse tag describing what a chat turn is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Greeting,
    Question,
    Answer,
    Clarification,
    Result,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Greeting => "GREETING",
            MessageKind::Question => "QUESTION",
            MessageKind::Answer => "ANSWER",
            MessageKind::Clarification => "CLARIFICATION",
            MessageKind::Result => "RESULT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "GREETING" => Some(MessageKind::Greeting),
            "QUESTION" => Some(MessageKind::Question),
            "ANSWER" => Some(MessageKind::Answer),
            "CLARIFICATION" => Some(MessageKind::Clarification),
            "RESULT" => Some(MessageKind::Result),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_sequence_is_linear_and_terminal() {
        assert_eq!(WorkflowPhase::Analysis.next(), WorkflowPhase::Strategy);
        assert_eq!(WorkflowPhase::Strategy.next(), WorkflowPhase::TestPlanning);
        assert_eq!(WorkflowPhase::TestPlanning.next(), WorkflowPhase::Completed);
        assert_eq!(WorkflowPhase::Completed.next(), WorkflowPhase::Completed);
    }

    #[test]
    fn next_never_moves_backward() {
        for phase in [
            WorkflowPhase::Analysis,
            WorkflowPhase::Strategy,
            WorkflowPhase::TestPlanning,
            WorkflowPhase::Completed,
        ] {
            assert!(phase.next().ordinal() >= phase.ordinal());
        }
    }

    #[test]
    fn phase_string_roundtrip() {
        for phase in [
            WorkflowPhase::Analysis,
            WorkflowPhase::Strategy,
            WorkflowPhase::TestPlanning,
            WorkflowPhase::Completed,
        ] {
            assert_eq!(WorkflowPhase::parse(phase.as_str()), Some(phase));
        }
        assert_eq!(WorkflowPhase::parse("DESIGN"), None);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            WorkflowStatus::InProgress,
            WorkflowStatus::ReadyToAdvance,
            WorkflowStatus::Completed,
            WorkflowStatus::Submitted,
            WorkflowStatus::Reopened,
        ] {
            assert_eq!(WorkflowStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn chat_is_rejected_once_submitted_or_completed() {
        assert!(WorkflowStatus::InProgress.accepts_chat());
        assert!(WorkflowStatus::ReadyToAdvance.accepts_chat());
        assert!(WorkflowStatus::Reopened.accepts_chat());
        assert!(!WorkflowStatus::Completed.accepts_chat());
        assert!(!WorkflowStatus::Submitted.accepts_chat());
    }

    #[test]
    fn message_tags_roundtrip() {
        assert_eq!(MessageRole::parse("USER"), Some(MessageRole::User));
        assert_eq!(MessageRole::parse("user"), None);
        assert_eq!(MessageKind::parse("CLARIFICATION"), Some(MessageKind::Clarification));
        assert_eq!(MessageKind::parse("RANT"), None);
    }
}
