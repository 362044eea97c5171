use super::ChatMessage;
use crate::store::types::{MessageRecord, WorkflowRecord};
use crate::workflow::phase::{MessageRole, WorkflowPhase};

const ENVELOPE_INSTRUCTION: &str = "Respond with a single JSON object and nothing else: \
{\"aiResponse\": string, \"messageType\": one of GREETING|QUESTION|ANSWER|CLARIFICATION|RESULT, \
\"category\": optional string, \"phaseComplete\": optional boolean}.";

fn phase_brief(phase: WorkflowPhase) -> &'static str {
    match phase {
        WorkflowPhase::Analysis => {
            "You are analysing a product requirement with a QA engineer. \
             Probe for scope, affected users, business rules, and edge cases \
             until the requirement is well understood."
        }
        WorkflowPhase::Strategy => {
            "You are shaping a test strategy. Discuss risk areas, test levels, \
             environments, data needs, and prioritisation for the analysed requirement."
        }
        WorkflowPhase::TestPlanning => {
            "You are planning concrete test activities. Work out scenarios, \
             coverage targets, and acceptance criteria that a test-case generator \
             could act on."
        }
        WorkflowPhase::Completed => {
            "The analysis is finished. Answer follow-up questions about the \
             completed workflow."
        }
    }
}

/// System prompt + full history for one chat turn.
pub fn chat_context(workflow: &WorkflowRecord, history: &[MessageRecord]) -> Vec<ChatMessage> {
    let system = format!(
        "{}\n\nWorkflow: {}\nDescription: {}\nEpic content:\n{}\n\n{}",
        phase_brief(workflow.phase),
        workflow.title,
        workflow.description,
        workflow.epic_content,
        ENVELOPE_INSTRUCTION,
    );

    let mut messages = vec![ChatMessage::system(system)];
    for record in history {
        match record.role {
            MessageRole::User => messages.push(ChatMessage::user(record.content.clone())),
            MessageRole::Assistant => messages.push(ChatMessage::assistant(record.content.clone())),
        }
    }
    messages
}

/// Request for the final summary artifact.
pub fn summary_context(workflow: &WorkflowRecord, history: &[MessageRecord]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(format!(
        "Write the final QA readiness summary for the workflow below. \
         Respond with a single JSON object and nothing else: \
         {{\"title\": string, \"content\": string}}.\n\nWorkflow: {}\nEpic content:\n{}",
        workflow.title, workflow.epic_content,
    ))];
    messages.push(ChatMessage::user(transcript(history)));
    messages
}

/// Request for test-case generation from a completed workflow.
pub fn test_case_context(workflow: &WorkflowRecord, history: &[MessageRecord]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(format!(
        "Generate structured test cases from the finished QA analysis below. \
         Respond with a single JSON object and nothing else: \
         {{\"testCases\": [{{\"title\": string, \"steps\": [string], \
         \"expectedResult\": string, \"priority\": LOW|MEDIUM|HIGH}}]}}.\n\n\
         Workflow: {}\nEpic content:\n{}",
        workflow.title, workflow.epic_content,
    ))];
    messages.push(ChatMessage::user(transcript(history)));
    messages
}

fn transcript(history: &[MessageRecord]) -> String {
    let mut out = String::new();
    for record in history {
        out.push_str(record.role.as_str());
        out.push_str(": ");
        out.push_str(&record.content);
        out.push('\n');
    }
    out
}
