mod openai;
pub mod prompts;

pub use openai::OpenAiGateway;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::workflow::phase::MessageKind;

/// One turn of conversation context sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Boundary to the external model. Implementations return the raw completion
/// text; envelope parsing happens here so every caller shares one contract.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// The single response contract for chat turns. Anything the model returns
/// that does not parse into this shape is an error, not a fallback path.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub ai_response: String,
    pub message_type: MessageKind,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub phase_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTestCase {
    pub title: String,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub priority: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSummary {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TestCaseEnvelope {
    #[serde(rename = "testCases")]
    test_cases: Vec<GeneratedTestCase>,
}

/// Models wrap JSON in markdown fences often enough that stripping them is
/// normalization, not shape-guessing. Everything past that must parse as-is.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

pub fn parse_assistant_reply(raw: &str) -> Result<AssistantReply> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| anyhow::anyhow!("assistant reply violates the response contract: {}", e))
}

pub fn parse_test_cases(raw: &str) -> Result<Vec<GeneratedTestCase>> {
    let envelope: TestCaseEnvelope = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| anyhow::anyhow!("test-case payload violates the response contract: {}", e))?;
    if envelope.test_cases.is_empty() {
        anyhow::bail!("test-case payload contained no test cases");
    }
    Ok(envelope.test_cases)
}

pub fn parse_summary(raw: &str) -> Result<GeneratedSummary> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| anyhow::anyhow!("summary payload violates the response contract: {}", e))
}
