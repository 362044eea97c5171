use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmGateway};
use crate::config::Config;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

/// Chat-completions client. No retry or streaming; failures surface to the
/// caller unchanged.
pub struct OpenAiGateway {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.openai_base_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            max_tokens: config.openai_max_tokens,
        }
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let req = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };

        let res = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(anyhow!(
                "OpenAI API error ({}): {}",
                res.status(),
                res.text().await.unwrap_or_default()
            ));
        }

        let parsed: CompletionResponse = res.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI API returned no choices"))
    }
}
