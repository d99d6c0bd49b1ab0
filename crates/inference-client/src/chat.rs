use async_trait::async_trait;
use market_core::{MarketResult, TextGenerator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{InferenceError, InferenceResult};

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatClient {
    pub fn new(base_url: String, api_key: Option<String>, model: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens: 300,
            temperature: 0.7,
        }
    }

    /// Same endpoint and credentials with different sampling limits.
    pub fn with_params(&self, max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
            ..self.clone()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn chat(&self, system: Option<&str>, prompt: &str) -> InferenceResult<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(InferenceError::NotConfigured("OPENAI_API_KEY"))?;

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InferenceError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let body = response.json::<ChatResponse>().await?;
        extract_content(body)
    }
}

fn extract_content(body: ChatResponse) -> InferenceResult<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| InferenceError::InvalidResponse("empty completion".to_string()))
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> MarketResult<String> {
        Ok(self.chat(system, prompt).await?)
    }
}
