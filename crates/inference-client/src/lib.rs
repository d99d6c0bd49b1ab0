pub mod chat;
pub mod error;
pub mod price_model;

pub use chat::ChatClient;
pub use error::{InferenceError, InferenceResult};
pub use price_model::RemotePriceModel;

use std::time::Duration;

/// Configuration for the text-generation backend
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            timeout: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(30)),
        }
    }
}

impl InferenceConfig {
    pub fn chat_client(&self) -> ChatClient {
        if self.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; generated text will use templated fallbacks");
        }
        ChatClient::new(
            self.openai_base_url.clone(),
            self.openai_api_key.clone(),
            self.openai_model.clone(),
            self.timeout,
        )
    }
}
