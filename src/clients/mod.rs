pub mod anthropic_client;
pub mod google_client;
pub mod ollama_client;
pub mod openai_client;
pub mod openwebui_client;
pub mod router;

pub use anthropic_client::AnthropicClient;
pub use google_client::GoogleClient;
pub use ollama_client::OllamaClient;
pub use openai_client::OpenAiClient;
pub use openwebui_client::OpenWebUiClient;
pub use router::{LlmProvider, LlmRouter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Sampling temperature used for every analysis call: the output must be a
/// strictly-shaped JSON document, not prose.
pub const ANALYSIS_TEMPERATURE: f32 = 0.1;

/// One turn of the composed chat. Role is "system", "user" or "assistant".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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
}

/// Build the error for a non-2xx provider response, preferring the provider's
/// own `error.message` when the body carries one.
pub(crate) fn provider_http_error(provider: &str, status: u16, body: &str) -> AppError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect());
    AppError::External(format!(
        "{} request failed with status {}: {}",
        provider, status, detail
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_prefers_error_message_from_body() {
        let err = provider_http_error(
            "OpenAI",
            401,
            r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#,
        );
        assert!(err.to_string().contains("Invalid API key"));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn provider_error_falls_back_to_raw_body() {
        let err = provider_http_error("Ollama", 500, "upstream exploded");
        assert!(err.to_string().contains("upstream exploded"));
    }
}
