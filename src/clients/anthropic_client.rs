use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::utils::http_client::new_llm_client;

use super::{ANALYSIS_TEMPERATURE, ChatMessage, provider_http_error};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct AnthropicChatRequest<'a> {
    model: &'a str,
    messages: Vec<&'a ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicChatResponse {
    content: Vec<AnthropicResponseContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Anthropic messages API. System turns are lifted out of `messages` and sent
/// as the top-level `system` field.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AnthropicClient {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: new_llm_client(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key: settings.llm.anthropic_api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> AppResult<String> {
        let Some(api_key) = &self.api_key else {
            return Err(AppError::External(
                "Anthropic API key not configured".to_string(),
            ));
        };

        let system_texts: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();
        let non_system: Vec<&ChatMessage> =
            messages.iter().filter(|m| m.role != "system").collect();

        let request = AnthropicChatRequest {
            model,
            messages: non_system,
            max_tokens: MAX_TOKENS,
            temperature: ANALYSIS_TEMPERATURE,
            system: if system_texts.is_empty() {
                None
            } else {
                Some(system_texts.join("\n\n"))
            },
        };

        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_http_error("Anthropic", status.as_u16(), &body));
        }

        let result: AnthropicChatResponse = response.json().await.map_err(|e| {
            AppError::External(format!("Anthropic returned an unexpected response: {}", e))
        })?;
        result
            .content
            .into_iter()
            .find(|block| block.content_type == "text")
            .map(|block| block.text)
            .ok_or_else(|| {
                AppError::External("Anthropic response contained no text content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings_with_key() -> AppSettings {
        let mut settings = AppSettings::from_env().unwrap();
        settings.llm.anthropic_api_key = Some("sk-ant-test".to_string());
        settings
    }

    #[tokio::test]
    async fn system_turn_becomes_top_level_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_body(mockito::Matcher::PartialJson(json!({
                "system": "be an analyst",
                "messages": [{"role": "user", "content": "analyse this"}]
            })))
            .with_body(
                json!({"content": [{"type": "text", "text": "{\"score\": 7}"}]}).to_string(),
            )
            .create_async()
            .await;

        let client = AnthropicClient::new(&settings_with_key()).with_base_url(server.url());
        let messages = [
            ChatMessage::system("be an analyst"),
            ChatMessage::user("analyse this"),
        ];
        let reply = client
            .chat("claude-3-5-sonnet-20241022", &messages)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(reply, "{\"score\": 7}");
    }

    #[tokio::test]
    async fn http_error_body_message_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(429)
            .with_body(r#"{"error": {"type": "rate_limit_error", "message": "Too many requests"}}"#)
            .create_async()
            .await;

        let client = AnthropicClient::new(&settings_with_key()).with_base_url(server.url());
        let err = client
            .chat("claude-3-opus-20240229", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Too many requests"));
    }
}
