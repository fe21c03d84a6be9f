use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::utils::http_client::new_llm_client;

use super::{ANALYSIS_TEMPERATURE, ChatMessage, provider_http_error};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

/// OpenAI chat-completions client.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: new_llm_client(),
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: settings.llm.openai_api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> AppResult<String> {
        let Some(api_key) = &self.api_key else {
            return Err(AppError::External(
                "OpenAI API key not configured".to_string(),
            ));
        };

        let url = format!("{}/chat/completions", self.base_url);
        let request = OpenAiChatRequest {
            model,
            messages,
            temperature: ANALYSIS_TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::External(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_http_error("OpenAI", status.as_u16(), &body));
        }

        let result: OpenAiChatResponse = response.json().await.map_err(|e| {
            AppError::External(format!("OpenAI returned an unexpected response: {}", e))
        })?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::External("OpenAI response contained no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings_with_key() -> AppSettings {
        let mut settings = AppSettings::from_env().unwrap();
        settings.llm.openai_api_key = Some("sk-test".to_string());
        settings
    }

    #[tokio::test]
    async fn chat_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = OpenAiClient::new(&settings_with_key()).with_base_url(server.url());
        let reply = client
            .chat("gpt-4o", &[ChatMessage::user("hi")])
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn missing_key_is_an_external_error() {
        let mut settings = AppSettings::from_env().unwrap();
        settings.llm.openai_api_key = None;
        let client = OpenAiClient::new(&settings);
        let err = client
            .chat("gpt-4o", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn empty_choices_are_an_unexpected_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_body(json!({"choices": []}).to_string())
            .create_async()
            .await;

        let client = OpenAiClient::new(&settings_with_key()).with_base_url(server.url());
        let err = client
            .chat("gpt-4o", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
