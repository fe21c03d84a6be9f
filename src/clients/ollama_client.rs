use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::utils::http_client::new_llm_client;

use super::{ANALYSIS_TEMPERATURE, ChatMessage, provider_http_error};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Local model runtime. Non-streaming `/api/chat`; no credentials.
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: new_llm_client(),
            base_url: settings.llm.ollama_base_url.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> AppResult<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: ANALYSIS_TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_http_error("Ollama", status.as_u16(), &body));
        }

        let result: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("Ollama returned an unexpected response: {}", e)))?;
        Ok(result.message.content)
    }

    /// Locally installed model names, for the model-picker endpoint.
    pub async fn list_models(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_http_error("Ollama", status.as_u16(), &body));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("Ollama returned an unexpected response: {}", e)))?;
        Ok(data
            .get("models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> AppSettings {
        AppSettings::from_env().unwrap()
    }

    #[tokio::test]
    async fn chat_posts_messages_and_returns_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "llama3.2",
                "stream": false,
                "options": {"temperature": 0.1}
            })))
            .with_body(json!({"message": {"role": "assistant", "content": "{\"ok\": true}"}}).to_string())
            .create_async()
            .await;

        let client = OllamaClient::new(&settings()).with_base_url(server.url());
        let messages = [ChatMessage::system("sys"), ChatMessage::user("hi")];
        let reply = client.chat("llama3.2", &messages).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn http_errors_surface_as_external() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body(r#"{"error": {"message": "model not found"}}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(&settings()).with_base_url(server.url());
        let err = client
            .chat("missing", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[tokio::test]
    async fn list_models_extracts_names() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_body(
                json!({"models": [{"name": "llama3.2"}, {"name": "mistral:7b"}]}).to_string(),
            )
            .create_async()
            .await;

        let client = OllamaClient::new(&settings()).with_base_url(server.url());
        let models = client.list_models().await.unwrap();
        assert_eq!(models, vec!["llama3.2", "mistral:7b"]);
    }
}
