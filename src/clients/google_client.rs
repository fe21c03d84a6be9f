use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::utils::http_client::new_llm_client;

use super::{ANALYSIS_TEMPERATURE, ChatMessage, provider_http_error};

const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleChatRequest {
    contents: Vec<GoogleContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleSystemInstruction>,
    generation_config: GoogleGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GoogleSystemInstruction {
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize)]
struct GoogleContent {
    role: String,
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize)]
struct GooglePart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleChatResponse {
    candidates: Vec<GoogleCandidate>,
}

#[derive(Debug, Deserialize)]
struct GoogleCandidate {
    content: GoogleResponseContent,
}

#[derive(Debug, Deserialize)]
struct GoogleResponseContent {
    parts: Vec<GoogleResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GoogleResponsePart {
    #[serde(default)]
    text: String,
}

/// Google generative-language `:generateContent` client. The system turn
/// becomes `systemInstruction`; other turns become `contents` with per-turn
/// `parts`, with the assistant role renamed to "model".
pub struct GoogleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleClient {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: new_llm_client(),
            base_url: GOOGLE_BASE_URL.to_string(),
            api_key: settings.llm.google_ai_api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> AppResult<String> {
        let Some(api_key) = &self.api_key else {
            return Err(AppError::External(
                "Google AI API key not configured".to_string(),
            ));
        };

        let mut system_instruction: Option<GoogleSystemInstruction> = None;
        let mut contents: Vec<GoogleContent> = Vec::new();
        for message in messages {
            let part = GooglePart {
                text: message.content.clone(),
            };
            if message.role == "system" {
                match &mut system_instruction {
                    Some(instruction) => instruction.parts.push(part),
                    None => {
                        system_instruction = Some(GoogleSystemInstruction { parts: vec![part] })
                    }
                }
            } else {
                let role = if message.role == "assistant" { "model" } else { "user" };
                contents.push(GoogleContent {
                    role: role.to_string(),
                    parts: vec![part],
                });
            }
        }

        let request = GoogleChatRequest {
            contents,
            system_instruction,
            generation_config: GoogleGenerationConfig {
                temperature: ANALYSIS_TEMPERATURE,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Google request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_http_error("Google", status.as_u16(), &body));
        }

        let result: GoogleChatResponse = response.json().await.map_err(|e| {
            AppError::External(format!("Google returned an unexpected response: {}", e))
        })?;
        let candidate = result.candidates.into_iter().next().ok_or_else(|| {
            AppError::External("Google response contained no candidates".to_string())
        })?;
        Ok(candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings_with_key() -> AppSettings {
        let mut settings = AppSettings::from_env().unwrap();
        settings.llm.google_ai_api_key = Some("test-key".to_string());
        settings
    }

    #[tokio::test]
    async fn system_turn_becomes_system_instruction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(mockito::Matcher::PartialJson(json!({
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
            })))
            .with_body(
                json!({"candidates": [{"content": {"role": "model",
                        "parts": [{"text": "{"}, {"text": "}"}]}}]})
                .to_string(),
            )
            .create_async()
            .await;

        let client = GoogleClient::new(&settings_with_key()).with_base_url(server.url());
        let messages = [ChatMessage::system("be brief"), ChatMessage::user("hello")];
        let reply = client.chat("gemini-2.0-flash", &messages).await.unwrap();
        mock.assert_async().await;
        assert_eq!(reply, "{}");
    }

    #[tokio::test]
    async fn empty_candidates_are_an_unexpected_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-1.5-pro:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_body(json!({"candidates": []}).to_string())
            .create_async()
            .await;

        let client = GoogleClient::new(&settings_with_key()).with_base_url(server.url());
        let err = client
            .chat("gemini-1.5-pro", &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }
}
