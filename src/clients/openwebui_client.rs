use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::utils::http_client::new_llm_client;

use super::{ANALYSIS_TEMPERATURE, ChatMessage, provider_http_error};

#[derive(Debug, Serialize)]
struct GatewayChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GatewayChatResponse {
    choices: Vec<GatewayChoice>,
}

#[derive(Debug, Deserialize)]
struct GatewayChoice {
    message: GatewayResponseMessage,
}

#[derive(Debug, Deserialize)]
struct GatewayResponseMessage {
    content: Option<String>,
}

/// Merge the system turn into the first user turn. Some models behind the
/// gateway reject the `system` role outright. The input slice is copied, never
/// mutated.
fn merge_system_into_user(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let system_text: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();
    if system_text.is_empty() {
        return messages.to_vec();
    }

    let mut merged: Vec<ChatMessage> = Vec::new();
    let mut system_pending = Some(system_text.join("\n\n"));
    for message in messages {
        if message.role == "system" {
            continue;
        }
        if message.role == "user" {
            if let Some(system) = system_pending.take() {
                merged.push(ChatMessage::user(format!(
                    "{}\n\n{}",
                    system, message.content
                )));
                continue;
            }
        }
        merged.push(message.clone());
    }
    // No user turn to carry the system text: send it as one.
    if let Some(system) = system_pending {
        merged.insert(0, ChatMessage::user(system));
    }
    merged
}

/// OpenAI-compatible gateway (Open WebUI) fronting local and cloud models;
/// selected by the `owui:` sentinel prefix on a model id.
pub struct OpenWebUiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWebUiClient {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            client: new_llm_client(),
            base_url: settings.llm.open_webui_base_url.clone(),
            api_key: settings.llm.open_webui_api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> AppResult<String> {
        let Some(api_key) = &self.api_key else {
            return Err(AppError::External(
                "Open WebUI API key not configured".to_string(),
            ));
        };

        let request = GatewayChatRequest {
            model: model.to_string(),
            messages: merge_system_into_user(messages),
            temperature: ANALYSIS_TEMPERATURE,
        };

        let url = format!("{}/api/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Open WebUI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_http_error("Open WebUI", status.as_u16(), &body));
        }

        let result: GatewayChatResponse = response.json().await.map_err(|e| {
            AppError::External(format!("Open WebUI returned an unexpected response: {}", e))
        })?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::External("Open WebUI response contained no choices".to_string())
            })
    }

    /// Model ids exposed by the gateway, for the model-picker endpoint.
    pub async fn list_models(&self) -> AppResult<Vec<String>> {
        let Some(api_key) = &self.api_key else {
            return Ok(Vec::new());
        };

        let url = format!("{}/api/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Open WebUI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_http_error("Open WebUI", status.as_u16(), &body));
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::External(format!("Open WebUI returned an unexpected response: {}", e))
        })?;
        Ok(data
            .get("data")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn system_merges_into_first_user_turn() {
        let messages = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("question"),
        ];
        let merged = merge_system_into_user(&messages);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].role, "user");
        assert_eq!(merged[0].content, "rules\n\nquestion");

        // The source slice is untouched.
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "question");
    }

    #[test]
    fn no_system_turn_is_a_plain_copy() {
        let messages = vec![ChatMessage::user("question")];
        assert_eq!(merge_system_into_user(&messages), messages);
    }

    #[test]
    fn system_without_user_becomes_the_user_turn() {
        let messages = vec![ChatMessage::system("rules")];
        let merged = merge_system_into_user(&messages);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].role, "user");
        assert_eq!(merged[0].content, "rules");
    }
}
