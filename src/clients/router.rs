use crate::config::AppSettings;
use crate::error::AppResult;

use super::{
    AnthropicClient, ChatMessage, GoogleClient, OllamaClient, OpenAiClient, OpenWebUiClient,
};

/// Which backend serves a given model id. Selected purely by prefix matching
/// on the model string; each variant owns its envelope shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    OpenAi,
    Anthropic,
    Google,
    OpenWebUi,
}

const OPENAI_PREFIXES: [&str; 4] = ["gpt-", "o1", "o3", "chatgpt-"];

impl LlmProvider {
    /// Resolve a model id to its provider and the effective model name (the
    /// `owui:` routing sentinel is stripped before the call).
    pub fn route(model: &str) -> (LlmProvider, String) {
        if let Some(rest) = model.strip_prefix("owui:") {
            return (LlmProvider::OpenWebUi, rest.to_string());
        }
        let lowered = model.to_lowercase();
        if OPENAI_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
            return (LlmProvider::OpenAi, model.to_string());
        }
        if lowered.starts_with("claude-") {
            return (LlmProvider::Anthropic, model.to_string());
        }
        if lowered.starts_with("gemini-") {
            return (LlmProvider::Google, model.to_string());
        }
        (LlmProvider::Ollama, model.to_string())
    }
}

/// Routes a composed chat to the right provider client.
pub struct LlmRouter {
    ollama: OllamaClient,
    openai: OpenAiClient,
    anthropic: AnthropicClient,
    google: GoogleClient,
    openwebui: OpenWebUiClient,
}

impl LlmRouter {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            ollama: OllamaClient::new(settings),
            openai: OpenAiClient::new(settings),
            anthropic: AnthropicClient::new(settings),
            google: GoogleClient::new(settings),
            openwebui: OpenWebUiClient::new(settings),
        }
    }

    /// Send the chat to whichever provider the model id selects and return the
    /// raw text of the model's reply.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> AppResult<String> {
        let (provider, effective_model) = LlmProvider::route(model);
        match provider {
            LlmProvider::Ollama => self.ollama.chat(&effective_model, messages).await,
            LlmProvider::OpenAi => self.openai.chat(&effective_model, messages).await,
            LlmProvider::Anthropic => self.anthropic.chat(&effective_model, messages).await,
            LlmProvider::Google => self.google.chat(&effective_model, messages).await,
            LlmProvider::OpenWebUi => self.openwebui.chat(&effective_model, messages).await,
        }
    }

    pub fn ollama(&self) -> &OllamaClient {
        &self.ollama
    }

    pub fn openwebui(&self) -> &OpenWebUiClient {
        &self.openwebui
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn owui_sentinel_strips_and_routes_to_gateway() {
        let (provider, model) = LlmProvider::route("owui:gemini-2.0-flash");
        assert_eq!(provider, LlmProvider::OpenWebUi);
        assert_eq!(model, "gemini-2.0-flash");
    }

    #[test]
    fn openai_prefixes_match_case_insensitively() {
        for model in ["gpt-4o", "GPT-4o-mini", "o1", "o3-mini", "chatgpt-4o-latest"] {
            assert_eq!(LlmProvider::route(model).0, LlmProvider::OpenAi, "{}", model);
        }
    }

    #[test]
    fn claude_and_gemini_route_to_their_clouds() {
        assert_eq!(
            LlmProvider::route("claude-3-5-sonnet-20241022").0,
            LlmProvider::Anthropic
        );
        assert_eq!(LlmProvider::route("gemini-1.5-pro").0, LlmProvider::Google);
    }

    #[test]
    fn everything_else_defaults_to_ollama() {
        assert_eq!(LlmProvider::route("llama3.2").0, LlmProvider::Ollama);
        assert_eq!(LlmProvider::route("mistral:7b").0, LlmProvider::Ollama);
        assert_eq!(LlmProvider::route("qwen2.5-coder").0, LlmProvider::Ollama);
    }
}
