use std::time::Instant;

use tracing::{info, warn};

use sprout_core::config::{
    AgentConfig, DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use sprout_sessions::Turn;

use crate::prompt::PromptTemplate;
use crate::provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError};

/// Fixed sampling parameters and history window for every completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f64,
    pub max_tokens: u32,
    pub history_window: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl From<&AgentConfig> for CompletionSettings {
    fn from(cfg: &AgentConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            history_window: cfg.history_window,
        }
    }
}

/// Completion client: the provider, the shared prompt template and the model.
/// Shared across all chats via `Arc` in the host state.
pub struct AgentRuntime {
    provider: Box<dyn LlmProvider>,
    prompt: PromptTemplate,
    model: String,
    settings: CompletionSettings,
    error_reply: String,
}

impl AgentRuntime {
    pub fn new(provider: Box<dyn LlmProvider>, prompt: PromptTemplate, model: String) -> Self {
        Self {
            provider,
            prompt,
            model,
            settings: CompletionSettings::default(),
            error_reply: AgentConfig::default().error_reply,
        }
    }

    pub fn with_settings(mut self, settings: CompletionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_error_reply(mut self, error_reply: impl Into<String>) -> Self {
        self.error_reply = error_reply.into();
        self
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        &*self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn settings(&self) -> CompletionSettings {
        self.settings
    }

    /// Build `[system] + trailing history window + [user message]`.
    pub fn build_request(&self, user_message: &str, history: &[Turn], greeted: bool) -> ChatRequest {
        let start = history.len().saturating_sub(self.settings.history_window);
        let window = &history[start..];

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(Message::system(self.prompt.render(greeted)));
        messages.extend(window.iter().map(Message::from));
        messages.push(Message::user(user_message));

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Run one completion call and surface provider failures.
    pub async fn try_complete(
        &self,
        user_message: &str,
        history: &[Turn],
        greeted: bool,
    ) -> Result<ChatResponse, ProviderError> {
        let req = self.build_request(user_message, history, greeted);
        info!(
            model = %req.model, provider = %self.provider.name(),
            messages = req.messages.len(), greeted, "processing chat request"
        );

        let started = Instant::now();
        let result = self.provider.send(&req).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(resp) => info!(
                tokens_in = resp.tokens_in,
                tokens_out = resp.tokens_out,
                latency_ms,
                "chat complete"
            ),
            Err(e) => warn!(error = %e, latency_ms, "completion failed"),
        }
        result
    }

    /// Like [`try_complete`](Self::try_complete), but a failure comes back as
    /// a readable reply embedding the error instead of an `Err`.
    pub async fn complete(&self, user_message: &str, history: &[Turn], greeted: bool) -> String {
        match self.try_complete(user_message, history, greeted).await {
            Ok(resp) => resp.content,
            Err(e) => self.error_text(&e),
        }
    }

    pub fn error_text(&self, err: &ProviderError) -> String {
        format!("{}: {}", self.error_reply, err)
    }
}
