use sprout_agent::pipeline::MessageContext;
use sprout_agent::runtime::AgentRuntime;
use sprout_agent::GreetingFilter;
use sprout_core::config::SproutConfig;
use sprout_sessions::SessionManager;

/// Central shared state, passed as `Arc<AppState>` to the Telegram dispatcher.
pub struct AppState {
    pub config: SproutConfig,
    pub agent: AgentRuntime,
    pub sessions: SessionManager,
    pub greeting: GreetingFilter,
}

impl AppState {
    pub fn new(config: SproutConfig, agent: AgentRuntime) -> Self {
        let sessions = SessionManager::new(config.agent.max_stored_turns);
        let greeting = GreetingFilter::new(config.greeting.phrases.clone());
        Self {
            config,
            agent,
            sessions,
            greeting,
        }
    }
}

impl MessageContext for AppState {
    fn agent(&self) -> &AgentRuntime {
        &self.agent
    }

    fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    fn greeting(&self) -> &GreetingFilter {
        &self.greeting
    }

    fn welcome(&self) -> &str {
        &self.config.agent.welcome
    }

    fn user_message(&self) -> &str {
        &self.config.agent.user_message
    }
}
