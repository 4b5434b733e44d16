//! Shared context interface for channel adapters.

use sprout_sessions::SessionManager;

use crate::greeting::GreetingFilter;
use crate::runtime::AgentRuntime;

/// Everything the conversation pipeline needs from its host.
///
/// Implemented by `AppState` in `sprout-bot`. Defined here so channel crates
/// depend on `sprout-agent` only, never on the binary.
pub trait MessageContext: Send + Sync {
    fn agent(&self) -> &AgentRuntime;
    fn sessions(&self) -> &SessionManager;
    fn greeting(&self) -> &GreetingFilter;

    /// Start-command reply template; `{name}` marks where the user goes.
    fn welcome(&self) -> &str;

    /// Frame wrapped around each user message; `{name}` and `{text}` are
    /// substituted.
    fn user_message(&self) -> &str;
}
