//! Per-message conversation handling, shared by all channel adapters.
//!
//! `process_message` runs one turn:
//! snapshot session → frame the user message → completion call → greeting
//! filter → record both turns → mark greeted → return the reply.
//!
//! The session guard is released before the completion call and re-acquired
//! afterwards; no map lock is ever held across an `.await`.

use tracing::{debug, info};

use sprout_sessions::SessionKey;

use super::context::MessageContext;

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    /// Text to relay to the user.
    pub content: String,
    /// The session's greeting flag when the message arrived.
    pub greeted_before: bool,
    /// Stored history length after both turns were recorded.
    pub history_len: usize,
}

/// Handle the start command: reset the chat to greeted with empty history
/// and return the personalised welcome.
pub fn start_session<C: MessageContext + ?Sized>(ctx: &C, key: SessionKey, name: &str) -> String {
    drop(ctx.sessions().start(key));
    info!(session = %key, "session started");
    render_welcome(ctx.welcome(), name)
}

/// Substitute `{name}` in a welcome template.
pub fn render_welcome(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}

/// Substitute `{name}` and `{text}` in the user-message frame.
pub fn render_user_message(template: &str, name: &str, text: &str) -> String {
    template.replace("{name}", name).replace("{text}", text)
}

/// Run one conversational turn for `key`. `sender` is the display form of
/// the author, substituted into the user-message frame.
///
/// The prompt is rendered with the greeting flag as it was on arrival, but
/// the reply is always filtered: the chat counts as greeted from this turn on.
/// Completion failures never surface here: the runtime turns them into a
/// readable reply, which is recorded and relayed like any other answer.
pub async fn process_message<C: MessageContext + ?Sized>(
    ctx: &C,
    key: SessionKey,
    sender: &str,
    text: &str,
) -> ProcessedMessage {
    let window = ctx.agent().settings().history_window;
    let framed = render_user_message(ctx.user_message(), sender, text);

    let (greeted, history) = {
        let session = ctx.sessions().get_or_create(key);
        (session.greeted(), session.window(window).to_vec())
    };

    let raw = ctx.agent().complete(&framed, &history, greeted).await;
    let content = filter_greeting(ctx, key, raw);

    let history_len = {
        let mut session = ctx.sessions().get_or_create(key);
        session.record_user_turn(framed);
        session.record_assistant_turn(content.as_str());
        session.mark_greeted();
        session.len()
    };

    info!(session = %key, greeted, history_len, "turn complete");

    ProcessedMessage {
        content,
        greeted_before: greeted,
        history_len,
    }
}

/// Strip a repeated greeting. When the sentence split would leave nothing,
/// only the phrase itself is removed; a reply that is nothing but a greeting
/// is kept as-is rather than sent empty.
fn filter_greeting<C: MessageContext + ?Sized>(ctx: &C, key: SessionKey, raw: String) -> String {
    let cleaned = ctx.greeting().clean(&raw, true);
    if !cleaned.is_empty() {
        return cleaned;
    }
    let stripped = ctx.greeting().strip_phrase(&raw);
    if !stripped.is_empty() {
        return stripped;
    }
    debug!(session = %key, "greeting filter left nothing; keeping raw reply");
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    use sprout_sessions::{Role, SessionManager};

    use crate::greeting::GreetingFilter;
    use crate::runtime::tests::{template, RecordingProvider};
    use crate::runtime::AgentRuntime;

    struct TestContext {
        agent: AgentRuntime,
        sessions: SessionManager,
        greeting: GreetingFilter,
    }

    impl MessageContext for TestContext {
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
            "Hi, {name}! How can I help?"
        }
        fn user_message(&self) -> &str {
            "Пользователь: {name}, Вопрос: {text}"
        }
    }

    fn context(provider: RecordingProvider) -> TestContext {
        TestContext {
            agent: AgentRuntime::new(Box::new(provider), template(), "m".to_string()),
            sessions: SessionManager::default(),
            greeting: GreetingFilter::new(vec!["Hello".to_string()]),
        }
    }

    const CHAT: SessionKey = SessionKey(100);

    #[test]
    fn start_greets_and_resets() {
        let ctx = context(RecordingProvider::default());
        ctx.sessions.get_or_create(CHAT).record_user_turn("stale");

        let welcome = start_session(&ctx, CHAT, "Alice");
        assert_eq!(welcome, "Hi, Alice! How can I help?");

        let session = ctx.sessions.get(CHAT).unwrap();
        assert!(session.greeted());
        assert!(session.is_empty());
    }

    #[test]
    fn user_message_frame_substitutes_name_and_text() {
        assert_eq!(
            render_user_message("Пользователь: {name}, Вопрос: {text}", "Anna", "Где рассада?"),
            "Пользователь: Anna, Вопрос: Где рассада?"
        );
        assert_eq!(render_user_message("{text}", "Anna", "soil?"), "soil?");
    }

    #[tokio::test]
    async fn first_question_after_start() {
        let provider = RecordingProvider::replying("Loose, slightly acidic loam.");
        let ctx = context(provider.clone());
        start_session(&ctx, CHAT, "Alice");

        let out = process_message(&ctx, CHAT, "Alice", "What soil is best for tomatoes?").await;
        assert_eq!(out.content, "Loose, slightly acidic loam.");
        assert!(out.greeted_before);
        assert_eq!(out.history_len, 2);

        let req = provider.last();
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[0].content, "Consultant. Do not greet again.");
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(
            req.messages[1].content,
            "Пользователь: Alice, Вопрос: What soil is best for tomatoes?"
        );
    }

    #[tokio::test]
    async fn sender_identity_is_sent_and_stored() {
        let provider = RecordingProvider::replying("Use loam.");
        let ctx = context(provider.clone());
        start_session(&ctx, CHAT, "Alice");

        process_message(&ctx, CHAT, "<a href=\"tg://user?id=7\">Alice</a>", "soil?").await;

        let framed = "Пользователь: <a href=\"tg://user?id=7\">Alice</a>, Вопрос: soil?";
        assert_eq!(provider.last().messages.last().unwrap().content, framed);

        let session = ctx.sessions.get(CHAT).unwrap();
        assert_eq!(session.history()[0].role(), Role::User);
        assert_eq!(session.history()[0].content(), framed);
        assert_eq!(session.history()[1].role(), Role::Assistant);
        assert_eq!(session.history()[1].content(), "Use loam.");

        // the framed turn is what later calls see as history
        process_message(&ctx, CHAT, "Alice", "and peppers?").await;
        assert_eq!(provider.last().messages[1].content, framed);
    }

    #[tokio::test]
    async fn first_reply_without_start_is_filtered() {
        let provider = RecordingProvider::replying("Hello! Tomatoes like loam.");
        let ctx = context(provider.clone());

        let first = process_message(&ctx, CHAT, "Bob", "soil?").await;
        assert!(!first.greeted_before);
        // the prompt still allows one greeting, the reply is filtered anyway
        assert_eq!(provider.last().messages[0].content, "Consultant. Greet once.");
        assert_eq!(first.content, "Tomatoes like loam.");

        let second = process_message(&ctx, CHAT, "Bob", "and peppers?").await;
        assert!(second.greeted_before);
        assert_eq!(second.content, "Tomatoes like loam.");
        assert_eq!(provider.last().messages[0].content, "Consultant. Do not greet again.");
    }

    #[tokio::test]
    async fn greeting_instruction_is_per_session() {
        let provider = RecordingProvider::replying("Sure.");
        let ctx = context(provider.clone());

        start_session(&ctx, SessionKey(1), "A");
        process_message(&ctx, SessionKey(1), "A", "q").await;
        assert_eq!(provider.last().messages[0].content, "Consultant. Do not greet again.");

        process_message(&ctx, SessionKey(2), "B", "q").await;
        assert_eq!(provider.last().messages[0].content, "Consultant. Greet once.");
    }

    #[tokio::test]
    async fn only_latest_twenty_turns_are_forwarded() {
        let provider = RecordingProvider::replying("ok");
        let ctx = context(provider.clone());
        start_session(&ctx, CHAT, "A");

        for i in 0..25 {
            let stored_before = ctx.sessions.get(CHAT).unwrap().history().to_vec();
            process_message(&ctx, CHAT, "A", &format!("message {i}")).await;

            let req = provider.last();
            let forwarded = &req.messages[1..req.messages.len() - 1];
            assert_eq!(forwarded.len(), stored_before.len().min(20), "call {i}");

            let expected = &stored_before[stored_before.len() - forwarded.len()..];
            for (sent, stored) in forwarded.iter().zip(expected) {
                assert_eq!(sent.content, stored.content());
            }
        }
        assert_eq!(ctx.sessions.get(CHAT).unwrap().len(), 50);
    }

    #[tokio::test]
    async fn provider_failure_becomes_reply() {
        let ctx = context(RecordingProvider::default());
        start_session(&ctx, CHAT, "A");

        let out = process_message(&ctx, CHAT, "A", "soil?").await;
        assert!(out.content.contains("API error (503): overloaded"));
        // the error text is recorded like any other answer
        assert_eq!(out.history_len, 2);
    }

    #[tokio::test]
    async fn empty_split_falls_back_to_removing_the_phrase() {
        let ctx = context(RecordingProvider::replying("Hello. Plant in May!"));
        start_session(&ctx, CHAT, "A");

        let out = process_message(&ctx, CHAT, "A", "when to plant?").await;
        assert_eq!(out.content, "Plant in May!");
        assert_eq!(ctx.sessions.get(CHAT).unwrap().history()[1].content(), "Plant in May!");
    }

    #[tokio::test]
    async fn reply_that_is_only_a_greeting_is_kept() {
        let ctx = context(RecordingProvider::replying("Hello!"));
        start_session(&ctx, CHAT, "A");

        let out = process_message(&ctx, CHAT, "A", "hi").await;
        assert_eq!(out.content, "Hello!");
    }
}
